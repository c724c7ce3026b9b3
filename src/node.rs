/*!
	the servo drive node: bring-up of the drive, command dispatch and status publication.

	A [ServoNode] owns the logical state of one axis and drives it through a [Transport]. Commands are dispatched synchronously by the caller, status notifications arrive from the transport on its own thread or task. Both go through the same lock, so a write and a status read following it are always ordered.

	## Example

	```ignore
	let node = ServoNode::new(NodeConfig {node_id: 3, .. Default::default()}, transport)?;
	node.set_status_callback(|name, value| {
		println!("{} {}", name, value);
		Ok(())
	});
	node.open()?;
	node.dispatch("ACTIVATE", 1, true)?;
	node.dispatch("VELOCITY", 0.5, true)?;
	...
	node.shutdown();
	```
*/

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use core::time::Duration;

use crate::{
	command::{Command, Value, Response},
	dictionary::{self, ControlWord, StatusWord},
	error::{DriveError, DriveResult, TransportError, TransportResult},
	mapping::{PdoConfig, ServoMapping},
	profile::{DriveProfile, MotionSetup},
	state::DriveState,
	status::{StatusPublisher, CallbackError},
	transport::{Transport, NetworkStatus, NmtState, Notification, NotificationHandler},
	units::UnitConverter,
	};


/// configuration of a node, supplied at construction
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeConfig {
	/// CANopen node id of the drive
	pub node_id: u8,
	pub profile: DriveProfile,
	/// period of the SYNC message triggering the drive's status PDOs
	pub sync_period: Duration,
}
impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			node_id: 1,
			profile: DriveProfile::CopleyBoom,
			sync_period: Duration::from_millis(100),
		}
	}
}

/**
	logical control layer of a single axis servo drive

	It translates the command protocol (see [crate::command]) into control words and setpoints written to the drive's PDOs, and publishes the drive's position and velocity received from its status PDOs.

	No operation waits for the drive: writes are fire-and-forget transmissions and reads are answered from the last status received.
*/
pub struct ServoNode<T: Transport + 'static> {
	shared: Arc<Shared<T>>,
}
/// part of the node reachable from the transport's notification handler
struct Shared<T> {
	node_id: u8,
	sync_period: Duration,
	motion: MotionSetup,
	converter: UnitConverter,
	mapping: ServoMapping,
	transport: T,
	inner: Mutex<Inner>,
}
struct Inner {
	drive: DriveState,
	status: StatusPublisher,
	/// the notification handler is registered on the current connection
	subscribed: bool,
	/// shutdown already happened and nothing was opened since
	closed: bool,
}

impl<T: Transport + 'static> ServoNode<T> {
	pub fn new(config: NodeConfig, transport: T) -> DriveResult<Self> {
		if ! (1 ..= 127).contains(&config.node_id)
			{return Err(DriveError::InvalidValue("node id must be in 1..=127"))}
		let gearing = config.profile.gearing();
		if ! (gearing.gear_ratio.is_finite() && gearing.gear_ratio > 0.)
			{return Err(DriveError::InvalidValue("gear ratio must be positive"))}
		if gearing.counts_per_revolution == 0
			{return Err(DriveError::InvalidValue("encoder resolution cannot be null"))}
		let mapping = ServoMapping::new(config.node_id)
			.map_err(|_| DriveError::InvalidValue("process data does not fit in PDOs"))?;
		let converter = gearing.converter();

		Ok(Self {shared: Arc::new(Shared {
			node_id: config.node_id,
			sync_period: config.sync_period,
			motion: config.profile.motion(),
			converter,
			mapping,
			transport,
			inner: Mutex::new(Inner {
				drive: DriveState::new(config.profile.masks()),
				status: StatusPublisher::new(converter),
				subscribed: false,
				closed: false,
				}),
		})})
	}

	/**
		connect the transport and configure the drive for profile motion

		The status PDOs are set to follow the SYNC, the velocity PDO is remapped to the profile velocity, the motion profile is written, and the pending velocity is sent again. Returns the resulting network status, on failure the status is [NetworkStatus::Error] and the error is returned.
	*/
	pub fn open(&self) -> DriveResult<NetworkStatus> {
		let shared = &self.shared;
		let mut guard = shared.lock();
		let inner = &mut *guard;
		log::info!("node {}: bring-up", shared.node_id);

		if let Err(error) = shared.transport.connect() {
			log::error!("node {}: cannot connect: {}", shared.node_id, error);
			shared.transport.disconnect();
			inner.drive.network_status = NetworkStatus::Error;
			inner.subscribed = false;
			return Err(error.into());
		}
		inner.drive.network_status = NetworkStatus::Up;
		inner.closed = false;

		let handler: NotificationHandler = {
			let shared = Arc::downgrade(&self.shared);
			Arc::new(move |notification: &Notification| {
				if let Some(shared) = shared.upgrade() {
					shared.notify(notification);
				}
			})
		};
		if let Err(error) = shared.configure(inner, handler) {
			log::error!("node {}: bring-up failed: {}", shared.node_id, error);
			inner.drive.network_status = NetworkStatus::Error;
			return Err(error);
		}
		log::info!("node {}: operational", shared.node_id);
		Ok(inner.drive.network_status)
	}

	/**
		execute a command of the protocol by its name

		Rejections of the protocol are answers: a motion command while the axis is not active gives `(false, -1)`, an unknown command gives `(false, 0)`. Invalid values and transport failures are errors.
	*/
	pub fn dispatch(&self, command: &str, value: impl Into<Value>, write: bool) -> DriveResult<Response> {
		match self.shared.execute(command.parse(), &value.into(), write) {
			Err(error @ (DriveError::NotActive | DriveError::UnknownCommand(_))) => {
				log::warn!("node {}: {} rejected: {}", self.shared.node_id, command, error);
				Ok(Response::from(&error))
			},
			result => result,
		}
	}
	/// execute a command, returning rejections as errors
	pub fn execute(&self, command: Command, value: impl Into<Value>, write: bool) -> DriveResult<Response> {
		self.shared.execute(Ok(command), &value.into(), write)
	}

	/**
		set the callback receiving position and velocity each time the drive sends its status

		The callback runs with the node locked, so that a command and the status read right after it are ordered. It must not call any method of this node (not even the accessors) or it will deadlock, nor block for long since commands wait for it.
	*/
	pub fn set_status_callback<F>(&self, callback: F)
	where F: FnMut(&str, f64) -> Result<(), CallbackError> + Send + 'static
	{
		self.shared.lock().status.set_callback(Box::new(callback));
	}

	/**
		power the drive off and release the transport

		Calling it again is harmless until the node is opened again. Failures are logged, the transport is released anyway.
	*/
	pub fn shutdown(&self) {
		let shared = &self.shared;
		let mut guard = shared.lock();
		let inner = &mut *guard;
		if inner.closed
			{return}
		if inner.drive.network_status == NetworkStatus::Up {
			let word = inner.drive.power_off();
			if let Err(error) = shared.send_control(&mut inner.drive, word) {
				log::warn!("node {}: cannot power off: {}", shared.node_id, error);
			}
		}
		shared.transport.stop_sync();
		shared.transport.disconnect();
		inner.drive.network_status = NetworkStatus::Down;
		inner.subscribed = false;
		inner.closed = true;
		log::info!("node {}: shut down", shared.node_id);
	}

	pub fn node_id(&self) -> u8  {self.shared.node_id}
	pub fn transport(&self) -> &T  {&self.shared.transport}
	pub fn mapping(&self) -> &ServoMapping  {&self.shared.mapping}
	pub fn converter(&self) -> &UnitConverter  {&self.shared.converter}

	/// last control word transmitted
	pub fn control_word(&self) -> ControlWord  {self.shared.lock().drive.control_word()}
	pub fn is_active(&self) -> bool  {self.shared.lock().drive.active}
	pub fn speed_override(&self) -> f64  {self.shared.lock().drive.speed_override}
	pub fn network_status(&self) -> NetworkStatus  {self.shared.lock().drive.network_status}
	/// last status word received
	pub fn status_word(&self) -> Option<StatusWord>  {self.shared.lock().status.status_word()}
	/// (rad) last position received
	pub fn position(&self) -> f64  {self.shared.lock().status.position()}
	/// (rad/s) last velocity received
	pub fn velocity(&self) -> f64  {self.shared.lock().status.velocity()}
}

impl<T: Transport + 'static> Drop for ServoNode<T> {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl<T: Transport> Shared<T> {
	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn configure(&self, inner: &mut Inner, handler: NotificationHandler) -> DriveResult {
		let drive = &mut inner.drive;

		// PDO mapping is only saved in pre-operational
		self.send(drive, |transport| {
			transport.switch(NmtState::PreOperational)?;
			for pdo in self.mapping.status.iter().chain([&self.mapping.velocity]) {
				transport.configure_pdo(pdo)?;
			}
			transport.switch(NmtState::Operational)
		})?;

		if ! inner.subscribed {
			self.send(drive, |transport| {
				for pdo in self.mapping.status.iter() {
					transport.subscribe_notifications(pdo.slot, handler.clone())?;
				}
				Ok(())
			})?;
			inner.subscribed = true;
		}

		let motion = self.motion;
		self.send(drive, |transport| {
			transport.invoke_remote(&dictionary::MODES_OF_OPERATION.downcast(), motion.mode as i64)?;
			transport.invoke_remote(&dictionary::MOTION_PROFILE_TYPE.downcast(), motion.profile_type.into())?;
			transport.invoke_remote(&dictionary::PROFILE_ACCELERATION.downcast(), motion.acceleration.into())?;
			transport.invoke_remote(&dictionary::PROFILE_DECELERATION.downcast(), motion.deceleration.into())
		})?;

		let counts = drive_range(self.converter.velocity_to_counts(drive.pending_velocity, drive.speed_override))?;
		let word = drive.control_word();
		self.send_setpoint(drive, &self.mapping.velocity, dictionary::PROFILE_TARGET_VELOCITY.name, word, counts)?;

		self.send(drive, |transport| transport.start_sync(self.sync_period))
	}

	fn execute(&self, command: DriveResult<Command>, value: &Value, write: bool) -> DriveResult<Response> {
		let mut guard = self.lock();
		let inner = &mut *guard;
		let drive = &mut inner.drive;

		match command {
			Ok(Command::Activate) => {
				if write {
					let active = value.flag()?;
					let word = drive.power(active);
					self.send_control(drive, word)?;
					drive.active = active;
					log::info!("node {}: {}", self.node_id, if active {"activated"} else {"deactivated"});
				}
				Ok(Response::accept(if drive.active {1.} else {0.}))
			},
			// power can be switched while the axis is not active
			Ok(Command::Power) => {
				let on = value.flag()?;
				let word = drive.power(on);
				self.send_control(drive, word)?;
				Ok(Response::accept(value.number().unwrap_or(if on {1.} else {0.})))
			},
			_ if ! drive.active => Err(DriveError::NotActive),
			Err(error) => Err(error),

			Ok(Command::Stop) => {
				let word = drive.with_run(false);
				self.send_control(drive, word)?;
				Ok(Response::accept(0.))
			},
			Ok(Command::SimSpeed) => {
				if write {
					let percent = value.number()?;
					if percent < 0.
						{return Err(DriveError::InvalidValue("speed override cannot be negative"))}
					let speed_override = percent / 100.;
					let counts = drive_range(self.converter.velocity_to_counts(drive.pending_velocity, speed_override))?;
					// the run bit is left as is, a stopped axis stays stopped
					let word = drive.control_word();
					self.send_setpoint(drive, &self.mapping.velocity, dictionary::PROFILE_TARGET_VELOCITY.name, word, counts)?;
					drive.speed_override = speed_override;
				}
				Ok(Response::accept(drive.speed_override * 100.))
			},
			Ok(Command::Velocity) => {
				if write {
					let velocity = value.number()?;
					let counts = drive_range(self.converter.velocity_to_counts(velocity, drive.speed_override))?;
					let word = drive.with_run(true);
					self.send_setpoint(drive, &self.mapping.velocity, dictionary::PROFILE_TARGET_VELOCITY.name, word, counts)?;
					drive.pending_velocity = velocity;
				}
				Ok(Response::accept(inner.status.velocity()))
			},
			Ok(Command::Position) => {
				if write {
					let position = value.number()?;
					let counts = drive_range(self.converter.position_to_counts(position))?;
					let word = drive.with_run(true);
					self.send_setpoint(drive, &self.mapping.position, dictionary::TARGET_POSITION.name, word, counts)?;
				}
				Ok(Response::accept(inner.status.position()))
			},
		}
	}

	/// check the network is up, following the transport's connectivity if it went down
	fn ensure_up(&self, drive: &mut DriveState) -> DriveResult {
		let link = self.transport.connectivity_status();
		if drive.network_status == NetworkStatus::Up && link != NetworkStatus::Up {
			log::error!("node {}: network went {}", self.node_id, link);
			drive.network_status = link;
		}
		if drive.network_status != NetworkStatus::Up
			{return Err(TransportError::NotConnected(drive.network_status).into())}
		Ok(())
	}
	/// run transport operations if the network is up, downgrading the network status if they fail
	fn send<F>(&self, drive: &mut DriveState, operations: F) -> DriveResult
	where F: FnOnce(&T) -> TransportResult
	{
		self.ensure_up(drive)?;
		operations(&self.transport).map_err(|error| {
			log::error!("node {}: transport failure: {}", self.node_id, error);
			drive.network_status = NetworkStatus::Error;
			DriveError::from(error)
		})
	}
	/// transmit a control word alone, and commit it
	fn send_control(&self, drive: &mut DriveState, word: ControlWord) -> DriveResult {
		log::debug!("node {}: {}", self.node_id, word);
		let slot = self.mapping.control.slot;
		self.send(drive, |transport| {
			transport.write_mapped(slot, dictionary::CONTROL_WORD.name, u16::from(word).into())?;
			transport.transmit(slot)
		})?;
		drive.commit(word);
		Ok(())
	}
	/**
		transmit a setpoint with the new-setpoint bit in its PDO, then the control word alone, and commit the control word

		Some drives only latch a setpoint on a rising edge of the new-setpoint bit, hence the second transmission.
	*/
	fn send_setpoint(&self, drive: &mut DriveState, pdo: &PdoConfig, object: &'static str, word: ControlWord, counts: i32) -> DriveResult {
		let latch = drive.with_new_setpoint(word);
		log::debug!("node {}: {} {} = {}", self.node_id, latch, object, counts);
		let control = self.mapping.control.slot;
		self.send(drive, |transport| {
			transport.write_mapped(pdo.slot, dictionary::CONTROL_WORD.name, u16::from(latch).into())?;
			transport.write_mapped(pdo.slot, object, counts.into())?;
			transport.transmit(pdo.slot)?;
			transport.write_mapped(control, dictionary::CONTROL_WORD.name, u16::from(word).into())?;
			transport.transmit(control)
		})?;
		drive.commit(word);
		Ok(())
	}

	fn notify(&self, notification: &Notification) {
		log::debug!("node {}: received {:?}", self.node_id, notification);
		self.lock().status.handle(notification);
	}
}

/// setpoints are 32 bit registers of the drive
fn drive_range(counts: i64) -> DriveResult<i32> {
	i32::try_from(counts)
		.map_err(|_| DriveError::InvalidValue("setpoint exceeds the drive range"))
}

/*!
	last known status of the drive, and its publication to the node's user.

	The drive sends its status in transmit PDOs, the transport delivers them as [Notification]s. Each notification refreshes the [StatusCache], then position and velocity are published through the user callback.
*/

use std::panic::{self, AssertUnwindSafe};
use crate::{
	command::Command,
	dictionary::{self, StatusWord},
	transport::Notification,
	units::UnitConverter,
	};


/// status values tracked by the node
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StatusField {
	Position,
	Velocity,
	StatusWord,
}
impl StatusField {
	pub const ALL: [StatusField; 3] = [Self::Position, Self::Velocity, Self::StatusWord];

	/// name of the dictionnary object carrying this value
	pub fn object_name(&self) -> &'static str {
		match self {
			Self::Position => dictionary::ACTUAL_POSITION.name,
			Self::Velocity => dictionary::ACTUAL_VELOCITY.name,
			Self::StatusWord => dictionary::STATUS_WORD.name,
		}
	}
	pub fn from_object_name(name: &str) -> Option<Self> {
		Self::ALL.iter().find(|field| field.object_name() == name).copied()
	}
}

/**
	last raw value received for each tracked field

	Keys are fixed at construction with a raw value of 0, values are overwritten by each notification and never removed.
*/
#[derive(Clone, Debug)]
pub struct StatusCache {
	values: heapless::LinearMap<StatusField, i64, 4>,
}
impl StatusCache {
	pub fn new() -> Self {
		let mut values = heapless::LinearMap::new();
		for field in StatusField::ALL {
			// capacity is above the number of fields
			let _ = values.insert(field, 0);
		}
		Self {values}
	}
	/// overwrite the value of the named object, returns false if it is not tracked
	pub fn update(&mut self, name: &str, raw: i64) -> bool {
		match StatusField::from_object_name(name).and_then(|field| self.values.get_mut(&field)) {
			Some(value) => {
				*value = raw;
				true
			},
			None => false,
		}
	}
	pub fn get(&self, field: StatusField) -> i64 {
		self.values.get(&field).copied().unwrap_or(0)
	}
}
impl Default for StatusCache {
	fn default() -> Self {Self::new()}
}

/// error a status callback can report, it is logged and never propagated
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;
/// user callback receiving `(name, value)` of published quantities, in SI units
pub type StatusCallback = Box<dyn FnMut(&str, f64) -> Result<(), CallbackError> + Send>;

/// reacts to status notifications and publishes position and velocity
pub struct StatusPublisher {
	cache: StatusCache,
	converter: UnitConverter,
	callback: Option<StatusCallback>,
}
impl StatusPublisher {
	pub fn new(converter: UnitConverter) -> Self {
		Self {
			cache: StatusCache::new(),
			converter,
			callback: None,
		}
	}
	pub fn set_callback(&mut self, callback: StatusCallback) {
		self.callback = Some(callback);
	}
	pub fn cache(&self) -> &StatusCache  {&self.cache}

	/// (rad) last measured position, zero until received
	pub fn position(&self) -> f64 {
		self.converter.counts_to_position(self.cache.get(StatusField::Position))
	}
	/// (rad/s) last measured velocity, zero until received
	pub fn velocity(&self) -> f64 {
		self.converter.counts_to_velocity(self.cache.get(StatusField::Velocity))
	}
	/// last status word received, `None` if the drive sent a value wider than a status word
	pub fn status_word(&self) -> Option<StatusWord> {
		u16::try_from(self.cache.get(StatusField::StatusWord)).ok()
			.map(StatusWord::from)
	}

	/**
		process a full notification, then publish position and velocity

		Returns the number of values the callback accepted. Callback failures and panics are logged and do not reach the notification path.
	*/
	pub fn handle(&mut self, notification: &Notification) -> usize {
		for &(name, raw) in notification.values.iter() {
			if ! self.cache.update(name, raw) {
				log::trace!("{} carries untracked {:?}", notification.slot, name);
			}
		}
		if let Some(status) = self.status_word() {
			if status.fault() {
				log::warn!("drive reports a fault: {}", status);
			}
		}

		let (position, velocity) = (self.position(), self.velocity());
		usize::from(self.publish(Command::Position.name(), position))
			+ usize::from(self.publish(Command::Velocity.name(), velocity))
	}

	fn publish(&mut self, name: &str, value: f64) -> bool {
		let callback = match self.callback.as_mut() {
			Some(callback) => callback,
			None => return false,
		};
		match panic::catch_unwind(AssertUnwindSafe(|| callback(name, value))) {
			Ok(Ok(())) => true,
			Ok(Err(error)) => {
				log::error!("status callback failed on {}: {}", name, error);
				false
			},
			Err(_) => {
				log::error!("status callback panicked on {}", name);
				false
			},
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::mapping::Slot;
	use core::f64::consts::TAU;
	use std::sync::{Arc, Mutex};

	fn notification(slot: u8, values: &[(&'static str, i64)]) -> Notification {
		Notification {
			slot: Slot::Transmit(slot),
			values: heapless::Vec::from_slice(values).unwrap(),
		}
	}
	fn recorder(publisher: &mut StatusPublisher) -> Arc<Mutex<Vec<(String, f64)>>> {
		let published = Arc::new(Mutex::new(Vec::new()));
		let record = published.clone();
		publisher.set_callback(Box::new(move |name: &str, value: f64| -> Result<(), CallbackError> {
			record.lock().unwrap().push((name.to_string(), value));
			Ok(())
		}));
		published
	}

	#[test]
	fn publishes_every_notification() {
		let mut publisher = StatusPublisher::new(UnitConverter::new(262144, 160.));
		let published = recorder(&mut publisher);

		assert_eq!(publisher.handle(&notification(2, &[("Status word", 0x237), ("Actual motor position", 262144*160)])), 2);
		{
			let published = published.lock().unwrap();
			assert_eq!(published.len(), 2);
			assert_eq!(published[0].0, "POSITION");
			assert!((published[0].1 - TAU).abs() < 1e-9);
			// velocity not received yet
			assert_eq!(published[1], ("VELOCITY".to_string(), 0.));
		}

		assert_eq!(publisher.handle(&notification(3, &[("Status word", 0x237), ("Actual motor velocity", -262144*16)])), 2);
		let published = published.lock().unwrap();
		assert_eq!(published.len(), 4);
		assert!((published[2].1 - TAU).abs() < 1e-9);
		assert!((published[3].1 + TAU / 10.).abs() < 1e-9);
		assert!(publisher.status_word().unwrap().operation_enabled());
	}

	#[test]
	fn untracked_values() {
		let mut cache = StatusCache::new();
		assert!(! cache.update("Error code", 0x2310));
		assert!(cache.update("Actual motor velocity", -5));
		assert_eq!(cache.get(StatusField::Velocity), -5);
		assert_eq!(cache.get(StatusField::Position), 0);
	}

	#[test]
	fn callback_failures_are_isolated() {
		let mut publisher = StatusPublisher::new(UnitConverter::new(4, 1.));
		let calls = Arc::new(Mutex::new(0));
		let counter = calls.clone();
		publisher.set_callback(Box::new(move |name: &str, _: f64| -> Result<(), CallbackError> {
			*counter.lock().unwrap() += 1;
			if name == "POSITION"
				{Err("consumer is gone".into())}
			else
				{panic!("consumer is broken")}
		}));
		let status = notification(2, &[("Actual motor position", 1), ("Actual motor velocity", 2)]);
		assert_eq!(publisher.handle(&status), 0);
		assert_eq!(publisher.handle(&status), 0);
		assert_eq!(*calls.lock().unwrap(), 4);
		assert!((publisher.velocity() - TAU / 2.).abs() < 1e-12);
	}
}

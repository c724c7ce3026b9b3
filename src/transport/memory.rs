use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
    };
use core::time::Duration;
use tokio::sync::mpsc;

use crate::{
    data::{self, Field, PduData, PackingResult},
    error::{TransportError, TransportResult},
    mapping::{Slot, PdoConfig, ServoMapping, MAX_PDO_SIZE},
    sdo::Sdo,
    };
use super::{Transport, NetworkStatus, NmtState, Notification, NotificationHandler};


/// a PDO sent or received on a [MemoryTransport]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub slot: Slot,
    pub cob_id: u16,
    pub data: heapless::Vec<u8, MAX_PDO_SIZE>,
}
impl Frame {
    /// extract a mapped value from the payload
    pub fn get<T: PduData>(&self, field: Field<T>) -> PackingResult<T>  {field.get(&self.data)}
}

/**
    transport simulating a bus with one drive, fresh from factory, in process

    It behaves as the drive regarding the network management: PDOs can only be remapped in pre-operational state, and are only exchanged in operational state. Everything sent is recorded for inspection, and transmit PDOs of the drive can be fed back to the subscribed handlers, either synchronously with [Self::receive] or from an async channel with [Self::feed].

    Failures of the bus can be simulated with [Self::refuse_connection], [Self::inject_fault] and [Self::set_status].
*/
pub struct MemoryTransport {
    node: u8,
    // states are locked using [std::sync::Mutex], they are never held while calling a notification handler
    bus: Mutex<Bus>,
}
struct Bus {
    status: NetworkStatus,
    refuse_connect: bool,
    fault: Option<&'static str>,
    nmt: NmtState,
    sync: Option<Duration>,
    pdos: BTreeMap<Slot, PdoConfig>,
    staged: BTreeMap<Slot, [u8; MAX_PDO_SIZE]>,
    frames: Vec<Frame>,
    remote: Vec<(u16, u8, i64)>,
    handlers: BTreeMap<Slot, Vec<NotificationHandler>>,
}

impl MemoryTransport {
    /// simulate a bus with one drive at the given node id
    pub fn new(node: u8) -> PackingResult<Self> {
        let factory = ServoMapping::factory(node)?;
        Ok(Self {
            node,
            bus: Mutex::new(Bus {
                status: NetworkStatus::Down,
                refuse_connect: false,
                fault: None,
                nmt: NmtState::Initialising,
                sync: None,
                pdos: factory.pdos()
                    .map(|pdo| (pdo.slot, pdo.clone()))
                    .collect(),
                staged: BTreeMap::new(),
                frames: Vec::new(),
                remote: Vec::new(),
                handlers: BTreeMap::new(),
                }),
        })
    }
    fn bus(&self) -> MutexGuard<'_, Bus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// node id of the simulated drive
    pub fn node(&self) -> u8  {self.node}

    /// make next connections fail
    pub fn refuse_connection(&self, refuse: bool) {
        self.bus().refuse_connect = refuse;
    }
    /// make every following operation fail with the given bus error, or stop failing with `None`
    pub fn inject_fault(&self, fault: Option<&'static str>) {
        self.bus().fault = fault;
    }
    /// force the connectivity, as a link loss would
    pub fn set_status(&self, status: NetworkStatus) {
        self.bus().status = status;
    }

    /// every PDO sent so far
    pub fn frames(&self) -> Vec<Frame> {
        self.bus().frames.clone()
    }
    /// every PDO sent so far, clearing the record
    pub fn take_frames(&self) -> Vec<Frame> {
        core::mem::take(&mut self.bus().frames)
    }
    /// every configuration object written so far, as `(index, subindex, value)`
    pub fn remote_writes(&self) -> Vec<(u16, u8, i64)> {
        self.bus().remote.clone()
    }
    pub fn nmt_state(&self) -> NmtState  {self.bus().nmt}
    pub fn sync_period(&self) -> Option<Duration>  {self.bus().sync}
    /// current configuration of a PDO
    pub fn pdo(&self, slot: Slot) -> Option<PdoConfig> {
        self.bus().pdos.get(&slot).cloned()
    }
    /// number of handlers subscribed to a transmit PDO
    pub fn subscribers(&self, slot: Slot) -> usize {
        self.bus().handlers.get(&slot).map_or(0, Vec::len)
    }

    /**
        simulate the reception of a transmit PDO from the drive

        The payload is decoded with the PDO's current layout and delivered to its handlers. Returns the number of handlers called.
    */
    pub fn receive(&self, slot: Slot, payload: &[u8]) -> TransportResult<usize> {
        let (notification, handlers) = {
            let mut bus = self.bus();
            bus.check()?;
            if bus.nmt != NmtState::Operational
                {return Err(TransportError::Bus("PDOs are only exchanged in operational state"))}
            let pdo = match bus.pdos.get(&slot) {
                Some(pdo) if pdo.enabled => pdo,
                _ => return Ok(0),
                };
            let mut values = heapless::Vec::new();
            for entry in pdo.entries() {
                let raw = data::unpack_raw(entry.ty, payload.get(entry.range())
                    .ok_or(TransportError::Bus("received PDO is shorter than its mapping"))?)?;
                // entries are at most as many as the vector capacity
                let _ = values.push((entry.name, raw));
            }
            let handlers = bus.handlers.get(&slot).cloned().unwrap_or_default();
            (Notification {slot, values}, handlers)
        };
        log::trace!("memory transport delivers {:?}", notification);
        for handler in handlers.iter() {
            handler(&notification);
        }
        Ok(handlers.len())
    }
    /// simulate the reception of a transmit PDO with the given values, packed with the PDO's current layout
    pub fn publish(&self, slot: Slot, values: &[(&str, i64)]) -> TransportResult<usize> {
        let payload = {
            let bus = self.bus();
            let pdo = bus.pdos.get(&slot)
                .ok_or_else(|| TransportError::Unmapped(slot, String::new()))?;
            let mut payload = [0; MAX_PDO_SIZE];
            for &(name, raw) in values {
                let entry = pdo.entry(name)
                    .ok_or_else(|| TransportError::Unmapped(slot, name.to_string()))?;
                data::pack_raw(entry.ty, raw, &mut payload[entry.range()])?;
            }
            heapless::Vec::<u8, MAX_PDO_SIZE>::from_slice(&payload[.. pdo.size()])
                .map_err(|_| TransportError::Bus("PDO larger than a frame"))?
        };
        self.receive(slot, &payload)
    }
    /// deliver frames coming from an async channel until it closes, this is the asynchronous notification path
    pub async fn feed(&self, mut frames: mpsc::UnboundedReceiver<Frame>) {
        while let Some(frame) = frames.recv().await {
            if let Err(error) = self.receive(frame.slot, &frame.data) {
                log::warn!("dropped {} frame: {}", frame.slot, error);
            }
        }
    }
}

impl Bus {
    fn check(&mut self) -> TransportResult {
        if self.status != NetworkStatus::Up
            {return Err(TransportError::NotConnected(self.status))}
        if let Some(fault) = self.fault {
            self.status = NetworkStatus::Error;
            return Err(TransportError::Bus(fault));
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn connect(&self) -> TransportResult {
        let mut bus = self.bus();
        if bus.refuse_connect {
            bus.status = NetworkStatus::Error;
            return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "bus interface refused").into());
        }
        bus.status = NetworkStatus::Up;
        // the drive boots by itself up to pre-operational
        bus.nmt = NmtState::PreOperational;
        Ok(())
    }
    fn disconnect(&self) {
        let mut bus = self.bus();
        bus.status = NetworkStatus::Down;
        bus.sync = None;
        bus.staged.clear();
        bus.handlers.clear();
    }
    fn connectivity_status(&self) -> NetworkStatus {
        self.bus().status
    }

    fn switch(&self, state: NmtState) -> TransportResult {
        let mut bus = self.bus();
        bus.check()?;
        bus.nmt = state;
        Ok(())
    }
    fn configure_pdo(&self, config: &PdoConfig) -> TransportResult {
        let mut bus = self.bus();
        bus.check()?;
        if bus.nmt != NmtState::PreOperational
            {return Err(TransportError::Bus("PDO mapping is only allowed in pre-operational state"))}
        bus.staged.remove(&config.slot);
        bus.pdos.insert(config.slot, config.clone());
        Ok(())
    }
    fn invoke_remote(&self, object: &Sdo, value: i64) -> TransportResult {
        let mut bus = self.bus();
        bus.check()?;
        let mut buffer = [0; 8];
        data::pack_raw(object.ty, value, buffer.get_mut(.. object.len)
            .ok_or(TransportError::Bus("object too big for an expedited write"))?)?;
        bus.remote.push((object.index, object.sub.unwrap(), value));
        Ok(())
    }

    fn write_mapped(&self, slot: Slot, field: &str, raw: i64) -> TransportResult {
        let mut guard = self.bus();
        let bus = &mut *guard;
        bus.check()?;
        if let Slot::Transmit(_) = slot
            {return Err(TransportError::Bus("transmit PDOs are written by the drive"))}
        let entry = bus.pdos.get(&slot)
            .and_then(|pdo| pdo.entry(field))
            .ok_or_else(|| TransportError::Unmapped(slot, field.to_string()))?;
        let staged = bus.staged.entry(slot).or_insert([0; MAX_PDO_SIZE]);
        data::pack_raw(entry.ty, raw, &mut staged[entry.range()])?;
        Ok(())
    }
    fn transmit(&self, slot: Slot) -> TransportResult {
        let mut guard = self.bus();
        let bus = &mut *guard;
        bus.check()?;
        if bus.nmt != NmtState::Operational
            {return Err(TransportError::Bus("PDOs are only exchanged in operational state"))}
        let pdo = match bus.pdos.get(&slot) {
            Some(pdo) if pdo.enabled => pdo,
            _ => return Err(TransportError::Unmapped(slot, String::new())),
            };
        let staged = bus.staged.get(&slot).copied().unwrap_or([0; MAX_PDO_SIZE]);
        let frame = Frame {
            slot,
            cob_id: pdo.cob_id,
            data: heapless::Vec::from_slice(&staged[.. pdo.size()])
                .map_err(|_| TransportError::Bus("PDO larger than a frame"))?,
            };
        log::trace!("memory transport sends {:?}", frame);
        bus.frames.push(frame);
        Ok(())
    }

    fn start_sync(&self, period: Duration) -> TransportResult {
        let mut bus = self.bus();
        bus.check()?;
        bus.sync = Some(period);
        Ok(())
    }
    fn stop_sync(&self) {
        self.bus().sync = None;
    }

    fn subscribe_notifications(&self, slot: Slot, handler: NotificationHandler) -> TransportResult {
        if let Slot::Receive(_) = slot
            {return Err(TransportError::Bus("receive PDOs are not notified"))}
        self.bus().handlers.entry(slot).or_default().push(handler);
        Ok(())
    }
}

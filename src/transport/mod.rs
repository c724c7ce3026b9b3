/*!
    This module provide the trait [Transport], the fieldbus stack the node relies on, and [MemoryTransport] an in-process implementor.

    The node never frames messages itself: it stages mapped values in PDO slots, asks for their transmission, writes configuration objects, and receives the drive's status through notifications.

    | transport |  bus  |  use |
    |-----------|-------|------|
    | [MemoryTransport] | simulated, in process | tests, simulation of a drive |

    Any CANopen stack exposing these operations can back a node by implementing the trait.
*/

mod memory;

pub use memory::{MemoryTransport, Frame};

use crate::{
    error::TransportResult,
    mapping::{Slot, PdoConfig, MAX_PDO_ENTRIES},
    sdo::Sdo,
    };
use core::{fmt, time::Duration};
use std::sync::Arc;


/// connectivity of the node to its fieldbus
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum NetworkStatus {
    /// not connected, or disconnected on purpose
    #[default]
    Down,
    /// connected and configured
    Up,
    /// a connection or a transmission failed
    Error,
}
impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::Error => "error",
        })
    }
}

/// network management state of the remote node
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum NmtState {
    /**
        the node just booted and is ready for nothing yet, it switches by itself to [Self::PreOperational]
    */
    #[default]
    Initialising,
    /**
        configuration objects can be read and written, PDOs can be remapped and saved, but no PDO is exchanged
    */
    PreOperational,
    /**
        PDOs are exchanged, PDO mapping is no more allowed
    */
    Operational,
    /// only network management is answered
    Stopped,
}

/// a status snapshot received from the drive: the values mapped in one transmit PDO
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// PDO the values were received in
    pub slot: Slot,
    /// raw values, designated by their dictionnary name
    pub values: heapless::Vec<(&'static str, i64), MAX_PDO_ENTRIES>,
}

/// callback receiving the notifications of a transport, it may be called from any thread
pub type NotificationHandler = Arc<dyn Fn(&Notification) + Send + Sync>;

/**
    trait implementing the fieldbus operations a servo node relies on

    Every operation is fire-and-forget: none of them waits for a reply of the drive. Timeouts and retransmissions are the implementor's business.

    Implementors must not call notification handlers from inside one of these methods, since the node may hold its own lock while calling them.
*/
pub trait Transport: Send + Sync {
    /// connect to the bus
    fn connect(&self) -> TransportResult;
    /// release the bus, dropping every subscribed handler
    fn disconnect(&self);
    /// current connectivity
    fn connectivity_status(&self) -> NetworkStatus;

    /// request a network management state change of the remote node
    fn switch(&self, state: NmtState) -> TransportResult;
    /// write and save the communication parameters and layout of one PDO
    fn configure_pdo(&self, config: &PdoConfig) -> TransportResult;
    /// one-shot write of a configuration object
    fn invoke_remote(&self, object: &Sdo, value: i64) -> TransportResult;

    /// stage the value of one mapped object in a receive PDO
    fn write_mapped(&self, slot: Slot, field: &str, raw: i64) -> TransportResult;
    /// send the currently staged receive PDO
    fn transmit(&self, slot: Slot) -> TransportResult;

    /// start emitting the SYNC message with the given period
    fn start_sync(&self, period: Duration) -> TransportResult;
    fn stop_sync(&self);

    /// register a handler for the notifications received in the given transmit PDO
    fn subscribe_notifications(&self, slot: Slot, handler: NotificationHandler) -> TransportResult;
}

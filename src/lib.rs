pub mod data;
pub mod sdo;
pub mod dictionary;
pub mod mapping;
pub mod error;
pub mod transport;
pub mod units;
pub mod profile;
pub mod state;
pub mod command;
pub mod status;
pub mod node;

pub use crate::data::{PduData, Field};
pub use crate::dictionary::{ControlWord, StatusWord};
pub use crate::error::*;
pub use crate::transport::{Transport, MemoryTransport, NetworkStatus, Notification};
pub use crate::units::UnitConverter;
pub use crate::profile::DriveProfile;
pub use crate::command::{Command, Value, Response};
pub use crate::node::*;

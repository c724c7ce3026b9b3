//! definition of the error types of the drive node

use std::sync::Arc;
use core::fmt;
use crate::{
    data::PackingError,
    mapping::Slot,
    transport::NetworkStatus,
    };

/**
    object reporting a failure of the fieldbus transport

    These errors are never retried by the node, they are surfaced to the caller and the node's network status is downgraded.
*/
#[derive(Clone, Debug)]
pub enum TransportError {
    /// the network is not up, nothing has been sent
    NotConnected(NetworkStatus),

    /// error caused by communication support
    ///
    /// these errors are exterior to this library
    Io(Arc<std::io::Error>),

    /// error reported by the bus or the remote node
    Bus(&'static str),

    /// the named object is not mapped in the given PDO
    Unmapped(Slot, String),

    /// a value could not be packed in its mapped location
    Packing(PackingError),
}

/// convenient alias to simplify return annotations
pub type TransportResult<T=()> = core::result::Result<T, TransportError>;

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected(status) => write!(f, "network is {}", status),
            Self::Io(error) => write!(f, "io: {}", error),
            Self::Bus(message) => write!(f, "bus: {}", message),
            Self::Unmapped(slot, name) => write!(f, "{:?} is not mapped in {}", name, slot),
            Self::Packing(error) => write!(f, "packing: {}", error),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(src: std::io::Error) -> Self {
        TransportError::Io(Arc::new(src))
    }
}

impl From<PackingError> for TransportError {
    fn from(src: PackingError) -> Self {
        TransportError::Packing(src)
    }
}


/**
    general object reporting why a command to the drive could not be carried out

    [Self::NotActive] and [Self::UnknownCommand] are protocol answers rather than failures, the dispatcher turns them into a rejected [crate::command::Response].
*/
#[derive(Clone, Debug)]
pub enum DriveError {
    /// a motion command was attempted while the axis is not activated
    NotActive,
    /// the command name is not part of the protocol
    UnknownCommand(String),
    /// the value given with a write is not numeric or out of its domain
    ///
    /// it is rejected before any state change
    InvalidValue(&'static str),
    /// the transport failed to carry a write
    Transport(TransportError),
}

/// convenient alias to simplify return annotations
pub type DriveResult<T=()> = core::result::Result<T, DriveError>;

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActive => write!(f, "axis is not active"),
            Self::UnknownCommand(name) => write!(f, "unknown command {:?}", name),
            Self::InvalidValue(message) => write!(f, "invalid value: {}", message),
            Self::Transport(error) => write!(f, "transport failure: {}", error),
        }
    }
}

impl std::error::Error for DriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TransportError> for DriveError {
    fn from(src: TransportError) -> Self {
        DriveError::Transport(src)
    }
}

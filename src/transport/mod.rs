//! Wireless transport boundary.
//!
//! The collector never talks to a radio stack directly. It drives any
//! [`Transport`] through connect, characteristic lookup and a single
//! subscription, then drains notifications from the channel it handed over.

pub mod replay;

use crossbeam_channel::Sender;
use thiserror::Error;

pub use replay::{parse_replay, ReplayTransport};

/// One raw notification buffer.
pub type Notification = Vec<u8>;

/// Opaque handle for an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u64);

/// Opaque handle for a resolved characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle {
    pub connection: ConnectionHandle,
    pub id: u64,
}

/// Failures raised by the transport. Passed to callers unmodified.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(String),
    #[error("subscription failed: {0}")]
    Subscribe(String),
    #[error("already subscribed")]
    AlreadySubscribed,
    #[error("not connected")]
    NotConnected,
    #[error("invalid replay data on line {line}: {source}")]
    ReplayFormat {
        line: usize,
        source: hex::FromHexError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A connected-notification source such as a BLE central.
pub trait Transport: Send {
    /// Open a connection to the device exposing `service`.
    fn connect(&mut self, service: &str) -> Result<ConnectionHandle, TransportError>;

    /// Resolve a characteristic on an open connection.
    fn characteristic(
        &mut self,
        connection: ConnectionHandle,
        id: &str,
    ) -> Result<CharacteristicHandle, TransportError>;

    /// Register the single notification sink. Each notification is sent as
    /// one buffer, in delivery order.
    fn subscribe(
        &mut self,
        characteristic: CharacteristicHandle,
        sink: Sender<Notification>,
    ) -> Result<(), TransportError>;

    /// Tear down the connection. Notifications already queued may still
    /// be delivered.
    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<(), TransportError>;
}

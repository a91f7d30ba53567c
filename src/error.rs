//! # Error Types
//!
//! Custom error types for Yoke Bridge using `thiserror`.

use thiserror::Error;

use crate::controller::controls::ControlCode;

/// Main error type for Yoke Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Telemetry packet could not be decoded
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Event mapper rejected a reading vector
    #[error("Mapping failure: {0}")]
    Mapping(#[from] MappingError),

    /// Control code was not declared when the device was built
    #[error("Event {0} has not been registered")]
    UnregisteredControl(ControlCode),

    /// Output device used after `close()`
    #[error("Output device is closed")]
    DeviceClosed,

    /// Another input device on the host already uses this name
    #[error("Device name \"{0}\" already taken. Set another name with --name NAME")]
    NameConflict(String),

    /// Backend-specific output device failure
    #[error("Output device error: {0}")]
    Device(String),

    /// Discovery turned off by configuration
    #[error("Discovery disabled by configuration")]
    DiscoveryDisabled,

    /// Service discovery errors
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure raised by an [`EventMapper`](crate::controller::mapper::EventMapper).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// A binding refers to a channel the packet did not carry
    #[error("channel {channel} missing (packet has {available} channels)")]
    MissingChannel { channel: usize, available: usize },

    /// Reading is NaN or infinite
    #[error("channel {channel} is not a finite number")]
    NonFinite { channel: usize },
}

/// Result type alias for Yoke Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

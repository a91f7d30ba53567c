//! # Yoke Bridge Library
//!
//! Use a phone as a wireless gamepad.
//!
//! The phone client streams comma-separated motion and touch readings over
//! UDP. This library decodes them, maps them to controller events and feeds
//! them to a virtual controller the OS treats as real hardware.
//!
//! ## Pipeline
//!
//! ```text
//! UDP datagram → telemetry::decode → EventMapper::map → OutputDevice::emit/commit
//! ```
//!
//! [`session::SessionManager`] owns one endpoint, accepts one phone at a
//! time and drops it after a period of silence.

pub mod assets;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod output;
pub mod session;
pub mod telemetry;

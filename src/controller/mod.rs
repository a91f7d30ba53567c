//! # Controller Module
//!
//! Translation of calibrated readings into virtual controller events.
//!
//! This module handles:
//! - The control code vocabulary (buttons, axes, hats)
//! - The `EventMapper` contract between session and application
//! - The default binding-table mapper

pub mod controls;
pub mod layout;
pub mod mapper;

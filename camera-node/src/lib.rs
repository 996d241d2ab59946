//! Reolink PTZ camera exposed as a framework camera resource.

pub mod camera;
pub mod command;
pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;

pub use camera::{Camera, ReolinkCamera};
pub use command::{CameraCommand, CommandOutcome, CommandResults};
pub use config::ReolinkConfig;
pub use error::{CameraError, Result};

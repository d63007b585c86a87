//! kbdled: brightness and color persistence for System76 keyboard backlights.

pub mod attr;
pub mod brightness;
pub mod cache;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod regions;

pub use error::KbdledError;

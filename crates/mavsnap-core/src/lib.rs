//! Core types shared by the mavsnap collector and presenter.
//!
//! Holds the error type, command-line settings, the polled message type list
//! and the snapshot directory both processes meet at.

pub mod error;
pub mod message_types;
pub mod settings;
pub mod snapshot;

pub use error::{MavsnapError, Result};

//! Core of the VK event client: long-poll session, event decoding and
//! attachment resolution.
//!
//! Network access lives behind ports (traits) implemented in adapter crates,
//! so everything here runs against fakes in tests.

pub mod attachments;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod logging;
pub mod longpoll;
pub mod ports;
pub mod retry;
pub mod utils;

pub use errors::{Error, Result};

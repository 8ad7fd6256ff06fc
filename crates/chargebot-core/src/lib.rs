//! Core domain + pump logic for the charging-station status relay bot.
//!
//! This crate is intentionally platform-agnostic. Telegram lives behind
//! ports (traits) implemented in the adapter crate; persistence behind the
//! repository trait.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod fanout;
pub mod listener;
pub mod logging;
pub mod ports;
pub mod repo;
pub mod sanitize;
pub mod service;
pub mod store;

pub use errors::{Error, Result};

/// Capacity of the event and send queues. Producers block when a queue is
/// full, which is the backpressure boundary between the event source and
/// the dispatcher.
pub const QUEUE_CAPACITY: usize = 100;

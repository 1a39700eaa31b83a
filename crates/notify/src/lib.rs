//! Operator notifications.
//!
//! `TwilioNotifier` delivers messages as SMS; `LogNotifier` writes them to the
//! log and is used when SMS is disabled.

pub mod error;
mod log;
pub mod twilio;

pub use error::{NotifyError, Result};
pub use log::LogNotifier;
pub use twilio::{TwilioConfig, TwilioNotifier, TWILIO_API_URL};

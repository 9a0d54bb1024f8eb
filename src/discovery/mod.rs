//! Device discovery.
//!
//! Candidate capture devices are discovered by invoking an external listing
//! utility and parsing its line-oriented text output. The mechanism itself is
//! opaque: this module only owns the invocation and the parse, and the
//! resulting paths are not validated in any way; whether a candidate is a
//! usable camera is decided solely by the subsequent bind attempt.
//!
//! The enumerator is injected into the controller as a trait object so tests
//! can substitute a fake without spawning processes.

mod command;
mod parse;

pub use command::V4l2Enumerator;
pub use parse::parse_candidates;

use thiserror::Error;

/// Errors that can occur while listing candidate devices.
///
/// An empty device list is NOT an error; callers must treat "nothing found"
/// and "could not ask" differently.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("failed to run {command}: {source}")]
    Invocation {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("enumeration output was not valid UTF-8")]
    Unreadable,
}

/// Lists candidate capture devices, in attempt order.
pub trait DeviceEnumerator {
    /// Returns the ordered sequence of device path candidates currently
    /// visible, or an empty vector when none are.
    fn list_candidates(&mut self) -> Result<Vec<String>, EnumerationError>;
}

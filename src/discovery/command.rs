//! External listing command invocation.

use super::{parse::parse_candidates, DeviceEnumerator, EnumerationError};
use std::process::{Command, Stdio};

/// Enumerates devices by running an external listing utility.
///
/// Defaults to `v4l2-ctl --list-devices`. The program and arguments are
/// injectable so deployments with a different listing utility (and tests)
/// can substitute their own; the textual contract stays the same.
#[derive(Debug, Clone)]
pub struct V4l2Enumerator {
    program: String,
    args: Vec<String>,
}

impl V4l2Enumerator {
    /// Creates an enumerator using `v4l2-ctl --list-devices`.
    pub fn new() -> Self {
        Self::with_command("v4l2-ctl", ["--list-devices"])
    }

    /// Creates an enumerator running an arbitrary listing command.
    pub fn with_command(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for V4l2Enumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for V4l2Enumerator {
    fn list_candidates(&mut self) -> Result<Vec<String>, EnumerationError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| EnumerationError::Invocation {
                command: self.program.clone(),
                source: e,
            })?;

        // A nonzero exit with readable output is still a listing (v4l2-ctl
        // exits nonzero on some hosts with no devices at all).
        let text = String::from_utf8(output.stdout).map_err(|_| EnumerationError::Unreadable)?;

        let candidates = parse_candidates(&text);
        tracing::debug!(count = candidates.len(), "Enumerated device candidates");
        Ok(candidates)
    }
}

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{SluiceError, SluiceResult};

/// Default streaming writer threshold in bytes.
pub const DEFAULT_BUFFER_BYTES: usize = 4096;

/// Options controlling response streaming.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamOpts {
    /// Buffered bytes that trigger a copy to the transport followed by a transport flush.
    pub buffer_bytes: usize,
    /// Deadline for each async slot producer. An expired producer counts as failed and gets its
    /// fallback rendering. `None` waits for as long as the request lives.
    pub slot_timeout_ms: Option<u64>,
    /// Replace the response with an error page when the main render fails before any byte
    /// reached the transport.
    pub error_page: bool,
}

impl Default for StreamOpts {
    fn default() -> Self {
        Self {
            buffer_bytes: DEFAULT_BUFFER_BYTES,
            slot_timeout_ms: None,
            error_page: true,
        }
    }
}

impl StreamOpts {
    /// Parse options from JSON and validate them.
    pub fn from_json_str(s: &str) -> SluiceResult<Self> {
        let opts: Self = serde_json::from_str(s).map_err(|e| SluiceError::serde(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read, parse and validate a JSON options file.
    pub fn from_path(path: impl AsRef<Path>) -> SluiceResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            SluiceError::config(format!("read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    /// Reject values the writer cannot work with.
    pub fn validate(&self) -> SluiceResult<()> {
        if self.buffer_bytes == 0 {
            return Err(SluiceError::config("buffer_bytes must be greater than zero"));
        }
        if self.slot_timeout_ms == Some(0) {
            return Err(SluiceError::config(
                "slot_timeout_ms must be greater than zero when set",
            ));
        }
        Ok(())
    }

    /// Slot deadline as a duration.
    pub fn slot_timeout(&self) -> Option<Duration> {
        self.slot_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;

//! Unique suffixes for submitted company, contact and email values

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hands out one suffix per scenario.
///
/// The suffix is `_<timestamp_ms>_<sequence>`, where the timestamp is fixed
/// when the generator is created and the sequence increases by one on every
/// call to [`SuffixGenerator::next`].
#[derive(Debug)]
pub struct SuffixGenerator {
    started_ms: i64,
    sequence: AtomicU64,
}

impl SuffixGenerator {
    /// Create a generator stamped with the current time
    pub fn new() -> Self {
        Self::with_timestamp(chrono::Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(started_ms: i64) -> Self {
        Self {
            started_ms,
            sequence: AtomicU64::new(0),
        }
    }

    /// Produce the next suffix
    pub fn next(&self) -> UniqueSuffix {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        UniqueSuffix(format!("_{}_{}", self.started_ms, sequence))
    }

    /// Number of suffixes handed out so far
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for SuffixGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A per-scenario suffix and the form values derived from it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueSuffix(String);

impl UniqueSuffix {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn company_name(&self) -> String {
        format!("TestCompany{}", self.0)
    }

    pub fn contact_name(&self) -> String {
        format!("TestName{}", self.0)
    }

    pub fn email(&self) -> String {
        format!("prueba{}@mail.com", self.0)
    }
}

impl fmt::Display for UniqueSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

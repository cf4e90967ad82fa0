use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters for auto-linker observability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkerMetrics {
    /// Total runs completed (single-entry and bulk).
    pub runs: u64,

    /// Entries processed in the last run.
    pub entries_processed: u64,

    /// Links created in the last run.
    pub links_created: u64,

    /// Existing links raised to a higher strength in the last run.
    pub links_strengthened: u64,

    /// Candidates that matched an equal or stronger stored link.
    pub links_unchanged: u64,

    /// Raw candidates dropped by the cutoff or per-target dedup.
    pub candidates_discarded: u64,

    /// Entries whose linking failed in the last run.
    pub failures: u64,

    /// Processing time for the last run.
    #[serde(with = "duration_serializer")]
    pub last_run_duration: Duration,
}

impl LinkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-run counters (called at the start of each run)
    pub fn reset_run_metrics(&mut self) {
        self.entries_processed = 0;
        self.links_created = 0;
        self.links_strengthened = 0;
        self.links_unchanged = 0;
        self.candidates_discarded = 0;
        self.failures = 0;
    }

    pub fn finish_run(&mut self, duration: Duration) {
        self.runs += 1;
        self.last_run_duration = duration;
    }

    pub fn add_entries_processed(&mut self, count: u64) {
        self.entries_processed += count;
    }

    pub fn add_links_created(&mut self, count: u64) {
        self.links_created += count;
    }

    pub fn add_links_strengthened(&mut self, count: u64) {
        self.links_strengthened += count;
    }

    pub fn add_links_unchanged(&mut self, count: u64) {
        self.links_unchanged += count;
    }

    pub fn add_candidates_discarded(&mut self, count: u64) {
        self.candidates_discarded += count;
    }

    pub fn add_failures(&mut self, count: u64) {
        self.failures += count;
    }

    /// Get a summary string for logging
    pub fn summary(&self) -> String {
        format!(
            "Run #{}: processed {} entries, created {} links, strengthened {}, unchanged {}, \
             discarded {} candidates, {} failures in {:?}",
            self.runs,
            self.entries_processed,
            self.links_created,
            self.links_strengthened,
            self.links_unchanged,
            self.candidates_discarded,
            self.failures,
            self.last_run_duration,
        )
    }
}

// Custom serializer for Duration
mod duration_serializer {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

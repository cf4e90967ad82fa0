//! Auto-linker: discovers relationships between entries and persists them.
//!
//! A run over one subject entry:
//! - Evaluates every link signal against every other entry
//! - Drops candidates below the strength cutoff
//! - Keeps the strongest candidate per target
//! - Writes survivors through the link repository's upsert rule

mod auto_linker;
mod config;
mod metrics;
mod rank;
mod rules;

pub use auto_linker::{AutoLinker, BulkLinkReport};
pub use config::{AutoLinkerConfig, DetectorConfig};
pub use metrics::LinkerMetrics;
pub use rank::rank_candidates;
pub use rules::{mention_context, Candidate, LinkDetector, LinkReason, LinkSignal, SubjectText};

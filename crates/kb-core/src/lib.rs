//! Link detection and graph analysis for a personal knowledge base.
//!
//! Entries are linked by typed, weighted, directed links. The auto-linker
//! infers links from title mentions, shared tags and shared projects; the
//! graph module ranks related entries, finds clusters and summarises the
//! graph. Everything is stored in a single redb file.

pub mod api;
pub mod error;
pub mod graph;
pub mod linker;
pub mod storage;
pub mod types;

pub use api::{KnowledgeGraph, LibraryConfig};
pub use error::{KbError, Result};
pub use graph::{
    find_clusters, ClusterFinder, ConnectedEntry, GraphStats, RelevanceConfig, RelevanceEngine,
};
pub use linker::{
    AutoLinker, AutoLinkerConfig, BulkLinkReport, Candidate, DetectorConfig, LinkDetector,
    LinkReason, LinkSignal, LinkerMetrics,
};
pub use storage::{EntryStore, LinkRepository, RedbStorage, CURRENT_SCHEMA_VERSION};
pub use types::*;

use crate::graph::{orphaned_entries, ClusterFinder, GraphStats, RelevanceConfig, RelevanceEngine};
use crate::linker::{AutoLinker, AutoLinkerConfig, BulkLinkReport, Candidate, LinkerMetrics};
use crate::storage::{EntryStore, LinkRepository, RedbStorage};
use crate::{Entry, EntryId, KbError, Link, LinkId, LinkOutcome, NewLink, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Config for embedded library mode.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub auto_linker: AutoLinkerConfig,
    pub relevance: RelevanceConfig,
    /// Default minimum cluster size. Default: 3
    pub min_cluster_size: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            auto_linker: AutoLinkerConfig::new(),
            relevance: RelevanceConfig::new(),
            min_cluster_size: 3,
        }
    }
}

/// High-level, embedded knowledge-graph API.
///
/// # Example
/// ```rust,no_run
/// use kb_core::{Entry, KnowledgeGraph, LibraryConfig};
///
/// let kg = KnowledgeGraph::open("./kb.redb", LibraryConfig::default()).unwrap();
/// let entry = Entry::new("Notes", "Thinking about Zen and Cyberpunk");
/// kg.put_entry(&entry).unwrap();
/// let created = kg.auto_link_entry(&entry, 0.5).unwrap();
/// let related = kg.find_related(entry.id, 10).unwrap();
/// ```
pub struct KnowledgeGraph {
    storage: Arc<RedbStorage>,
    linker: Mutex<AutoLinker<RedbStorage, RedbStorage>>,
    relevance: RelevanceEngine<RedbStorage>,
    clusters: ClusterFinder<RedbStorage>,
    config: LibraryConfig,
}

impl KnowledgeGraph {
    /// Open (or create) a knowledge base at the given path.
    pub fn open(path: impl AsRef<Path>, config: LibraryConfig) -> Result<Self> {
        let storage = Arc::new(RedbStorage::open(path.as_ref())?);
        Self::with_storage(storage, config)
    }

    /// Build on an already opened store.
    pub fn with_storage(storage: Arc<RedbStorage>, config: LibraryConfig) -> Result<Self> {
        let linker = AutoLinker::new(storage.clone(), storage.clone(), config.auto_linker.clone())?;
        let relevance = RelevanceEngine::new(storage.clone(), config.relevance.clone())?;
        let clusters = ClusterFinder::new(storage.clone());

        Ok(Self {
            storage,
            linker: Mutex::new(linker),
            relevance,
            clusters,
            config,
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<RedbStorage> {
        &self.storage
    }

    fn linker(&self) -> Result<MutexGuard<'_, AutoLinker<RedbStorage, RedbStorage>>> {
        self.linker
            .lock()
            .map_err(|_| KbError::Validation("Auto-linker lock poisoned".into()))
    }

    // --- Entries ---

    /// Store an entry. Invalid entries are rejected with `Validation`.
    pub fn put_entry(&self, entry: &Entry) -> Result<()> {
        self.storage.put_entry(entry)
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Option<Entry>> {
        self.storage.get_entry(id)
    }

    /// Like `get_entry`, for operations that cannot proceed without it.
    pub fn require_entry(&self, id: EntryId) -> Result<Entry> {
        self.storage
            .get_entry(id)?
            .ok_or(KbError::EntryNotFound(id))
    }

    pub fn all_entries(&self) -> Result<Vec<Entry>> {
        self.storage.all_entries()
    }

    /// Delete an entry and its links.
    pub fn delete_entry(&self, id: EntryId) -> Result<bool> {
        self.storage.delete_entry(id)
    }

    // --- Links ---

    /// Create a link by hand, or strengthen an existing one for the same
    /// `(from, to, type)`.
    pub fn create_link(&self, link: NewLink) -> Result<LinkOutcome> {
        self.storage.create_link(link)
    }

    pub fn delete_link(&self, id: LinkId) -> Result<bool> {
        self.storage.delete_link(id)
    }

    pub fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
        self.storage.get_link(id)
    }

    pub fn links_from(&self, id: EntryId) -> Result<Vec<Link>> {
        self.storage.outgoing(id)
    }

    pub fn links_to(&self, id: EntryId) -> Result<Vec<Link>> {
        self.storage.incoming(id)
    }

    // --- Auto-linking ---

    /// Candidate links for `entry`, without writing anything.
    pub fn detect_links(&self, entry: &Entry, min_strength: f32) -> Result<Vec<Candidate>> {
        self.linker()?.detect(entry, min_strength)
    }

    /// Persist detected links for one entry. Returns links created or strengthened.
    pub fn auto_link_entry(&self, entry: &Entry, min_strength: f32) -> Result<usize> {
        self.linker()?.link_entry(entry, min_strength)
    }

    /// Auto-link every entry. Per-entry failures are reported, not raised.
    pub fn auto_link_all(&self, min_strength: f32) -> Result<BulkLinkReport> {
        self.linker()?.link_all(min_strength)
    }

    /// Auto-link a chosen subset of entries.
    pub fn auto_link_batch(&self, ids: &[EntryId], min_strength: f32) -> Result<BulkLinkReport> {
        self.linker()?.link_batch(ids, min_strength)
    }

    /// Candidates not yet linked from `entry`, strongest first.
    pub fn suggest_links(&self, entry: &Entry, limit: usize) -> Result<Vec<Candidate>> {
        self.linker()?.suggest(entry, limit)
    }

    pub fn linker_metrics(&self) -> Result<LinkerMetrics> {
        Ok(self.linker()?.metrics().clone())
    }

    // --- Analysis ---

    /// Related entries with scores, using the configured indirect setting.
    pub fn find_related(&self, id: EntryId, max_results: usize) -> Result<Vec<(Entry, f32)>> {
        self.find_related_with(id, max_results, self.config.relevance.include_indirect)
    }

    pub fn find_related_with(
        &self,
        id: EntryId,
        max_results: usize,
        include_indirect: bool,
    ) -> Result<Vec<(Entry, f32)>> {
        let scored = self
            .relevance
            .find_related(id, max_results, include_indirect)?;

        let mut out = Vec::with_capacity(scored.len());
        for (related, score) in scored {
            if let Some(entry) = self.storage.get_entry(related)? {
                out.push((entry, score));
            }
        }
        Ok(out)
    }

    pub fn find_clusters(&self, min_size: usize) -> Result<Vec<Vec<EntryId>>> {
        self.clusters.find_clusters(min_size)
    }

    pub fn graph_stats(&self) -> Result<GraphStats> {
        let entries = self.storage.all_entries()?;
        let links = self.storage.all_links()?;
        Ok(GraphStats::compute(&entries, &links))
    }

    /// Entries with no tags, no projects and no links.
    pub fn orphaned_entries(&self) -> Result<Vec<Entry>> {
        let entries = self.storage.all_entries()?;
        let links = self.storage.all_links()?;
        Ok(orphaned_entries(&entries, &links))
    }
}

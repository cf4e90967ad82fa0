use crate::error::Result;
use crate::linker::{rank_candidates, AutoLinkerConfig, Candidate, LinkDetector, LinkerMetrics};
use crate::storage::{EntryStore, LinkRepository};
use crate::types::{Entry, EntryId, LinkOutcome, NewLink};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a bulk auto-link run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkLinkReport {
    pub entries_processed: usize,
    pub links_created: usize,
    pub links_strengthened: usize,
    /// Entries whose linking failed, with the error message. Links written
    /// for such an entry before the failure are still counted above.
    pub failures: Vec<(EntryId, String)>,
}

impl BulkLinkReport {
    /// Links created or strengthened
    pub fn total(&self) -> usize {
        self.links_created + self.links_strengthened
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct LinkCounts {
    created: usize,
    strengthened: usize,
    unchanged: usize,
}

impl LinkCounts {
    fn changed(&self) -> usize {
        self.created + self.strengthened
    }
}

/// Detects, ranks and persists automatic links.
///
/// Re-running is safe: the repository's upsert rule never duplicates a
/// `(from, to, type)` triple and never lowers a stored strength.
pub struct AutoLinker<E: EntryStore, R: LinkRepository> {
    entries: Arc<E>,
    links: Arc<R>,
    detector: LinkDetector,
    config: AutoLinkerConfig,
    metrics: LinkerMetrics,
}

impl<E: EntryStore, R: LinkRepository> AutoLinker<E, R> {
    pub fn new(entries: Arc<E>, links: Arc<R>, config: AutoLinkerConfig) -> Result<Self> {
        config.validate()?;

        let detector = LinkDetector::new(&config.detector);

        Ok(Self {
            entries,
            links,
            detector,
            config,
            metrics: LinkerMetrics::new(),
        })
    }

    pub fn config(&self) -> &AutoLinkerConfig {
        &self.config
    }

    /// Get current metrics
    pub fn metrics(&self) -> &LinkerMetrics {
        &self.metrics
    }

    /// Ranked candidates for `entry` against every stored entry
    pub fn detect(&self, entry: &Entry, min_strength: f32) -> Result<Vec<Candidate>> {
        let population = self.entries.all_entries()?;
        Ok(self.detect_in(entry, &population, min_strength).0)
    }

    /// Candidates worth reviewing: detected at the suggestion threshold,
    /// minus targets `entry` already links to, strongest first.
    pub fn suggest(&self, entry: &Entry, limit: usize) -> Result<Vec<Candidate>> {
        let mut suggestions = self.detect(entry, self.config.suggestion_threshold)?;

        let existing: HashSet<EntryId> = self
            .links
            .outgoing(entry.id)?
            .into_iter()
            .map(|l| l.to)
            .collect();
        suggestions.retain(|s| !existing.contains(&s.to));

        suggestions.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        suggestions.truncate(limit);
        Ok(suggestions)
    }

    /// Link one entry. Returns the number of links created or strengthened.
    pub fn link_entry(&mut self, entry: &Entry, min_strength: f32) -> Result<usize> {
        let population = self.entries.all_entries()?;

        let start = Instant::now();
        self.metrics.reset_run_metrics();

        let mut counts = LinkCounts::default();
        let result = self.link_against(entry, &population, min_strength, &mut counts);

        self.record(&counts);
        self.metrics.add_entries_processed(1);
        if result.is_err() {
            self.metrics.add_failures(1);
        }
        self.metrics.finish_run(start.elapsed());

        result.map(|_| counts.changed())
    }

    /// Link every stored entry against a snapshot of the population.
    ///
    /// Best effort: a failure on one entry is logged and reported, and the
    /// run moves on. Only failing to read the population aborts the run.
    pub fn link_all(&mut self, min_strength: f32) -> Result<BulkLinkReport> {
        let population = self.entries.all_entries()?;
        Ok(self.run_bulk(&population, &population, min_strength))
    }

    /// Link a bounded set of entries. Lets callers split a large corpus into
    /// separately scheduled chunks instead of one long `link_all`.
    pub fn link_batch(&mut self, ids: &[EntryId], min_strength: f32) -> Result<BulkLinkReport> {
        let population = self.entries.all_entries()?;

        let wanted: HashSet<EntryId> = ids.iter().copied().collect();
        let subjects: Vec<Entry> = population
            .iter()
            .filter(|e| wanted.contains(&e.id))
            .cloned()
            .collect();

        let mut report = self.run_bulk(&subjects, &population, min_strength);

        let found: HashSet<EntryId> = subjects.iter().map(|e| e.id).collect();
        for id in ids {
            if !found.contains(id) {
                log::warn!("Skipping auto-link for unknown entry {}", id);
                report.failures.push((*id, "entry not found".to_string()));
            }
        }

        Ok(report)
    }

    fn run_bulk(
        &mut self,
        subjects: &[Entry],
        population: &[Entry],
        min_strength: f32,
    ) -> BulkLinkReport {
        let start = Instant::now();
        self.metrics.reset_run_metrics();

        let mut report = BulkLinkReport::default();

        for chunk in subjects.chunks(self.config.batch_size) {
            for entry in chunk {
                let mut counts = LinkCounts::default();
                let result = self.link_against(entry, population, min_strength, &mut counts);

                self.record(&counts);
                report.links_created += counts.created;
                report.links_strengthened += counts.strengthened;
                report.entries_processed += 1;

                if let Err(e) = result {
                    log::warn!("Auto-linking entry {} failed: {}", entry.id, e);
                    self.metrics.add_failures(1);
                    report.failures.push((entry.id, e.to_string()));
                }
            }

            self.metrics.add_entries_processed(chunk.len() as u64);
            log::debug!(
                "Auto-link progress: {}/{} entries",
                report.entries_processed,
                subjects.len()
            );
        }

        self.metrics.finish_run(start.elapsed());

        log::info!(
            "Auto-linked {} relationships across {} entries",
            report.total(),
            report.entries_processed
        );
        log::info!("{}", self.metrics.summary());

        report
    }

    fn detect_in(
        &self,
        entry: &Entry,
        population: &[Entry],
        min_strength: f32,
    ) -> (Vec<Candidate>, usize) {
        let raw = self.detector.detect(entry, population);
        let raw_count = raw.len();
        (rank_candidates(raw, min_strength), raw_count)
    }

    fn link_against(
        &mut self,
        entry: &Entry,
        population: &[Entry],
        min_strength: f32,
        counts: &mut LinkCounts,
    ) -> Result<()> {
        let (ranked, raw_count) = self.detect_in(entry, population, min_strength);
        self.metrics
            .add_candidates_discarded((raw_count - ranked.len()) as u64);

        for candidate in ranked {
            let request = NewLink::automatic(
                entry.id,
                candidate.to,
                candidate.link_type,
                candidate.strength,
                candidate.context,
            );

            match self.links.create_link(request)? {
                LinkOutcome::Created(link) => {
                    log::debug!(
                        "Auto-linked {} -> {} ({}, {:.2}, {})",
                        link.from,
                        link.to,
                        link.link_type,
                        link.strength,
                        candidate.reason
                    );
                    counts.created += 1;
                }
                LinkOutcome::Strengthened(_) => counts.strengthened += 1,
                LinkOutcome::Unchanged(_) => counts.unchanged += 1,
            }
        }

        Ok(())
    }

    fn record(&mut self, counts: &LinkCounts) {
        self.metrics.add_links_created(counts.created as u64);
        self.metrics.add_links_strengthened(counts.strengthened as u64);
        self.metrics.add_links_unchanged(counts.unchanged as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RedbStorage;
    use crate::types::LinkType;
    use tempfile::TempDir;

    fn setup() -> (Arc<RedbStorage>, AutoLinker<RedbStorage, RedbStorage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(RedbStorage::open(temp_dir.path().join("linker.redb")).unwrap());
        let linker =
            AutoLinker::new(storage.clone(), storage.clone(), AutoLinkerConfig::new()).unwrap();
        (storage, linker, temp_dir)
    }

    #[test]
    fn test_link_entry_is_idempotent() {
        let (storage, mut linker, _temp) = setup();
        let target = Entry::new("Zen and Cyberpunk", "...");
        let subject = Entry::new("Notes", "I was thinking about Zen and Cyberpunk today");
        storage.put_entry(&target).unwrap();
        storage.put_entry(&subject).unwrap();

        assert_eq!(linker.link_entry(&subject, 0.5).unwrap(), 1);
        assert_eq!(linker.metrics().links_created, 1);

        let before = storage.all_links().unwrap();
        assert_eq!(linker.link_entry(&subject, 0.5).unwrap(), 0);
        assert_eq!(linker.metrics().links_unchanged, 1);
        assert_eq!(storage.all_links().unwrap(), before);
        assert!(before[0].is_automatic);
    }

    #[test]
    fn test_weaker_detection_never_lowers_strength() {
        let (storage, mut linker, _temp) = setup();
        let a = Entry::new("A", "").with_tags(["x", "y"]);
        let b = Entry::new("B", "").with_tags(["x", "y"]);
        storage.put_entry(&a).unwrap();
        storage.put_entry(&b).unwrap();

        storage
            .create_link(NewLink::manual(a.id, b.id, LinkType::References).with_strength(0.9))
            .unwrap();

        assert_eq!(linker.link_entry(&a, 0.3).unwrap(), 0);
        let links = storage.outgoing(a.id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].strength, 0.9);
        assert!(!links[0].is_automatic);
    }

    #[test]
    fn test_stronger_redetection_counts_as_linked() {
        let (storage, mut linker, _temp) = setup();
        let mut a = Entry::new("Alpha", "").with_tags(["x", "y"]);
        let b = Entry::new("Beta", "").with_tags(["x", "y"]);
        storage.put_entry(&a).unwrap();
        storage.put_entry(&b).unwrap();

        assert_eq!(linker.link_entry(&a, 0.3).unwrap(), 1);
        let first = storage.outgoing(a.id).unwrap();
        assert!((first[0].strength - 0.4).abs() < 1e-6);

        a.content = "now it mentions Beta".to_string();
        storage.put_entry(&a).unwrap();

        assert_eq!(linker.link_entry(&a, 0.3).unwrap(), 1);
        assert_eq!(linker.metrics().links_strengthened, 1);
        assert_eq!(linker.metrics().links_created, 0);

        let links = storage.outgoing(a.id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, first[0].id);
        assert_eq!(links[0].strength, 0.8);
    }

    #[test]
    fn test_link_all_reports_strengthened_links() {
        let (storage, mut linker, _temp) = setup();
        let mut a = Entry::new("Alpha", "").with_tags(["x", "y"]);
        let b = Entry::new("Beta", "").with_tags(["x", "y"]);
        storage.put_entry(&a).unwrap();
        storage.put_entry(&b).unwrap();

        let first = linker.link_all(0.3).unwrap();
        assert_eq!(first.links_created, 2);
        assert_eq!(first.links_strengthened, 0);

        a.content = "now it mentions Beta".to_string();
        storage.put_entry(&a).unwrap();

        let second = linker.link_all(0.3).unwrap();
        assert_eq!(second.links_created, 0);
        assert_eq!(second.links_strengthened, 1);
        assert_eq!(second.total(), 1);
        assert_eq!(storage.count_links().unwrap(), 2);
        assert_eq!(storage.outgoing(a.id).unwrap()[0].strength, 0.8);
    }

    #[test]
    fn test_suggest_excludes_existing_targets() {
        let (storage, linker, _temp) = setup();
        let a = Entry::new("A", "mentions Beta and Gamma");
        let beta = Entry::new("Beta", "");
        let gamma = Entry::new("Gamma", "");
        let delta = Entry::new("Delta", "").with_tags(["t1", "t2"]);
        let a = a.with_tags(["t1", "t2"]);
        for e in [&a, &beta, &gamma, &delta] {
            storage.put_entry(e).unwrap();
        }
        storage
            .create_link(NewLink::manual(a.id, beta.id, LinkType::BuildsOn))
            .unwrap();

        let suggestions = linker.suggest(&a, 10).unwrap();
        let targets: Vec<_> = suggestions.iter().map(|s| s.to).collect();
        assert_eq!(targets, vec![gamma.id, delta.id]);
        assert!(suggestions[0].strength >= suggestions[1].strength);

        assert_eq!(linker.suggest(&a, 1).unwrap().len(), 1);
    }

    /// Repository that refuses writes originating from one entry
    struct FlakyLinks {
        inner: Arc<RedbStorage>,
        poisoned: EntryId,
    }

    impl LinkRepository for FlakyLinks {
        fn create_link(&self, link: NewLink) -> Result<LinkOutcome> {
            if link.from == self.poisoned {
                let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
                return Err(redb::StorageError::Io(io).into());
            }
            self.inner.create_link(link)
        }

        fn get_link(&self, id: crate::types::LinkId) -> Result<Option<crate::types::Link>> {
            self.inner.get_link(id)
        }

        fn delete_link(&self, id: crate::types::LinkId) -> Result<bool> {
            self.inner.delete_link(id)
        }

        fn outgoing(&self, entry_id: EntryId) -> Result<Vec<crate::types::Link>> {
            self.inner.outgoing(entry_id)
        }

        fn incoming(&self, entry_id: EntryId) -> Result<Vec<crate::types::Link>> {
            self.inner.incoming(entry_id)
        }

        fn all_links(&self) -> Result<Vec<crate::types::Link>> {
            self.inner.all_links()
        }

        fn count_links(&self) -> Result<u64> {
            self.inner.count_links()
        }
    }

    #[test]
    fn test_link_all_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(RedbStorage::open(temp_dir.path().join("flaky.redb")).unwrap());

        let a = Entry::new("Alpha", "see Beta");
        let b = Entry::new("Beta", "see Gamma");
        let c = Entry::new("Gamma", "see Alpha");
        for e in [&a, &b, &c] {
            storage.put_entry(e).unwrap();
        }

        let links = Arc::new(FlakyLinks {
            inner: storage.clone(),
            poisoned: b.id,
        });
        let mut linker =
            AutoLinker::new(storage.clone(), links, AutoLinkerConfig::new().with_batch_size(2))
                .unwrap();

        let report = linker.link_all(0.6).unwrap();
        assert_eq!(report.entries_processed, 3);
        assert_eq!(report.links_created, 2);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, b.id);
        assert!(!report.is_complete());

        assert_eq!(linker.metrics().failures, 1);
        assert_eq!(storage.count_links().unwrap(), 2);
        assert!(storage.outgoing(b.id).unwrap().is_empty());
    }

    /// Entry store whose population reads can be switched off
    struct UnreadableEntries {
        inner: Arc<RedbStorage>,
        broken: std::sync::atomic::AtomicBool,
    }

    impl EntryStore for UnreadableEntries {
        fn put_entry(&self, entry: &Entry) -> Result<()> {
            self.inner.put_entry(entry)
        }

        fn get_entry(&self, id: EntryId) -> Result<Option<Entry>> {
            self.inner.get_entry(id)
        }

        fn all_entries(&self) -> Result<Vec<Entry>> {
            if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
                let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
                return Err(redb::StorageError::Io(io).into());
            }
            self.inner.all_entries()
        }

        fn delete_entry(&self, id: EntryId) -> Result<bool> {
            self.inner.delete_entry(id)
        }

        fn count_entries(&self) -> Result<u64> {
            self.inner.count_entries()
        }
    }

    #[test]
    fn test_unreadable_population_keeps_last_run_metrics() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(RedbStorage::open(temp_dir.path().join("unreadable.redb")).unwrap());
        let entries = Arc::new(UnreadableEntries {
            inner: storage.clone(),
            broken: std::sync::atomic::AtomicBool::new(false),
        });
        let mut linker =
            AutoLinker::new(entries.clone(), storage.clone(), AutoLinkerConfig::new()).unwrap();

        let a = Entry::new("Alpha", "see Beta");
        let b = Entry::new("Beta", "");
        storage.put_entry(&a).unwrap();
        storage.put_entry(&b).unwrap();

        assert_eq!(linker.link_entry(&a, 0.5).unwrap(), 1);
        let last_run = linker.metrics().clone();

        entries
            .broken
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(linker.link_entry(&a, 0.5).is_err());
        assert!(linker.link_all(0.5).is_err());

        assert_eq!(linker.metrics().runs, last_run.runs);
        assert_eq!(linker.metrics().last_run_duration, last_run.last_run_duration);
        assert_eq!(linker.metrics().links_created, 1);
        assert_eq!(linker.metrics().entries_processed, 1);
    }

    #[test]
    fn test_link_batch_reports_unknown_ids() {
        let (storage, mut linker, _temp) = setup();
        let a = Entry::new("Alpha", "see Beta");
        let b = Entry::new("Beta", "");
        storage.put_entry(&a).unwrap();
        storage.put_entry(&b).unwrap();

        let missing = uuid::Uuid::now_v7();
        let report = linker.link_batch(&[a.id, missing], 0.5).unwrap();
        assert_eq!(report.entries_processed, 1);
        assert_eq!(report.links_created, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, missing);
    }
}

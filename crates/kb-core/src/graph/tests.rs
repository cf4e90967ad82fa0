use crate::graph::*;
use crate::storage::{EntryStore, LinkRepository, RedbStorage};
use crate::types::*;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_storage() -> (Arc<RedbStorage>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("graph_test.redb");
    let storage = Arc::new(RedbStorage::open(&db_path).unwrap());
    (storage, temp_dir)
}

fn store_entry(storage: &RedbStorage, title: &str) -> Entry {
    let entry = Entry::new(title, "Test body");
    storage.put_entry(&entry).unwrap();
    entry
}

fn link(storage: &RedbStorage, from: EntryId, to: EntryId, strength: f32) {
    storage
        .create_link(NewLink::manual(from, to, LinkType::References).with_strength(strength))
        .unwrap();
}

fn relevance(storage: &Arc<RedbStorage>) -> RelevanceEngine<RedbStorage> {
    RelevanceEngine::new(storage.clone(), RelevanceConfig::default()).unwrap()
}

fn assert_score(results: &[(EntryId, f32)], id: EntryId, expected: f32) {
    let (_, score) = results
        .iter()
        .find(|(e, _)| *e == id)
        .unwrap_or_else(|| panic!("{} missing from results", id));
    assert!(
        (score - expected).abs() < 1e-6,
        "expected {} got {}",
        expected,
        score
    );
}

/// Build a small test graph:
/// A -> B -> C
/// D -> A
fn build_test_graph(storage: &RedbStorage) -> (Entry, Entry, Entry, Entry) {
    let a = store_entry(storage, "A");
    let b = store_entry(storage, "B");
    let c = store_entry(storage, "C");
    let d = store_entry(storage, "D");

    link(storage, a.id, b.id, 0.9);
    link(storage, b.id, c.id, 0.5);
    link(storage, d.id, a.id, 0.5);

    (a, b, c, d)
}

#[test]
fn test_direct_and_indirect_scores() {
    let (storage, _temp) = create_test_storage();
    let (a, b, c, d) = build_test_graph(&storage);

    let results = relevance(&storage).find_related(a.id, 10, true).unwrap();

    let order: Vec<EntryId> = results.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![b.id, d.id, c.id]);
    assert_score(&results, b.id, 0.9);
    assert_score(&results, d.id, 0.4);
    assert_score(&results, c.id, 0.135);
}

#[test]
fn test_indirect_can_be_disabled() {
    let (storage, _temp) = create_test_storage();
    let (a, b, c, d) = build_test_graph(&storage);

    let results = relevance(&storage).find_related(a.id, 10, false).unwrap();
    let order: Vec<EntryId> = results.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![b.id, d.id]);
    assert!(!order.contains(&c.id));
}

#[test]
fn test_scores_accumulate_across_paths() {
    let (storage, _temp) = create_test_storage();
    let a = store_entry(&storage, "A");
    let b = store_entry(&storage, "B");

    // Both directions between A and B
    link(&storage, a.id, b.id, 0.5);
    link(&storage, b.id, a.id, 0.5);

    let results = relevance(&storage).find_related(a.id, 10, true).unwrap();
    assert_eq!(results.len(), 1);
    // 0.5 * 1.0 + 0.5 * 0.8; the B -> A hop back to the subject is skipped
    assert_score(&results, b.id, 0.9);
}

#[test]
fn test_indirect_through_two_middles_sums() {
    let (storage, _temp) = create_test_storage();
    let a = store_entry(&storage, "A");
    let x = store_entry(&storage, "X");
    let y = store_entry(&storage, "Y");
    let z = store_entry(&storage, "Z");

    link(&storage, a.id, x.id, 1.0);
    link(&storage, a.id, y.id, 0.5);
    link(&storage, x.id, z.id, 1.0);
    link(&storage, y.id, z.id, 1.0);

    let results = relevance(&storage).find_related(a.id, 10, true).unwrap();
    assert_score(&results, z.id, 0.3 + 0.15);
}

#[test]
fn test_zero_strength_links_are_not_related() {
    let (storage, _temp) = create_test_storage();
    let a = store_entry(&storage, "A");
    let b = store_entry(&storage, "B");
    link(&storage, a.id, b.id, 0.0);

    assert!(relevance(&storage)
        .find_related(a.id, 10, true)
        .unwrap()
        .is_empty());
}

#[test]
fn test_isolated_entry_has_no_related() {
    let (storage, _temp) = create_test_storage();
    build_test_graph(&storage);
    let loner = store_entry(&storage, "Loner");

    assert!(relevance(&storage)
        .find_related(loner.id, 10, true)
        .unwrap()
        .is_empty());
}

#[test]
fn test_max_results_truncates() {
    let (storage, _temp) = create_test_storage();
    let (a, b, _, _) = build_test_graph(&storage);

    let results = relevance(&storage).find_related(a.id, 1, true).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, b.id);
}

#[test]
fn test_cluster_finder_over_storage() {
    let (storage, _temp) = create_test_storage();
    let (a, b, c, d) = build_test_graph(&storage);
    let e = store_entry(&storage, "E");
    let f = store_entry(&storage, "F");
    link(&storage, f.id, e.id, 0.7);
    store_entry(&storage, "Isolated");

    let finder = ClusterFinder::new(storage.clone());

    let clusters = finder.find_clusters(2).unwrap();
    assert_eq!(clusters.len(), 2);
    let mut big = clusters[0].clone();
    big.sort();
    let mut expected = vec![a.id, b.id, c.id, d.id];
    expected.sort();
    assert_eq!(big, expected);
    assert_eq!(clusters[1].len(), 2);

    assert_eq!(finder.find_clusters(3).unwrap().len(), 1);
}

#[test]
fn test_clusters_follow_entry_deletion() {
    let (storage, _temp) = create_test_storage();
    let (_, b, _, _) = build_test_graph(&storage);

    // Removing B cascades its links and splits A-D from C
    assert!(storage.delete_entry(b.id).unwrap());

    let clusters = ClusterFinder::new(storage.clone()).find_clusters(2).unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), 2);
}

#[test]
fn test_stats_over_storage() {
    let (storage, _temp) = create_test_storage();
    let (a, b, _, _) = build_test_graph(&storage);
    store_entry(&storage, "Unlinked");

    let stats = GraphStats::compute(
        &storage.all_entries().unwrap(),
        &storage.all_links().unwrap(),
    );

    assert_eq!(stats.total_entries, 5);
    assert_eq!(stats.total_links, 3);
    // A, B and D have outgoing links
    assert_eq!(stats.entries_with_links, 3);
    assert_eq!(stats.orphaned_entries, 2);
    assert_eq!(stats.avg_links_per_entry, 0.6);
    // A and B both have degree 2
    assert_eq!(stats.most_connected[0].id, a.id.min(b.id));
    assert_eq!(stats.most_connected[1].id, a.id.max(b.id));
    assert_eq!(stats.most_connected[0].link_count, 2);
    assert_eq!(stats.most_connected.len(), 4);
    assert_eq!(stats.link_types[&LinkType::References], 3);
}

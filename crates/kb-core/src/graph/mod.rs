mod clusters;
mod relevance;
mod stats;

pub use clusters::{find_clusters, ClusterFinder, LinkGraph};
pub use relevance::{rank_scores, RelevanceConfig, RelevanceEngine};
pub use stats::{most_connected, orphaned_entries, ConnectedEntry, GraphStats, MOST_CONNECTED_LIMIT};

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::storage::LinkRepository;
use crate::types::{EntryId, Link};
use std::collections::HashMap;
use std::sync::Arc;

/// Undirected adjacency over the entries that appear in at least one link.
///
/// Entry ids are packed into a dense index in order of first appearance so
/// adjacency and visited state are plain vectors.
pub struct LinkGraph {
    ids: Vec<EntryId>,
    adjacency: Vec<Vec<usize>>,
}

impl LinkGraph {
    /// Build from links in creation order. Direction is ignored.
    pub fn from_links(links: &[Link]) -> Self {
        let mut graph = Self {
            ids: Vec::new(),
            adjacency: Vec::new(),
        };
        let mut index: HashMap<EntryId, usize> = HashMap::new();

        for link in links {
            let from = graph.slot(&mut index, link.from);
            let to = graph.slot(&mut index, link.to);
            graph.adjacency[from].push(to);
            graph.adjacency[to].push(from);
        }

        graph
    }

    fn slot(&mut self, index: &mut HashMap<EntryId, usize>, id: EntryId) -> usize {
        if let Some(&slot) = index.get(&id) {
            return slot;
        }
        let slot = self.ids.len();
        self.ids.push(id);
        self.adjacency.push(Vec::new());
        index.insert(id, slot);
        slot
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Connected components in discovery order. Iterative DFS, so deep
    /// chains cannot overflow the call stack.
    pub fn components(&self) -> Vec<Vec<EntryId>> {
        let mut visited = vec![false; self.ids.len()];
        let mut components = Vec::new();
        let mut stack = Vec::new();

        for start in 0..self.ids.len() {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            visited[start] = true;
            stack.push(start);

            while let Some(node) = stack.pop() {
                component.push(self.ids[node]);

                for &neighbor in self.adjacency[node].iter().rev() {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        stack.push(neighbor);
                    }
                }
            }

            components.push(component);
        }

        components
    }
}

/// Components of at least `min_size` entries, largest first, ties in
/// discovery order. Entries without links never appear.
pub fn find_clusters(links: &[Link], min_size: usize) -> Vec<Vec<EntryId>> {
    let mut clusters: Vec<Vec<EntryId>> = LinkGraph::from_links(links)
        .components()
        .into_iter()
        .filter(|c| c.len() >= min_size)
        .collect();

    // Stable sort keeps discovery order among equal sizes
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

/// Computes clusters from the current link set of a repository
pub struct ClusterFinder<R: LinkRepository> {
    links: Arc<R>,
}

impl<R: LinkRepository> ClusterFinder<R> {
    pub fn new(links: Arc<R>) -> Self {
        Self { links }
    }

    pub fn find_clusters(&self, min_size: usize) -> Result<Vec<Vec<EntryId>>> {
        let links = self.links.all_links()?;
        let clusters = find_clusters(&links, min_size);
        log::debug!(
            "Found {} clusters of size >= {} over {} links",
            clusters.len(),
            min_size,
            links.len()
        );
        Ok(clusters)
    }
}

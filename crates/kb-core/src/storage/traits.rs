use crate::error::Result;
use crate::types::{Entry, EntryId, Link, LinkId, LinkOutcome, NewLink};

/// Record store for entries. The link engine only needs reads; writes are
/// here for the surfaces that own entry lifecycle.
pub trait EntryStore: Send + Sync {
    /// Store an entry (insert or update)
    fn put_entry(&self, entry: &Entry) -> Result<()>;

    /// Retrieve an entry by ID
    fn get_entry(&self, id: EntryId) -> Result<Option<Entry>>;

    /// All entries, oldest first
    fn all_entries(&self) -> Result<Vec<Entry>>;

    /// Delete an entry and every link touching it.
    /// Returns false if the entry did not exist.
    fn delete_entry(&self, id: EntryId) -> Result<bool>;

    fn count_entries(&self) -> Result<u64>;
}

/// Storage for directed, typed, weighted links between entries
pub trait LinkRepository: Send + Sync {
    /// Create a link, or resolve a duplicate `(from, to, link_type)` triple
    /// by keeping the stronger of the two. A stored link is only ever
    /// strengthened by this call, never weakened.
    fn create_link(&self, link: NewLink) -> Result<LinkOutcome>;

    /// Retrieve a link by ID
    fn get_link(&self, id: LinkId) -> Result<Option<Link>>;

    /// Delete a link. Returns false if it did not exist.
    fn delete_link(&self, id: LinkId) -> Result<bool>;

    /// Links leaving an entry, strongest first, ties in creation order
    fn outgoing(&self, entry_id: EntryId) -> Result<Vec<Link>>;

    /// Links arriving at an entry, strongest first, ties in creation order
    fn incoming(&self, entry_id: EntryId) -> Result<Vec<Link>>;

    /// Every link, in creation order
    fn all_links(&self) -> Result<Vec<Link>>;

    fn count_links(&self) -> Result<u64>;
}

/// Ordering shared by `outgoing` and `incoming`
pub(crate) fn sort_by_strength(links: &mut [Link]) {
    links.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| a.seq.cmp(&b.seq))
    });
}

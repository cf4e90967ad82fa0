use crate::error::{KbError, Result};
use crate::storage::traits::{sort_by_strength, EntryStore, LinkRepository};
use crate::types::{Entry, EntryId, Link, LinkId, LinkOutcome, NewLink};
use chrono::Utc;
use redb::{
    Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition,
    WriteTransaction,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

// Table definitions
const ENTRIES: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("entries");
const LINKS: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("links");

// Secondary indexes: entry id -> link ids
type LinkIndex = MultimapTableDefinition<'static, &'static [u8; 16], &'static [u8; 16]>;
const LINKS_BY_FROM: LinkIndex = MultimapTableDefinition::new("links_by_from");
const LINKS_BY_TO: LinkIndex = MultimapTableDefinition::new("links_by_to");

// Metadata table
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &str = "schema_version";
const STATS_ENTRY_COUNT_KEY: &str = "stats:entry_count";
const STATS_LINK_COUNT_KEY: &str = "stats:link_count";
const LINK_SEQ_KEY: &str = "links:next_seq";

/// Redb-based storage for entries and links
pub struct RedbStorage {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStorage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KbError::Validation(format!("Failed to create directory: {}", e))
            })?;
        }

        let is_new = !path.exists();
        let db = Database::create(&path)?;

        if !is_new {
            Self::check_schema_version(&db)?;
        }

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTRIES)?;
            let _ = write_txn.open_table(LINKS)?;
            let _ = write_txn.open_multimap_table(LINKS_BY_FROM)?;
            let _ = write_txn.open_multimap_table(LINKS_BY_TO)?;
            let mut meta = write_txn.open_table(META)?;
            if is_new {
                meta.insert(
                    SCHEMA_VERSION_KEY,
                    CURRENT_SCHEMA_VERSION.to_string().as_bytes(),
                )?;
            }
        }
        write_txn.commit()?;

        log::debug!("Opened knowledge base at {:?}", path);

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Check schema version. Returns error if the file was written by an
    /// incompatible build.
    fn check_schema_version(db: &Database) -> Result<()> {
        let read_txn = db.begin_read()?;
        let version = {
            let table = read_txn.open_table(META).ok();
            table
                .and_then(|t| {
                    t.get(SCHEMA_VERSION_KEY).ok().flatten().and_then(|v| {
                        std::str::from_utf8(v.value())
                            .ok()
                            .and_then(|s| s.parse::<u32>().ok())
                    })
                })
                .unwrap_or(CURRENT_SCHEMA_VERSION)
        };

        match version.cmp(&CURRENT_SCHEMA_VERSION) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Less => Err(KbError::Validation(format!(
                "Database schema v{} is older than current v{}",
                version, CURRENT_SCHEMA_VERSION
            ))),
            std::cmp::Ordering::Greater => Err(KbError::Validation(format!(
                "Database schema v{} is newer than this binary v{}. Upgrade kb.",
                version, CURRENT_SCHEMA_VERSION
            ))),
        }
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn uuid_to_bytes(id: &Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn bytes_to_uuid(bytes: &[u8; 16]) -> Uuid {
        Uuid::from_bytes(*bytes)
    }

    fn serialize_entry(entry: &Entry) -> Result<Vec<u8>> {
        bincode::serialize(entry).map_err(KbError::from)
    }

    fn deserialize_entry(bytes: &[u8]) -> Result<Entry> {
        bincode::deserialize(bytes).map_err(KbError::from)
    }

    fn serialize_link(link: &Link) -> Result<Vec<u8>> {
        bincode::serialize(link).map_err(KbError::from)
    }

    fn deserialize_link(bytes: &[u8]) -> Result<Link> {
        bincode::deserialize(bytes).map_err(KbError::from)
    }

    fn decode_counter(bytes: &[u8]) -> u64 {
        bytes
            .try_into()
            .map(u64::from_le_bytes)
            .unwrap_or(0)
    }

    /// Add `delta` to a meta counter inside an open write transaction
    fn adjust_counter(txn: &WriteTransaction, key: &str, delta: i64) -> Result<u64> {
        let mut meta = txn.open_table(META)?;
        let current = meta
            .get(key)?
            .map(|v| Self::decode_counter(v.value()))
            .unwrap_or(0);
        let next = if delta >= 0 {
            current.saturating_add(delta as u64)
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };
        meta.insert(key, next.to_le_bytes().as_slice())?;
        Ok(next)
    }

    fn read_counter(&self, key: &str) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META)?;
        Ok(meta
            .get(key)?
            .map(|v| Self::decode_counter(v.value()))
            .unwrap_or(0))
    }

    fn index_link(txn: &WriteTransaction, link: &Link) -> Result<()> {
        let link_id_bytes = Self::uuid_to_bytes(&link.id);
        let from_bytes = Self::uuid_to_bytes(&link.from);
        let to_bytes = Self::uuid_to_bytes(&link.to);

        {
            let mut from_table = txn.open_multimap_table(LINKS_BY_FROM)?;
            from_table.insert(&from_bytes, &link_id_bytes)?;
        }

        {
            let mut to_table = txn.open_multimap_table(LINKS_BY_TO)?;
            to_table.insert(&to_bytes, &link_id_bytes)?;
        }

        Ok(())
    }

    fn unindex_link(txn: &WriteTransaction, link: &Link) -> Result<()> {
        let link_id_bytes = Self::uuid_to_bytes(&link.id);
        let from_bytes = Self::uuid_to_bytes(&link.from);
        let to_bytes = Self::uuid_to_bytes(&link.to);

        {
            let mut from_table = txn.open_multimap_table(LINKS_BY_FROM)?;
            from_table.remove(&from_bytes, &link_id_bytes)?;
        }

        {
            let mut to_table = txn.open_multimap_table(LINKS_BY_TO)?;
            to_table.remove(&to_bytes, &link_id_bytes)?;
        }

        Ok(())
    }

    /// Link IDs recorded under `entry_id` in one of the link indexes
    fn indexed_link_ids(
        txn: &WriteTransaction,
        index: LinkIndex,
        entry_id: EntryId,
    ) -> Result<Vec<LinkId>> {
        let table = txn.open_multimap_table(index)?;
        let key = Self::uuid_to_bytes(&entry_id);
        let raw: Vec<[u8; 16]> = table
            .get(&key)?
            .map(|r| r.map(|g| *g.value()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw.iter().map(Self::bytes_to_uuid).collect())
    }

    /// Remove a stored link by ID inside an open write transaction
    fn remove_link(txn: &WriteTransaction, id: LinkId) -> Result<Option<Link>> {
        let id_bytes = Self::uuid_to_bytes(&id);
        let link = {
            let links_table = txn.open_table(LINKS)?;
            let bytes = links_table.get(&id_bytes)?.map(|g| g.value().to_vec());
            bytes.map(|b| Self::deserialize_link(&b)).transpose()?
        };

        let Some(link) = link else {
            return Ok(None);
        };

        Self::unindex_link(txn, &link)?;
        {
            let mut links_table = txn.open_table(LINKS)?;
            links_table.remove(&id_bytes)?;
        }

        Ok(Some(link))
    }

    /// Load links for an entry through one of the link indexes
    fn links_via_index(
        &self,
        index: LinkIndex,
        entry_id: EntryId,
    ) -> Result<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let links_table = read_txn.open_table(LINKS)?;
        let index_table = read_txn.open_multimap_table(index)?;

        let key = Self::uuid_to_bytes(&entry_id);
        let link_ids: Vec<LinkId> = index_table
            .get(&key)?
            .map(|result| result.map(|guard| Self::bytes_to_uuid(guard.value())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut links = Vec::with_capacity(link_ids.len());
        for link_id in link_ids {
            let link_id_bytes = Self::uuid_to_bytes(&link_id);
            if let Some(bytes) = links_table.get(&link_id_bytes)? {
                links.push(Self::deserialize_link(bytes.value())?);
            }
        }

        sort_by_strength(&mut links);
        Ok(links)
    }
}

impl EntryStore for RedbStorage {
    fn put_entry(&self, entry: &Entry) -> Result<()> {
        entry.validate().map_err(KbError::Validation)?;

        let entry_bytes = Self::serialize_entry(entry)?;
        let id_bytes = Self::uuid_to_bytes(&entry.id);

        let write_txn = self.db.begin_write()?;
        let is_new = {
            let mut entries_table = write_txn.open_table(ENTRIES)?;
            let previous = entries_table.insert(&id_bytes, entry_bytes.as_slice())?;
            previous.is_none()
        };

        if is_new {
            Self::adjust_counter(&write_txn, STATS_ENTRY_COUNT_KEY, 1)?;
        }

        write_txn.commit()?;
        Ok(())
    }

    fn get_entry(&self, id: EntryId) -> Result<Option<Entry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        let id_bytes = Self::uuid_to_bytes(&id);

        match table.get(&id_bytes)? {
            Some(bytes) => Ok(Some(Self::deserialize_entry(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn all_entries(&self) -> Result<Vec<Entry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;

        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            entries.push(Self::deserialize_entry(value.value())?);
        }

        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn delete_entry(&self, id: EntryId) -> Result<bool> {
        let id_bytes = Self::uuid_to_bytes(&id);
        let write_txn = self.db.begin_write()?;

        let exists = {
            let entries_table = write_txn.open_table(ENTRIES)?;
            let found = entries_table.get(&id_bytes)?.is_some();
            found
        };
        if !exists {
            write_txn.abort()?;
            return Ok(false);
        }

        // Links touching the entry go with it
        let mut link_ids: BTreeSet<LinkId> = BTreeSet::new();
        link_ids.extend(Self::indexed_link_ids(&write_txn, LINKS_BY_FROM, id)?);
        link_ids.extend(Self::indexed_link_ids(&write_txn, LINKS_BY_TO, id)?);

        let mut removed = 0i64;
        for link_id in link_ids {
            if Self::remove_link(&write_txn, link_id)?.is_some() {
                removed += 1;
            }
        }

        {
            let mut entries_table = write_txn.open_table(ENTRIES)?;
            entries_table.remove(&id_bytes)?;
        }

        Self::adjust_counter(&write_txn, STATS_ENTRY_COUNT_KEY, -1)?;
        if removed > 0 {
            Self::adjust_counter(&write_txn, STATS_LINK_COUNT_KEY, -removed)?;
        }

        write_txn.commit()?;
        log::debug!("Deleted entry {} and {} links", id, removed);
        Ok(true)
    }

    fn count_entries(&self) -> Result<u64> {
        self.read_counter(STATS_ENTRY_COUNT_KEY)
    }
}

impl LinkRepository for RedbStorage {
    fn create_link(&self, link: NewLink) -> Result<LinkOutcome> {
        let link = link
            .validate()
            .map_err(|reason| KbError::InvalidLink { reason })?;

        let from_bytes = Self::uuid_to_bytes(&link.from);
        let to_bytes = Self::uuid_to_bytes(&link.to);

        // Single write transaction: check endpoints, resolve duplicates, write
        let write_txn = self.db.begin_write()?;

        // 1. Both endpoints must be stored entries
        {
            let entries_table = write_txn.open_table(ENTRIES)?;
            if entries_table.get(&from_bytes)?.is_none() {
                return Err(KbError::InvalidLink {
                    reason: format!("Source entry {} does not exist", link.from),
                });
            }
            if entries_table.get(&to_bytes)?.is_none() {
                return Err(KbError::InvalidLink {
                    reason: format!("Target entry {} does not exist", link.to),
                });
            }
        }

        // 2. Look for an existing link on the same (from, to, type) triple
        let outgoing_ids = Self::indexed_link_ids(&write_txn, LINKS_BY_FROM, link.from)?;
        let existing = {
            let links_table = write_txn.open_table(LINKS)?;
            let mut found = None;
            for link_id in &outgoing_ids {
                let link_id_bytes = Self::uuid_to_bytes(link_id);
                if let Some(bytes) = links_table.get(&link_id_bytes)? {
                    let stored = Self::deserialize_link(bytes.value())?;
                    if stored.to == link.to && stored.link_type == link.link_type {
                        found = Some(stored);
                        break;
                    }
                }
            }
            found
        };

        // 3. Duplicate: strengthen in place or leave alone
        if let Some(mut stored) = existing {
            if link.strength <= stored.strength {
                write_txn.abort()?;
                return Ok(LinkOutcome::Unchanged(stored));
            }

            stored.strength = link.strength;
            stored.context = link.context;
            stored.updated_at = Utc::now();

            let bytes = Self::serialize_link(&stored)?;
            {
                let mut links_table = write_txn.open_table(LINKS)?;
                let id_bytes = Self::uuid_to_bytes(&stored.id);
                links_table.insert(&id_bytes, bytes.as_slice())?;
            }
            write_txn.commit()?;

            log::debug!(
                "Strengthened link {} -> {} ({}) to {:.2}",
                stored.from,
                stored.to,
                stored.link_type,
                stored.strength
            );
            return Ok(LinkOutcome::Strengthened(stored));
        }

        // 4. New link
        let seq = Self::adjust_counter(&write_txn, LINK_SEQ_KEY, 1)?;
        let now = Utc::now();
        let stored = Link {
            id: Uuid::now_v7(),
            seq,
            from: link.from,
            to: link.to,
            link_type: link.link_type,
            strength: link.strength,
            context: link.context,
            is_automatic: link.is_automatic,
            created_at: now,
            updated_at: now,
        };

        let bytes = Self::serialize_link(&stored)?;
        {
            let mut links_table = write_txn.open_table(LINKS)?;
            let id_bytes = Self::uuid_to_bytes(&stored.id);
            links_table.insert(&id_bytes, bytes.as_slice())?;
        }
        Self::index_link(&write_txn, &stored)?;
        Self::adjust_counter(&write_txn, STATS_LINK_COUNT_KEY, 1)?;

        write_txn.commit()?;

        log::debug!(
            "Created link: {} -> {} ({})",
            stored.from,
            stored.to,
            stored.link_type
        );
        Ok(LinkOutcome::Created(stored))
    }

    fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINKS)?;
        let id_bytes = Self::uuid_to_bytes(&id);

        match table.get(&id_bytes)? {
            Some(bytes) => Ok(Some(Self::deserialize_link(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn delete_link(&self, id: LinkId) -> Result<bool> {
        let write_txn = self.db.begin_write()?;

        if Self::remove_link(&write_txn, id)?.is_none() {
            write_txn.abort()?;
            return Ok(false);
        }

        Self::adjust_counter(&write_txn, STATS_LINK_COUNT_KEY, -1)?;
        write_txn.commit()?;
        Ok(true)
    }

    fn outgoing(&self, entry_id: EntryId) -> Result<Vec<Link>> {
        self.links_via_index(LINKS_BY_FROM, entry_id)
    }

    fn incoming(&self, entry_id: EntryId) -> Result<Vec<Link>> {
        self.links_via_index(LINKS_BY_TO, entry_id)
    }

    fn all_links(&self) -> Result<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINKS)?;

        let mut links = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            links.push(Self::deserialize_link(value.value())?);
        }

        links.sort_by_key(|l| l.seq);
        Ok(links)
    }

    fn count_links(&self) -> Result<u64> {
        self.read_counter(STATS_LINK_COUNT_KEY)
    }
}

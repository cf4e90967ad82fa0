use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Type alias for entry identifiers
pub type EntryId = Uuid;

/// Type alias for link identifiers
pub type LinkId = Uuid;

/// Longest accepted entry title, in characters
pub const MAX_TITLE_CHARS: usize = 500;

/// A knowledge-base record: a note, web clip, chat export or email.
///
/// The link engine only reads entries. Links are never embedded here;
/// they are reached through the link repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Unique identifier. UUIDv7 for time-sortability.
    pub id: EntryId,

    /// Human-readable title. Mentions of it in other entries become links.
    pub title: String,

    /// Raw text content.
    pub content: String,

    /// Tag names.
    pub tags: BTreeSet<String>,

    /// Project names.
    pub projects: BTreeSet<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Create a new entry with no tags or projects
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Entry {
            id: Uuid::now_v7(),
            title: title.into(),
            content: content.into(),
            tags: BTreeSet::new(),
            projects: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_projects<I, T>(mut self, projects: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.projects = projects.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the entry before it is stored
    pub fn validate(&self) -> Result<(), String> {
        let title_len = self.title.chars().count();
        if title_len == 0 {
            return Err("Title must not be empty".to_string());
        }
        if title_len > MAX_TITLE_CHARS {
            return Err(format!("Title exceeds {} characters", MAX_TITLE_CHARS));
        }

        for tag in &self.tags {
            if tag.trim().is_empty() {
                return Err("Tag names must not be empty".to_string());
            }
        }

        for project in &self.projects {
            if project.trim().is_empty() {
                return Err("Project names must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Mark the entry as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Relationship types between entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// A mentions or cites B. Default for title mentions and shared tags.
    References,

    /// A extends the ideas in B.
    BuildsOn,

    /// A and B disagree.
    Contradicts,

    /// A is relevant to B's project or domain. Default for shared projects.
    AppliesTo,

    /// A was sparked by B.
    InspiredBy,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::References => "references",
            LinkType::BuildsOn => "builds_on",
            LinkType::Contradicts => "contradicts",
            LinkType::AppliesTo => "applies_to",
            LinkType::InspiredBy => "inspired_by",
        }
    }

    pub fn all() -> [LinkType; 5] {
        [
            LinkType::References,
            LinkType::BuildsOn,
            LinkType::Contradicts,
            LinkType::AppliesTo,
            LinkType::InspiredBy,
        ]
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkType::all()
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Unknown link type '{}' (expected one of: references, builds_on, contradicts, applies_to, inspired_by)",
                    s
                )
            })
    }
}

/// A directed, typed, weighted relation between two entries.
///
/// `(from, to, link_type)` is the natural key: the repository holds at
/// most one link per triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// Unique identifier. UUIDv7.
    pub id: LinkId,

    /// Insertion sequence assigned by the repository. Orders links
    /// created within the same instant.
    pub seq: u64,

    pub from: EntryId,

    pub to: EntryId,

    pub link_type: LinkType,

    /// Confidence in [0, 1]. Raised in place by stronger re-detection,
    /// never lowered by it.
    pub strength: f32,

    /// Text window or reason that produced the link.
    pub context: Option<String>,

    /// Created by the auto-linker rather than by a user.
    pub is_automatic: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// The entry on the other side of this link, seen from `id`
    pub fn other_end(&self, id: EntryId) -> EntryId {
        if self.from == id {
            self.to
        } else {
            self.from
        }
    }
}

/// Request to create (or strengthen) a link
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub from: EntryId,
    pub to: EntryId,
    pub link_type: LinkType,
    pub strength: f32,
    pub context: Option<String>,
    pub is_automatic: bool,
}

impl NewLink {
    /// A user-created link. Manual links default to full strength.
    pub fn manual(from: EntryId, to: EntryId, link_type: LinkType) -> Self {
        Self {
            from,
            to,
            link_type,
            strength: 1.0,
            context: None,
            is_automatic: false,
        }
    }

    /// A link proposed by the auto-linker
    pub fn automatic(
        from: EntryId,
        to: EntryId,
        link_type: LinkType,
        strength: f32,
        context: Option<String>,
    ) -> Self {
        Self {
            from,
            to,
            link_type,
            strength,
            context,
            is_automatic: true,
        }
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Check invariants and normalise strength into [0, 1].
    ///
    /// Self-links and non-finite strengths are rejected; finite strengths
    /// outside the range are clamped.
    pub fn validate(mut self) -> Result<Self, String> {
        if self.from == self.to {
            return Err("Self-links are not allowed".to_string());
        }

        if !self.strength.is_finite() {
            return Err(format!("Strength {} is not a finite number", self.strength));
        }

        self.strength = self.strength.clamp(0.0, 1.0);
        Ok(self)
    }
}

/// What the repository did with a `NewLink`
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// No link existed for the triple; a new one was stored.
    Created(Link),

    /// A weaker link existed; its strength and context were raised in place.
    Strengthened(Link),

    /// An equal or stronger link existed and was left untouched.
    Unchanged(Link),
}

impl LinkOutcome {
    pub fn link(&self) -> &Link {
        match self {
            LinkOutcome::Created(link)
            | LinkOutcome::Strengthened(link)
            | LinkOutcome::Unchanged(link) => link,
        }
    }

    pub fn into_link(self) -> Link {
        match self {
            LinkOutcome::Created(link)
            | LinkOutcome::Strengthened(link)
            | LinkOutcome::Unchanged(link) => link,
        }
    }

    /// Whether the store was modified
    pub fn changed(&self) -> bool {
        !matches!(self, LinkOutcome::Unchanged(_))
    }
}

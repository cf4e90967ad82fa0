use crate::linker::DetectorConfig;
use crate::types::{Entry, EntryId, LinkType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which heuristic produced a candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LinkReason {
    TitleMention,
    SharedTags,
    SharedProject,
}

impl LinkReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkReason::TitleMention => "title_mention",
            LinkReason::SharedTags => "shared_tags",
            LinkReason::SharedProject => "shared_project",
        }
    }
}

impl fmt::Display for LinkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proposed link from signal evaluation. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub to: EntryId,
    pub to_title: String,
    pub link_type: LinkType,
    pub strength: f32,
    pub context: Option<String>,
    pub reason: LinkReason,
}

/// Subject text prepared once per detection pass
pub struct SubjectText {
    lowered: String,
}

impl SubjectText {
    pub fn new(subject: &Entry) -> Self {
        Self {
            lowered: format!("{} {}", subject.title, subject.content).to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.lowered
    }
}

/// A single link heuristic
#[derive(Debug, Clone)]
pub enum LinkSignal {
    /// The other entry's title appears in the subject's text → References.
    TitleMention { strength: f32, window: usize },

    /// At least `min_shared` tags in common → References, scaled by count.
    SharedTags {
        min_shared: usize,
        per_tag: f32,
        cap: f32,
    },

    /// At least one project in common → AppliesTo.
    SharedProject { strength: f32 },
}

impl LinkSignal {
    pub fn title_mention() -> Self {
        Self::TitleMention {
            strength: 0.8,
            window: 50,
        }
    }

    pub fn shared_tags() -> Self {
        Self::SharedTags {
            min_shared: 2,
            per_tag: 0.2,
            cap: 0.7,
        }
    }

    pub fn shared_project() -> Self {
        Self::SharedProject { strength: 0.6 }
    }

    /// The full signal set, parameterised by `config`
    pub fn from_config(config: &DetectorConfig) -> Vec<Self> {
        vec![
            Self::TitleMention {
                strength: config.title_mention_strength,
                window: config.context_window,
            },
            Self::SharedTags {
                min_shared: config.min_shared_tags,
                per_tag: config.shared_tag_weight,
                cap: config.shared_tag_cap,
            },
            Self::SharedProject {
                strength: config.shared_project_strength,
            },
        ]
    }

    /// Evaluate this signal for one `(subject, other)` pair
    pub fn evaluate(&self, subject: &Entry, text: &SubjectText, other: &Entry) -> Option<Candidate> {
        if subject.id == other.id {
            return None;
        }

        match self {
            Self::TitleMention { strength, window } => {
                let needle = other.title.to_lowercase();
                if needle.trim().is_empty() {
                    return None;
                }

                let context = mention_context(text.as_str(), &needle, *window)?;
                Some(Candidate {
                    to: other.id,
                    to_title: other.title.clone(),
                    link_type: LinkType::References,
                    strength: *strength,
                    context: Some(context),
                    reason: LinkReason::TitleMention,
                })
            }

            Self::SharedTags {
                min_shared,
                per_tag,
                cap,
            } => {
                let shared: Vec<&str> = subject
                    .tags
                    .intersection(&other.tags)
                    .map(String::as_str)
                    .collect();

                if shared.len() < *min_shared {
                    return None;
                }

                Some(Candidate {
                    to: other.id,
                    to_title: other.title.clone(),
                    link_type: LinkType::References,
                    strength: (per_tag * shared.len() as f32).min(*cap),
                    context: Some(format!("Shared tags: {}", shared.join(", "))),
                    reason: LinkReason::SharedTags,
                })
            }

            Self::SharedProject { strength } => {
                let shared: Vec<&str> = subject
                    .projects
                    .intersection(&other.projects)
                    .map(String::as_str)
                    .collect();

                if shared.is_empty() {
                    return None;
                }

                Some(Candidate {
                    to: other.id,
                    to_title: other.title.clone(),
                    link_type: LinkType::AppliesTo,
                    strength: *strength,
                    context: Some(format!("Shared project: {}", shared.join(", "))),
                    reason: LinkReason::SharedProject,
                })
            }
        }
    }
}

/// Text around a mention of `needle`: up to `window` characters before and
/// after, never crossing a line break.
///
/// The window opens as early as possible on the first mention's line, and
/// the anchored mention is the last one that still fits inside the leading
/// `window` characters.
pub fn mention_context(text: &str, needle: &str, window: usize) -> Option<String> {
    let first = text.find(needle)?;

    let mut ctx_start = first;
    for (i, c) in text[..first].char_indices().rev().take(window) {
        if c == '\n' {
            break;
        }
        ctx_start = i;
    }

    let mut start = first;
    for (offset, (i, c)) in text[ctx_start..].char_indices().enumerate() {
        if offset > window {
            break;
        }
        if text[ctx_start + i..].starts_with(needle) {
            start = ctx_start + i;
        }
        if c == '\n' {
            break;
        }
    }
    let end = start + needle.len();

    let mut ctx_end = end;
    for (i, c) in text[end..].char_indices().take(window) {
        if c == '\n' {
            break;
        }
        ctx_end = end + i + c.len_utf8();
    }

    Some(text[ctx_start..ctx_end].to_string())
}

/// Runs every signal over a subject and the entry population.
///
/// One subject costs O(N) comparisons, each a substring scan of the
/// subject text, so a full pass over all entries is O(N²·L).
pub struct LinkDetector {
    signals: Vec<LinkSignal>,
}

impl LinkDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            signals: LinkSignal::from_config(config),
        }
    }

    pub fn with_signals(signals: Vec<LinkSignal>) -> Self {
        Self { signals }
    }

    /// Raw candidates for `subject`, in population order. Several signals may
    /// fire for the same target; ranking resolves that downstream.
    pub fn detect(&self, subject: &Entry, population: &[Entry]) -> Vec<Candidate> {
        let text = SubjectText::new(subject);
        let mut candidates = Vec::new();

        for other in population {
            if other.id == subject.id {
                continue;
            }
            for signal in &self.signals {
                if let Some(candidate) = signal.evaluate(subject, &text, other) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}

impl Default for LinkDetector {
    fn default() -> Self {
        Self::new(&DetectorConfig::default())
    }
}

use crate::error::{KbError, Result};
use crate::storage::LinkRepository;
use crate::types::EntryId;
use std::collections::HashMap;
use std::sync::Arc;

/// Weights for the relevance scoring model
#[derive(Debug, Clone)]
pub struct RelevanceConfig {
    /// Multiplier for links leaving the subject.
    pub outgoing_weight: f32,

    /// Multiplier for links arriving at the subject.
    pub incoming_weight: f32,

    /// Damping applied to two-hop paths `subject → X → Z`.
    pub indirect_damping: f32,

    pub include_indirect: bool,

    pub max_results: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            outgoing_weight: 1.0,
            incoming_weight: 0.8,
            indirect_damping: 0.3,
            include_indirect: true,
            max_results: 10,
        }
    }
}

impl RelevanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, outgoing: f32, incoming: f32, damping: f32) -> Self {
        self.outgoing_weight = outgoing;
        self.incoming_weight = incoming;
        self.indirect_damping = damping;
        self
    }

    pub fn with_include_indirect(mut self, include: bool) -> Self {
        self.include_indirect = include;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("outgoing_weight", self.outgoing_weight),
            ("incoming_weight", self.incoming_weight),
            ("indirect_damping", self.indirect_damping),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(KbError::Validation(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Scores entries by how closely they are linked to a subject.
///
/// The model is additive: every path contributes and contributions to the
/// same target are summed.
/// - `subject → X` adds `strength · outgoing_weight` to X
/// - `Y → subject` adds `strength · incoming_weight` to Y
/// - `subject → X → Z` (Z ≠ subject) adds
///   `strength₁ · strength₂ · indirect_damping` to Z
pub struct RelevanceEngine<R: LinkRepository> {
    links: Arc<R>,
    config: RelevanceConfig,
}

impl<R: LinkRepository> RelevanceEngine<R> {
    pub fn new(links: Arc<R>, config: RelevanceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { links, config })
    }

    pub fn config(&self) -> &RelevanceConfig {
        &self.config
    }

    /// Top `max_results` related entries, highest score first, ties by id.
    /// Entries scoring zero are never returned.
    pub fn find_related(
        &self,
        subject: EntryId,
        max_results: usize,
        include_indirect: bool,
    ) -> Result<Vec<(EntryId, f32)>> {
        let mut scores: HashMap<EntryId, f32> = HashMap::new();

        let outgoing = self.links.outgoing(subject)?;
        for link in &outgoing {
            *scores.entry(link.to).or_insert(0.0) += link.strength * self.config.outgoing_weight;
        }

        for link in self.links.incoming(subject)? {
            *scores.entry(link.from).or_insert(0.0) +=
                link.strength * self.config.incoming_weight;
        }

        if include_indirect {
            let mut hops_by_middle = HashMap::new();
            for link in &outgoing {
                if !hops_by_middle.contains_key(&link.to) {
                    hops_by_middle.insert(link.to, self.links.outgoing(link.to)?);
                }

                for hop in &hops_by_middle[&link.to] {
                    if hop.to == subject {
                        continue;
                    }
                    *scores.entry(hop.to).or_insert(0.0) +=
                        link.strength * hop.strength * self.config.indirect_damping;
                }
            }
        }

        Ok(rank_scores(scores, max_results))
    }
}

/// Drop non-positive scores, sort by score descending then id, truncate
pub fn rank_scores(scores: HashMap<EntryId, f32>, max_results: usize) -> Vec<(EntryId, f32)> {
    let mut ranked: Vec<(EntryId, f32)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_results);
    ranked
}

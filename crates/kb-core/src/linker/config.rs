use crate::error::{KbError, Result};

/// Strengths and thresholds for the link detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Strength of a `references` link when the other entry's title appears
    /// in the subject's title or content. Default: 0.8.
    pub title_mention_strength: f32,

    /// Strength contributed by each shared tag. Default: 0.2.
    pub shared_tag_weight: f32,

    /// Upper bound on shared-tag strength. Default: 0.7.
    pub shared_tag_cap: f32,

    /// Minimum number of shared tags before a link is proposed. Default: 2.
    pub min_shared_tags: usize,

    /// Strength of an `applies_to` link between entries sharing a project.
    /// Default: 0.6.
    pub shared_project_strength: f32,

    /// Characters of surrounding text kept on each side of a title mention.
    /// Default: 50.
    pub context_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            title_mention_strength: 0.8,
            shared_tag_weight: 0.2,
            shared_tag_cap: 0.7,
            min_shared_tags: 2,
            shared_project_strength: 0.6,
            context_window: 50,
        }
    }
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title_mention_strength(mut self, strength: f32) -> Self {
        self.title_mention_strength = strength;
        self
    }

    pub fn with_shared_tags(mut self, min_shared: usize, weight: f32, cap: f32) -> Self {
        self.min_shared_tags = min_shared;
        self.shared_tag_weight = weight;
        self.shared_tag_cap = cap;
        self
    }

    pub fn with_shared_project_strength(mut self, strength: f32) -> Self {
        self.shared_project_strength = strength;
        self
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("title_mention_strength", self.title_mention_strength),
            ("shared_tag_weight", self.shared_tag_weight),
            ("shared_tag_cap", self.shared_tag_cap),
            ("shared_project_strength", self.shared_project_strength),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(KbError::Validation(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if self.min_shared_tags == 0 {
            return Err(KbError::Validation("min_shared_tags must be > 0".into()));
        }

        Ok(())
    }
}

/// Configuration for the auto-linker
#[derive(Debug, Clone)]
pub struct AutoLinkerConfig {
    /// Detector strengths.
    pub detector: DetectorConfig,

    /// Minimum candidate strength when linking a single entry. Default: 0.5.
    pub min_strength: f32,

    /// Minimum candidate strength for a full auto-link run. Default: 0.6.
    pub bulk_min_strength: f32,

    /// Entries processed per chunk during a full run. Progress is logged
    /// after every chunk. Default: 100.
    pub batch_size: usize,

    /// Threshold used when suggesting links for review. Default: 0.3.
    pub suggestion_threshold: f32,

    /// Maximum suggestions returned. Default: 10.
    pub suggestion_limit: usize,
}

impl Default for AutoLinkerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            min_strength: 0.5,
            bulk_min_strength: 0.6,
            batch_size: 100,
            suggestion_threshold: 0.3,
            suggestion_limit: 10,
        }
    }
}

impl AutoLinkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_min_strength(mut self, min_strength: f32) -> Self {
        self.min_strength = min_strength;
        self
    }

    pub fn with_bulk_min_strength(mut self, min_strength: f32) -> Self {
        self.bulk_min_strength = min_strength;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_suggestions(mut self, threshold: f32, limit: usize) -> Self {
        self.suggestion_threshold = threshold;
        self.suggestion_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;

        for (name, value) in [
            ("min_strength", self.min_strength),
            ("bulk_min_strength", self.bulk_min_strength),
            ("suggestion_threshold", self.suggestion_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(KbError::Validation(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if self.batch_size == 0 {
            return Err(KbError::Validation("batch_size must be > 0".into()));
        }

        Ok(())
    }
}

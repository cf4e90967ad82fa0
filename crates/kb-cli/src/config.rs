use anyhow::Context;
use kb_core::{AutoLinkerConfig, DetectorConfig, LibraryConfig, RelevanceConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Contents of `kb.toml`. Every field has a default, so a missing file or a
/// partial one is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KbConfig {
    /// Directory holding `kb.redb`.
    pub data_dir: PathBuf,

    /// Default log filter. `RUST_LOG` wins when set.
    pub log_level: String,

    pub linker: LinkerSection,

    pub relevance: RelevanceSection,

    pub clusters: ClusterSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkerSection {
    pub title_mention_strength: f32,
    pub shared_tag_weight: f32,
    pub shared_tag_cap: f32,
    pub min_shared_tags: usize,
    pub shared_project_strength: f32,
    pub context_window: usize,
    pub min_strength: f32,
    pub bulk_min_strength: f32,
    pub batch_size: usize,
    pub suggestion_threshold: f32,
    pub suggestion_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelevanceSection {
    pub outgoing_weight: f32,
    pub incoming_weight: f32,
    pub indirect_damping: f32,
    pub include_indirect: bool,
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterSection {
    pub min_size: usize,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: "info".into(),
            linker: LinkerSection::default(),
            relevance: RelevanceSection::default(),
            clusters: ClusterSection::default(),
        }
    }
}

impl Default for LinkerSection {
    fn default() -> Self {
        let linker = AutoLinkerConfig::default();
        let detector = linker.detector;
        Self {
            title_mention_strength: detector.title_mention_strength,
            shared_tag_weight: detector.shared_tag_weight,
            shared_tag_cap: detector.shared_tag_cap,
            min_shared_tags: detector.min_shared_tags,
            shared_project_strength: detector.shared_project_strength,
            context_window: detector.context_window,
            min_strength: linker.min_strength,
            bulk_min_strength: linker.bulk_min_strength,
            batch_size: linker.batch_size,
            suggestion_threshold: linker.suggestion_threshold,
            suggestion_limit: linker.suggestion_limit,
        }
    }
}

impl Default for RelevanceSection {
    fn default() -> Self {
        let relevance = RelevanceConfig::default();
        Self {
            outgoing_weight: relevance.outgoing_weight,
            incoming_weight: relevance.incoming_weight,
            indirect_damping: relevance.indirect_damping,
            include_indirect: relevance.include_indirect,
            max_results: relevance.max_results,
        }
    }
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            min_size: LibraryConfig::default().min_cluster_size,
        }
    }
}

impl KbConfig {
    /// Parse a config file. Fails if it is missing or malformed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse a config file if it exists. A missing file yields defaults; a
    /// malformed one is still an error.
    pub fn load_optional(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Best effort: defaults when the file is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("kb.redb")
    }

    pub fn library_config(&self) -> LibraryConfig {
        let l = &self.linker;
        let detector = DetectorConfig::new()
            .with_title_mention_strength(l.title_mention_strength)
            .with_shared_tags(l.min_shared_tags, l.shared_tag_weight, l.shared_tag_cap)
            .with_shared_project_strength(l.shared_project_strength)
            .with_context_window(l.context_window);

        let auto_linker = AutoLinkerConfig::new()
            .with_detector(detector)
            .with_min_strength(l.min_strength)
            .with_bulk_min_strength(l.bulk_min_strength)
            .with_batch_size(l.batch_size)
            .with_suggestions(l.suggestion_threshold, l.suggestion_limit);

        let r = &self.relevance;
        let relevance = RelevanceConfig::new()
            .with_weights(r.outgoing_weight, r.incoming_weight, r.indirect_damping)
            .with_include_indirect(r.include_indirect)
            .with_max_results(r.max_results);

        LibraryConfig {
            auto_linker,
            relevance,
            min_cluster_size: self.clusters.min_size,
        }
    }

    /// Every problem found, empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if EnvFilter::try_new(&self.log_level).is_err() {
            errors.push(format!("log_level '{}' is not a valid filter", self.log_level));
        }

        let library = self.library_config();
        if let Err(e) = library.auto_linker.validate() {
            errors.push(format!("linker: {}", e));
        }
        if let Err(e) = library.relevance.validate() {
            errors.push(format!("relevance: {}", e));
        }

        if self.clusters.min_size == 0 {
            errors.push("clusters.min_size must be > 0".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_library() {
        let config = KbConfig::default();
        assert!(config.validate().is_empty());

        let library = config.library_config();
        assert_eq!(library.auto_linker.min_strength, 0.5);
        assert_eq!(library.auto_linker.bulk_min_strength, 0.6);
        assert_eq!(library.auto_linker.detector.context_window, 50);
        assert_eq!(library.relevance.incoming_weight, 0.8);
        assert_eq!(library.min_cluster_size, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kb.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/notes\"\n\n[linker]\nmin_strength = 0.7\n",
        )
        .unwrap();

        let config = KbConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/notes/kb.redb"));
        assert_eq!(config.linker.min_strength, 0.7);
        assert_eq!(config.linker.batch_size, 100);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");
        assert!(KbConfig::load(&missing).is_err());
        assert_eq!(KbConfig::load_optional(&missing).unwrap(), KbConfig::default());

        let broken = temp.path().join("broken.toml");
        std::fs::write(&broken, "data_dir = [").unwrap();
        assert!(KbConfig::load_optional(&broken).is_err());
        assert_eq!(KbConfig::load_or_default(&broken), KbConfig::default());
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = KbConfig::default();
        config.linker.min_strength = 1.5;
        config.relevance.indirect_damping = -1.0;
        config.clusters.min_size = 0;

        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("linker:"));
        assert!(errors[1].starts_with("relevance:"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = KbConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: KbConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}

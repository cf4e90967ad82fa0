pub mod config_cmd;
pub mod entry;
pub mod link;
pub mod stats;

use crate::config::KbConfig;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kb_core::{Entry, EntryId, KnowledgeGraph, Link, LinkType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kb")]
#[command(version, about = "Personal knowledge base with an automatic link graph")]
pub struct Cli {
    /// Path to kb.toml
    #[arg(long, global = true, env = "KB_CONFIG", default_value = "kb.toml")]
    pub config: PathBuf,

    /// Path to data directory (overrides config file)
    #[arg(long, global = true, env = "KB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "kb_core=debug" (overrides config file)
    #[arg(long, global = true, env = "KB_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Entry operations
    #[command(subcommand)]
    Entry(EntryCommands),
    /// Link operations and graph analysis
    #[command(subcommand)]
    Link(LinkCommands),
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// Add an entry
    Add(EntryAddArgs),
    /// Show an entry with its links
    Show(EntryShowArgs),
    /// List all entries
    List(FormatArgs),
    /// Delete an entry and its links
    Delete(EntryIdArg),
    /// Entries with no tags, projects or links
    Orphans(FormatArgs),
}

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Create a link by hand
    Create(LinkCreateArgs),
    /// Delete a link by id
    Delete(LinkDeleteArgs),
    /// List links of an entry
    List(LinkListArgs),
    /// Show candidate links for an entry without writing them
    Detect(LinkDetectArgs),
    /// Suggest links not yet made from an entry
    Suggest(LinkSuggestArgs),
    /// Auto-link one entry
    Auto(LinkAutoArgs),
    /// Auto-link every entry
    AutoAll(LinkAutoAllArgs),
    /// Entries related to an entry, by link score
    Related(LinkRelatedArgs),
    /// Graph statistics
    Stats(FormatArgs),
    /// Connected clusters of linked entries
    Clusters(LinkClustersArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Validate,
    Show,
}

#[derive(Args, Debug)]
pub struct FormatArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct EntryIdArg {
    pub id: EntryId,
}

#[derive(Args, Debug)]
pub struct EntryAddArgs {
    pub title: String,
    /// Entry text
    #[arg(long, conflicts_with = "stdin")]
    pub content: Option<String>,
    /// Read entry text from stdin
    #[arg(long)]
    pub stdin: bool,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Project (repeatable)
    #[arg(long = "project")]
    pub projects: Vec<String>,
    /// Auto-link the new entry right away
    #[arg(long)]
    pub auto_link: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct EntryShowArgs {
    pub id: EntryId,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkCreateArgs {
    pub from: EntryId,
    pub to: EntryId,
    /// references, builds_on, contradicts, applies_to or inspired_by
    #[arg(long = "type", default_value = "references")]
    pub link_type: LinkType,
    /// Strength [0.0–1.0]
    #[arg(long, default_value = "1.0")]
    pub strength: f32,
    #[arg(long)]
    pub context: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkDeleteArgs {
    pub id: uuid::Uuid,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Args, Debug)]
pub struct LinkListArgs {
    pub entry: EntryId,
    #[arg(long, value_enum, default_value_t = Direction::Both)]
    pub direction: Direction,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkDetectArgs {
    pub entry: EntryId,
    /// Minimum strength (default from config)
    #[arg(long)]
    pub min_strength: Option<f32>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkSuggestArgs {
    pub entry: EntryId,
    /// Maximum suggestions (default from config)
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkAutoArgs {
    pub entry: EntryId,
    /// Minimum strength (default from config)
    #[arg(long)]
    pub min_strength: Option<f32>,
}

#[derive(Args, Debug)]
pub struct LinkAutoAllArgs {
    /// Minimum strength (default from config)
    #[arg(long)]
    pub min_strength: Option<f32>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkRelatedArgs {
    pub entry: EntryId,
    /// Maximum results (default from config)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Ignore two-hop paths
    #[arg(long)]
    pub direct_only: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LinkClustersArgs {
    /// Minimum cluster size (default from config)
    #[arg(long)]
    pub min_size: Option<usize>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Open the knowledge base named by `config`
pub fn open_graph(config: &KbConfig) -> Result<KnowledgeGraph> {
    let path = config.db_path();
    tracing::debug!("Opening {}", path.display());
    KnowledgeGraph::open(&path, config.library_config())
        .with_context(|| format!("Failed to open knowledge base at {}", path.display()))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_entry_table(entries: &[Entry]) {
    if entries.is_empty() {
        println!("(no entries)");
        return;
    }
    println!("{:<36}  {:<40}  {:<24}  {:<16}", "ID", "TITLE", "TAGS", "CREATED");
    println!("{}", "─".repeat(122));
    for e in entries {
        let tags: Vec<&str> = e.tags.iter().map(String::as_str).collect();
        println!(
            "{:<36}  {:<40}  {:<24}  {:<16}",
            e.id,
            truncate(&e.title, 40),
            truncate(&tags.join(","), 24),
            e.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

pub fn print_link_table(links: &[Link]) {
    if links.is_empty() {
        println!("(no links)");
        return;
    }
    println!(
        "{:<36}  {:<36}  {:<36}  {:<12}  {:<8}  {:<4}",
        "ID", "FROM", "TO", "TYPE", "STRENGTH", "AUTO"
    );
    println!("{}", "─".repeat(142));
    for l in links {
        println!(
            "{:<36}  {:<36}  {:<36}  {:<12}  {:<8.2}  {:<4}",
            l.id,
            l.from,
            l.to,
            l.link_type.as_str(),
            l.strength,
            if l.is_automatic { "yes" } else { "no" }
        );
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max - 1).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 6), "a lon…");
        assert_eq!(truncate("ünïcödé", 4), "ünï…");
    }

    #[test]
    fn test_parse_link_create() {
        let id_a = uuid::Uuid::now_v7().to_string();
        let id_b = uuid::Uuid::now_v7().to_string();
        let cli = Cli::try_parse_from([
            "kb", "link", "create", &id_a, &id_b, "--type", "builds_on", "--strength", "0.4",
        ])
        .unwrap();

        match cli.command {
            Commands::Link(LinkCommands::Create(args)) => {
                assert_eq!(args.link_type, LinkType::BuildsOn);
                assert_eq!(args.strength, 0.4);
                assert_eq!(args.format, OutputFormat::Table);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_link_type() {
        let id = uuid::Uuid::now_v7().to_string();
        assert!(Cli::try_parse_from(["kb", "link", "create", &id, &id, "--type", "likes"]).is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kb", "link", "stats", "--format", "json", "--data-dir", "/tmp/kb",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/kb")));
        match cli.command {
            Commands::Link(LinkCommands::Stats(args)) => assert_eq!(args.format, OutputFormat::Json),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_entry_add_repeatable_tags() {
        let cli = Cli::try_parse_from([
            "kb", "entry", "add", "Zen", "--tag", "buddhism", "--tag", "fiction", "--project",
            "reading",
        ])
        .unwrap();
        match cli.command {
            Commands::Entry(EntryCommands::Add(args)) => {
                assert_eq!(args.tags, vec!["buddhism", "fiction"]);
                assert_eq!(args.projects, vec!["reading"]);
                assert!(!args.auto_link);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

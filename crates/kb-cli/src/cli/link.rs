use crate::cli::{
    print_json, print_link_table, truncate, Direction, LinkAutoAllArgs, LinkAutoArgs,
    LinkCommands, LinkCreateArgs, LinkDeleteArgs, LinkDetectArgs, LinkListArgs, LinkRelatedArgs,
    LinkSuggestArgs, OutputFormat,
};
use anyhow::Result;
use kb_core::{Candidate, KnowledgeGraph, LinkOutcome, NewLink};
use tracing::{info, warn};

pub fn run(cmd: LinkCommands, kg: &KnowledgeGraph) -> Result<()> {
    match cmd {
        LinkCommands::Create(args) => create(args, kg),
        LinkCommands::Delete(args) => delete(args, kg),
        LinkCommands::List(args) => list(args, kg),
        LinkCommands::Detect(args) => detect(args, kg),
        LinkCommands::Suggest(args) => suggest(args, kg),
        LinkCommands::Auto(args) => auto(args, kg),
        LinkCommands::AutoAll(args) => auto_all(args, kg),
        LinkCommands::Related(args) => related(args, kg),
        LinkCommands::Stats(args) => super::stats::stats(args, kg),
        LinkCommands::Clusters(args) => super::stats::clusters(args, kg),
    }
}

fn create(args: LinkCreateArgs, kg: &KnowledgeGraph) -> Result<()> {
    let mut request = NewLink::manual(args.from, args.to, args.link_type).with_strength(args.strength);
    if let Some(context) = args.context {
        request = request.with_context(context);
    }

    let outcome = kg.create_link(request)?;
    let verb = match &outcome {
        LinkOutcome::Created(_) => "Created",
        LinkOutcome::Strengthened(_) => "Strengthened",
        LinkOutcome::Unchanged(_) => "Kept existing",
    };
    let link = outcome.into_link();

    match args.format {
        OutputFormat::Json => print_json(&link)?,
        OutputFormat::Table => {
            println!("{} link {}", verb, link.id);
            println!(
                "  {} --[{}]--> {} (strength: {:.2})",
                link.from, link.link_type, link.to, link.strength
            );
        }
    }

    Ok(())
}

fn delete(args: LinkDeleteArgs, kg: &KnowledgeGraph) -> Result<()> {
    if kg.delete_link(args.id)? {
        println!("Deleted link {}", args.id);
    } else {
        anyhow::bail!("Link {} not found", args.id);
    }
    Ok(())
}

fn list(args: LinkListArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entry = kg.require_entry(args.entry)?;

    let mut links = Vec::new();
    if matches!(args.direction, Direction::Outgoing | Direction::Both) {
        links.extend(kg.links_from(entry.id)?);
    }
    if matches!(args.direction, Direction::Incoming | Direction::Both) {
        links.extend(kg.links_to(entry.id)?);
    }

    match args.format {
        OutputFormat::Json => print_json(&links)?,
        OutputFormat::Table => print_link_table(&links),
    }
    Ok(())
}

fn detect(args: LinkDetectArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entry = kg.require_entry(args.entry)?;
    let min_strength = args
        .min_strength
        .unwrap_or(kg.config().auto_linker.min_strength);

    let candidates = kg.detect_links(&entry, min_strength)?;
    match args.format {
        OutputFormat::Json => print_json(&candidates)?,
        OutputFormat::Table => print_candidate_table(&candidates),
    }
    Ok(())
}

fn suggest(args: LinkSuggestArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entry = kg.require_entry(args.entry)?;
    let limit = args
        .limit
        .unwrap_or(kg.config().auto_linker.suggestion_limit);

    let suggestions = kg.suggest_links(&entry, limit)?;
    match args.format {
        OutputFormat::Json => print_json(&suggestions)?,
        OutputFormat::Table => print_candidate_table(&suggestions),
    }
    Ok(())
}

fn auto(args: LinkAutoArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entry = kg.require_entry(args.entry)?;
    let min_strength = args
        .min_strength
        .unwrap_or(kg.config().auto_linker.min_strength);

    let count = kg.auto_link_entry(&entry, min_strength)?;
    println!("Auto-linked {} ({} links created or strengthened)", entry.title, count);
    Ok(())
}

fn auto_all(args: LinkAutoAllArgs, kg: &KnowledgeGraph) -> Result<()> {
    let min_strength = args
        .min_strength
        .unwrap_or(kg.config().auto_linker.bulk_min_strength);

    info!("Auto-linking all entries (min strength {:.2})", min_strength);
    let report = kg.auto_link_all(min_strength)?;
    for (id, error) in &report.failures {
        warn!("Entry {} failed: {}", id, error);
    }

    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "report": report,
            "metrics": kg.linker_metrics()?,
        }))?,
        OutputFormat::Table => {
            println!(
                "Auto-linked {} relationships across {} entries",
                report.total(),
                report.entries_processed
            );
            println!("  created:      {}", report.links_created);
            println!("  strengthened: {}", report.links_strengthened);
            println!("  failed:       {}", report.failures.len());
        }
    }

    if !report.is_complete() {
        anyhow::bail!("{} entries failed to auto-link", report.failures.len());
    }
    Ok(())
}

fn related(args: LinkRelatedArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entry = kg.require_entry(args.entry)?;
    let relevance = &kg.config().relevance;
    let limit = args.limit.unwrap_or(relevance.max_results);
    let include_indirect = relevance.include_indirect && !args.direct_only;

    let related = kg.find_related_with(entry.id, limit, include_indirect)?;

    match args.format {
        OutputFormat::Json => {
            let rows: Vec<_> = related
                .iter()
                .map(|(e, score)| {
                    serde_json::json!({
                        "id": e.id,
                        "title": e.title,
                        "score": score,
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        OutputFormat::Table => {
            if related.is_empty() {
                println!("(nothing related to {})", entry.title);
                return Ok(());
            }
            println!("{:<36}  {:<40}  {:<6}", "ID", "TITLE", "SCORE");
            println!("{}", "─".repeat(86));
            for (e, score) in &related {
                println!("{:<36}  {:<40}  {:<6.3}", e.id, truncate(&e.title, 40), score);
            }
        }
    }

    Ok(())
}

fn print_candidate_table(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("(no candidates)");
        return;
    }
    println!(
        "{:<36}  {:<30}  {:<12}  {:<8}  {:<14}  {}",
        "TO", "TITLE", "TYPE", "STRENGTH", "REASON", "CONTEXT"
    );
    println!("{}", "─".repeat(140));
    for c in candidates {
        println!(
            "{:<36}  {:<30}  {:<12}  {:<8.2}  {:<14}  {}",
            c.to,
            truncate(&c.to_title, 30),
            c.link_type.as_str(),
            c.strength,
            c.reason.as_str(),
            truncate(c.context.as_deref().unwrap_or(""), 40)
        );
    }
}

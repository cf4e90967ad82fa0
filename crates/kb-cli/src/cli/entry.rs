use crate::cli::{
    print_entry_table, print_json, print_link_table, EntryAddArgs, EntryCommands, EntryIdArg,
    EntryShowArgs, FormatArgs, OutputFormat,
};
use anyhow::Result;
use kb_core::{Entry, KnowledgeGraph};
use tracing::info;

pub fn run(cmd: EntryCommands, kg: &KnowledgeGraph) -> Result<()> {
    match cmd {
        EntryCommands::Add(args) => add(args, kg),
        EntryCommands::Show(args) => show(args, kg),
        EntryCommands::List(args) => list(args, kg),
        EntryCommands::Delete(args) => delete(args, kg),
        EntryCommands::Orphans(args) => orphans(args, kg),
    }
}

fn add(args: EntryAddArgs, kg: &KnowledgeGraph) -> Result<()> {
    let content = if args.stdin {
        use std::io::Read;
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        s.trim().to_string()
    } else {
        args.content.unwrap_or_default()
    };

    let entry = Entry::new(args.title, content)
        .with_tags(args.tags)
        .with_projects(args.projects);
    kg.put_entry(&entry)?;
    info!("Stored entry {}", entry.id);

    let linked = if args.auto_link {
        let min_strength = kg.config().auto_linker.min_strength;
        Some(kg.auto_link_entry(&entry, min_strength)?)
    } else {
        None
    };

    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "entry": entry,
            "links_created": linked,
        }))?,
        OutputFormat::Table => {
            println!("Created entry {}", entry.id);
            print_entry_detail(&entry);
            if let Some(count) = linked {
                println!("  auto-linked: {} links", count);
            }
        }
    }

    Ok(())
}

fn show(args: EntryShowArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entry = kg.require_entry(args.id)?;
    let outgoing = kg.links_from(entry.id)?;
    let incoming = kg.links_to(entry.id)?;

    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "entry": entry,
            "outgoing": outgoing,
            "incoming": incoming,
        }))?,
        OutputFormat::Table => {
            print_entry_detail(&entry);
            println!();
            println!("Outgoing links:");
            print_link_table(&outgoing);
            println!();
            println!("Incoming links:");
            print_link_table(&incoming);
        }
    }

    Ok(())
}

fn list(args: FormatArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entries = kg.all_entries()?;
    match args.format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Table => print_entry_table(&entries),
    }
    Ok(())
}

fn delete(args: EntryIdArg, kg: &KnowledgeGraph) -> Result<()> {
    if kg.delete_entry(args.id)? {
        println!("Deleted entry {}", args.id);
    } else {
        anyhow::bail!("Entry {} not found", args.id);
    }
    Ok(())
}

fn orphans(args: FormatArgs, kg: &KnowledgeGraph) -> Result<()> {
    let entries = kg.orphaned_entries()?;
    match args.format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Table => print_entry_table(&entries),
    }
    Ok(())
}

fn print_entry_detail(entry: &Entry) {
    let join = |set: &std::collections::BTreeSet<String>| {
        set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    };

    println!("  id:       {}", entry.id);
    println!("  title:    {}", entry.title);
    println!("  tags:     {}", join(&entry.tags));
    println!("  projects: {}", join(&entry.projects));
    println!("  created:  {}", entry.created_at.format("%Y-%m-%d %H:%M:%S"));
    if !entry.content.is_empty() {
        println!();
        println!("{}", entry.content);
    }
}

use crate::cli::{print_json, truncate, FormatArgs, LinkClustersArgs, OutputFormat};
use anyhow::Result;
use kb_core::{GraphStats, KnowledgeGraph};
use std::collections::HashMap;

pub fn stats(args: FormatArgs, kg: &KnowledgeGraph) -> Result<()> {
    let stats = kg.graph_stats()?;
    match args.format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => print_stats(&stats),
    }
    Ok(())
}

fn print_stats(stats: &GraphStats) {
    println!();
    println!("Knowledge Graph");
    println!("{}", "─".repeat(50));
    println!("Entries:           {:>8}", stats.total_entries);
    println!("Links:             {:>8}", stats.total_links);
    println!("Entries linking:   {:>8}", stats.entries_with_links);
    println!("Orphaned:          {:>8}", stats.orphaned_entries);
    println!("Links per entry:   {:>8.2}", stats.avg_links_per_entry);

    if !stats.link_types.is_empty() {
        println!();
        println!("Link types:");
        for (link_type, count) in &stats.link_types {
            println!("  {:16} {:>8}", link_type.as_str(), count);
        }
    }

    if !stats.most_connected.is_empty() {
        println!();
        println!("Most connected:");
        for item in &stats.most_connected {
            println!("  {:40} {:>4} links", truncate(&item.title, 40), item.link_count);
        }
    }

    println!("{}", "─".repeat(50));
    println!();
}

pub fn clusters(args: LinkClustersArgs, kg: &KnowledgeGraph) -> Result<()> {
    let min_size = args.min_size.unwrap_or(kg.config().min_cluster_size);
    let clusters = kg.find_clusters(min_size)?;

    if args.format == OutputFormat::Json {
        return print_json(&clusters);
    }

    if clusters.is_empty() {
        println!("(no clusters of {} or more entries)", min_size);
        return Ok(());
    }

    let titles: HashMap<_, _> = kg
        .all_entries()?
        .into_iter()
        .map(|e| (e.id, e.title))
        .collect();

    for (i, cluster) in clusters.iter().enumerate() {
        println!("Cluster {} ({} entries)", i + 1, cluster.len());
        for id in cluster {
            let title = titles.get(id).map(String::as_str).unwrap_or("?");
            println!("  {}  {}", id, truncate(title, 60));
        }
        println!();
    }

    Ok(())
}

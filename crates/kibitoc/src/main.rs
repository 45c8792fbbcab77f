use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use similar::{ChangeTag, TextDiff};

use kibitoc_core::api::{KibelaClient, extract_note_id};
use kibitoc_core::config::load_config;
use kibitoc_core::toc::apply_toc;

#[derive(Debug, Parser)]
#[command(
    name = "kibitoc",
    version,
    about = "Generate or update a table of contents for a Kibela note"
)]
struct Cli {
    #[arg(value_name = "URL", help = "Kibela note URL")]
    url: String,
    #[arg(
        short = 'd',
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..=6),
        help = "Maximum heading depth to include (1-6)"
    )]
    depth: u8,
    #[arg(long, help = "Preview changes without updating the note")]
    dry_run: bool,
    #[arg(long, value_name = "PATH", help = "Config file (default: kibitoc.toml)")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = load_config(&config_path)?;
    let endpoint = config.resolve()?;
    let client = KibelaClient::new(&endpoint)?;

    let note_id = extract_note_id(&cli.url)?;
    println!("note_id: {note_id}");
    println!("depth: {}", cli.depth);
    println!("dry_run: {}", cli.dry_run);

    let note = client.fetch_note(&note_id)?;
    println!("note.title: {}", note.title);
    println!("note.content_bytes: {}", note.content.len());
    if let Some(updated_at) = &note.updated_at {
        println!("note.updated_at: {updated_at}");
    }

    let outcome = apply_toc(&note.content, cli.depth);
    println!("headings_found: {}", outcome.headings_found());
    for heading in &outcome.headings {
        let indent = "  ".repeat(usize::from(heading.level - 1));
        println!("{indent}h{}: {}", heading.level, heading.text);
    }

    if outcome.headings.is_empty() {
        println!("no headings found; nothing to do");
        return Ok(());
    }
    if outcome.new_content == note.content {
        println!("table of contents already up to date");
        return Ok(());
    }

    if cli.dry_run {
        println!("dry run; the note was not updated");
        print_diff(&note.content, &outcome.new_content);
        return Ok(());
    }

    client.update_note_content(&note, &outcome.new_content)?;
    println!("note updated");
    Ok(())
}

fn resolve_config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(value) = env::var("KIBITOC_CONFIG") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from("kibitoc.toml")
}

fn print_diff(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        print!("{sign}{}", change.value());
        if change.missing_newline() {
            println!();
        }
    }
}

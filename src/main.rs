//! marginalia - inspect EPUB books the way the reader core sees them

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use marginalia::{Book, BookState, ReaderConfig};

#[derive(Parser)]
#[command(name = "marginalia")]
#[command(version, about = "Inspect an EPUB's metadata and chapter model", long_about = None)]
#[command(after_help = "EXAMPLES:
    marginalia book.epub                      Show metadata and chapters
    marginalia book.epub --json               Emit chapters as JSON
    marginalia book.epub --chapter chapter-2  Print one chapter's markup")]
struct Cli {
    /// Input file (EPUB)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Emit metadata and chapters as JSON
    #[arg(long)]
    json: bool,

    /// Print the raw markup of one chapter
    #[arg(long, value_name = "ID")]
    chapter: Option<String>,

    /// Reader configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = ReaderConfig::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let bytes = std::fs::read(&cli.input).map_err(|e| format!("{}: {e}", cli.input.display()))?;
    let book = Book::open_with(&bytes, &config).map_err(|e| e.user_message())?;

    if let Some(id) = &cli.chapter {
        let content = book
            .chapter_content(id)
            .ok_or_else(|| format!("no chapter with id {id:?}"))?;
        println!("{content}");
        return Ok(());
    }

    if cli.json {
        let value = serde_json::json!({
            "metadata": book.metadata,
            "tocSource": book.toc_source(),
            "chapters": book.chapters(),
        });
        let out = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    show_info(cli, &book);
    Ok(())
}

fn show_info(cli: &Cli, book: &Book) {
    let meta = &book.metadata;
    println!("File: {}", cli.input.display());
    let fields = [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Language", &meta.language),
        ("Publisher", &meta.publisher),
        ("Identifier", &meta.identifier),
        ("Date", &meta.date),
        ("Cover", &meta.cover_image),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    if let Some(desc) = &meta.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }

    if book.state() == BookState::NoChapters {
        println!("No chapters found.");
        return;
    }

    println!("Chapters ({:?}): {}", book.toc_source(), book.chapters().len());
    for chapter in book.chapters() {
        println!(
            "{}{}  [{}] {}",
            "  ".repeat(chapter.depth + 1),
            chapter.title,
            chapter.id,
            chapter.href
        );
    }
}

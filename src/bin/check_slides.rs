//! List carousel slides from the hosted database and flag broken image paths.

use std::{io, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use scout_data::{
    service::{KEY_ENV, PostgrestConfig, PostgrestService, URL_ENV},
    slides::{self, CarouselSlide, DUPLICATED_SEGMENT, SLIDES_TABLE, SlideSummary},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "check-slides")]
#[command(about = "List carousel slides and warn about duplicated storage paths")]
#[command(version)]
struct Args {
    /// Project URL of the hosted database
    #[arg(long, env = URL_ENV)]
    url: String,

    /// Anon API key
    #[arg(long, env = KEY_ENV, hide_env_values = true)]
    key: String,

    /// Table holding the slides
    #[arg(long, default_value = SLIDES_TABLE)]
    table: String,

    /// Maximum number of rows to fetch
    #[arg(long)]
    limit: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_slide(slide: &CarouselSlide) {
    println!("ID: {}", slide.display_id());
    println!("  Title: {}", slide.title.as_deref().unwrap_or("(untitled)"));
    println!("  Image URL: {}", slide.image_url.as_deref().unwrap_or("(none)"));
    if slide.has_duplicated_segment() {
        println!("  ⚠️  WARNING: image URL contains duplicated path '{DUPLICATED_SEGMENT}'");
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = PostgrestConfig::new(&args.url, &args.key)
        .with_timeout(Duration::from_secs(args.timeout));
    let service = PostgrestService::new(config).context("Failed to build HTTP client")?;

    info!(table = %args.table, limit = ?args.limit, "Fetching carousel slides");
    let slides = slides::fetch_slides(&service, &args.table, args.limit)
        .await
        .with_context(|| format!("Failed to read table '{}'", args.table))?;

    if slides.is_empty() {
        println!("No slides found in '{}'.", args.table);
        return Ok(());
    }

    for slide in &slides {
        print_slide(slide);
    }

    let summary = SlideSummary::of(&slides);
    println!(
        "{} slides, {} with duplicated paths, {} without an image",
        summary.total, summary.duplicated, summary.missing_image
    );
    Ok(())
}

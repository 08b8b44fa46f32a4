use std::{env, path::PathBuf, process};

use anyhow::Context as _;
use clap::Parser;
use gitbook_pandoc::{workspace, Converter, Workspace};

const LOG_ENV: &str = "GITBOOK_PANDOC_LOG";

/// Converts a GitBook-style book into a single EPUB or PDF using pandoc.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Book directory containing the SUMMARY.md manifest
    #[arg(required_unless_present = "check")]
    book_dir: Option<PathBuf>,

    /// Output document, format chosen by extension [default: <BOOK_DIR name>.epub]
    output: Option<PathBuf>,

    /// Metadata file [default: <BOOK_DIR>/metadata.yaml]
    #[arg(short, long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    /// Stylesheet, overriding the one declared in the metadata
    #[arg(short, long, value_name = "FILE")]
    style: Option<PathBuf>,

    /// Also write the combined Markdown document to FILE
    #[arg(long, value_name = "FILE")]
    markdown: Option<PathBuf>,

    /// Only check that a compatible pandoc is installed
    #[arg(long)]
    check: bool,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    if cli.check {
        let version = gitbook_pandoc::check_pandoc(cli.book_dir.as_deref())?;
        println!("pandoc {version}");
        return Ok(());
    }

    let Some(book_dir) = cli.book_dir else {
        anyhow::bail!("No book directory given");
    };
    let mut converter = Converter::new(book_dir);
    if let Some(output) = cli.output {
        converter = converter.output(output);
    }
    if let Some(metadata) = cli.metadata {
        converter = converter.metadata(metadata);
    }
    if let Some(style) = cli.style {
        converter = converter.style(style);
    }
    if let Some(markdown) = cli.markdown {
        converter = converter.markdown(markdown);
    }

    let mut workspace = Workspace::new()?;
    let path = workspace.path().to_path_buf();
    ctrlc::set_handler(move || {
        log::warn!("Interrupted, removing {}", path.display());
        if let Err(err) = workspace::remove(&path) {
            eprintln!("Unable to remove {}: {err}", path.display());
        }
        process::exit(130);
    })
    .context("Unable to install interrupt handler")?;

    let res = converter.convert(&workspace);
    workspace.cleanup();
    res.map(|_| ())
}

fn init_logger() {
    // Don't show the target by default, since it generally isn't useful
    // unless you are overriding the level.
    let with_target = env::var_os(LOG_ENV).is_some();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_env(env_logger::Env::new().filter(LOG_ENV))
        .format_timestamp(None)
        .format_target(with_target)
        .init();
}

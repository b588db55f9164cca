//! 命令行主程序入口
//!
//! 三个子命令对应库的三项能力：`snapshot` 生成自包含离线文档，
//! `extract` 输出结构化文案 JSON，`rewrite` 把文案变更应用到文档。

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use pagesnap::core::{create_offline_document, SnapshotOptions};
use pagesnap::extract;
use pagesnap::network::session::Session;
use pagesnap::rewrite::{self, ContentChange};

#[derive(Parser, Debug)]
#[command(name = "pagesnap", version)]
#[command(about = "Save web pages as self-contained offline HTML and apply copy edits")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a page and write a self-contained offline HTML document
    Snapshot {
        /// Page URL (http, https or data)
        url: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip embedding images
        #[arg(long)]
        no_images: bool,

        /// Skip embedding fonts
        #[arg(long)]
        no_fonts: bool,

        /// Keep scripts instead of removing them
        #[arg(long)]
        keep_scripts: bool,

        /// Omit the source comment at the top of the document
        #[arg(long)]
        no_metadata: bool,

        /// Custom User-Agent header
        #[arg(short, long)]
        user_agent: Option<String>,
    },

    /// Fetch a page and print its structured copy as JSON
    Extract {
        /// Page URL (http, https or data)
        url: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply copy changes to an HTML document
    Rewrite {
        /// HTML document file
        input: PathBuf,

        /// JSON file with a list of {element_id, original_text, modified_text}
        #[arg(short, long)]
        changes: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Snapshot {
            url,
            output,
            no_images,
            no_fonts,
            keep_scripts,
            no_metadata,
            user_agent,
        } => {
            let mut options = SnapshotOptions::default();
            options.no_images = no_images;
            options.no_fonts = no_fonts;
            options.keep_scripts = keep_scripts;
            options.no_metadata = no_metadata;
            if let Some(user_agent) = user_agent {
                options.user_agent = Some(user_agent);
            }
            run_snapshot(&url, options, output)
        }
        Command::Extract { url, output } => run_extract(&url, output),
        Command::Rewrite {
            input,
            changes,
            output,
        } => run_rewrite(&input, &changes, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_snapshot(
    url: &str,
    options: SnapshotOptions,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let mut session = Session::new(options).map_err(|e| e.to_string())?;
    let (html, _title) = create_offline_document(&mut session, url).map_err(|e| e.to_string())?;
    write_output(output, html.as_bytes())
}

fn run_extract(url: &str, output: Option<PathBuf>) -> Result<(), String> {
    let mut session = Session::new(SnapshotOptions::default()).map_err(|e| e.to_string())?;
    let (html, _title) = create_offline_document(&mut session, url).map_err(|e| e.to_string())?;

    let content = extract::extract(&html);
    let json = serde_json::to_string_pretty(&content).map_err(|e| e.to_string())?;
    write_output(output, json.as_bytes())
}

fn run_rewrite(
    input: &PathBuf,
    changes_file: &PathBuf,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let html = fs::read_to_string(input)
        .map_err(|e| format!("cannot read {}: {}", input.display(), e))?;
    let changes_json = fs::read_to_string(changes_file)
        .map_err(|e| format!("cannot read {}: {}", changes_file.display(), e))?;
    let changes: Vec<ContentChange> =
        serde_json::from_str(&changes_json).map_err(|e| format!("invalid changes file: {}", e))?;

    let result = rewrite::apply_changes(&html, &changes);

    eprintln!("Applied {} of {} changes", result.applied_count, changes.len());
    for original in &result.unmatched_originals {
        eprintln!("Unmatched: {}", original);
    }

    write_output(output, result.html.as_bytes())
}

fn write_output(output: Option<PathBuf>, data: &[u8]) -> Result<(), String> {
    match output {
        Some(path) => fs::write(&path, data)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e)),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(data)
                .and_then(|_| handle.write_all(b"\n"))
                .map_err(|e| e.to_string())
        }
    }
}

//! Classroom Slides CLI tool
//!
//! Collects PDF attachments of a classroom course and merges them into one file.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use classroom_slides::api::Session;
use classroom_slides::auth::Authenticator;
use classroom_slides::classroom::{list_courses, ClassroomClient};
use classroom_slides::config::{
    CopyNaming, PipelineConfig, TitleFilter, DEFAULT_CLIENT_SECRETS_PATH, DEFAULT_COURSE_NAME,
    DEFAULT_COURSE_PAGE_SIZE, DEFAULT_FILE_TYPE_KEYWORD, DEFAULT_FOLDER_NAME, DEFAULT_OUTPUT_NAME,
    DEFAULT_TOPIC_KEYWORD, DEFAULT_TOKEN_PATH,
};
use classroom_slides::drive::DriveClient;
use classroom_slides::pdf::{count_pages, merge_pdfs, MergeOptions};
use classroom_slides::pipeline;

/// Classroom Slides - Gather course PDFs and merge them into one handout
#[derive(Parser)]
#[command(name = "classroom-slides")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Collect and merge with the built-in course and filters
    classroom-slides run

    # Another course and topic, keeping original titles for the copies
    classroom-slides run --course \"Biology 2024\" --topic Cells --keep-titles

    # Show the courses visible to the authorized account
    classroom-slides courses

    # Merge local PDFs in order
    classroom-slides merge -o handout.pdf \"[0-9]*.pdf\"")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AuthArgs {
    /// Cached authorization token
    #[arg(long, default_value = DEFAULT_TOKEN_PATH)]
    token: PathBuf,

    /// OAuth client secrets (read on first authorization only)
    #[arg(long, default_value = DEFAULT_CLIENT_SECRETS_PATH)]
    client_secrets: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy matching course PDFs to a storage folder, download and merge them
    Run {
        /// Course display name
        #[arg(long, default_value = DEFAULT_COURSE_NAME)]
        course: String,

        /// Substring every selected title must contain (case-sensitive)
        #[arg(long, default_value = DEFAULT_TOPIC_KEYWORD)]
        topic: String,

        /// File-type substring every selected title must contain (case-sensitive)
        #[arg(long, default_value = DEFAULT_FILE_TYPE_KEYWORD)]
        file_type: String,

        /// Storage folder to create for the copies
        #[arg(long, default_value = DEFAULT_FOLDER_NAME)]
        folder: String,

        /// Merged output file name
        #[arg(short, long, default_value = DEFAULT_OUTPUT_NAME)]
        output: PathBuf,

        /// Directory for downloaded copies and the merged file
        #[arg(long, default_value = ".")]
        download_dir: PathBuf,

        /// Number of courses requested from the listing
        #[arg(long, default_value_t = DEFAULT_COURSE_PAGE_SIZE)]
        page_size: u32,

        /// Title copies with the source title instead of the source file ID
        #[arg(long)]
        keep_titles: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// List the courses visible to the authorized account
    Courses {
        /// Number of courses requested from the listing
        #[arg(long, default_value_t = DEFAULT_COURSE_PAGE_SIZE)]
        page_size: u32,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Merge local PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the page count of a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("classroom_slides=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            course, topic, file_type, folder, output, download_dir, page_size, keep_titles, auth,
        } => {
            let config = PipelineConfig {
                course_name: course,
                filter: TitleFilter::new(topic, file_type),
                folder_name: folder,
                output_name: output,
                course_page_size: page_size,
                download_dir,
                copy_naming: if keep_titles { CopyNaming::SourceTitle } else { CopyNaming::SourceId },
                token_path: auth.token,
                client_secrets_path: auth.client_secrets,
            };
            cmd_run(&config)
        }
        Commands::Courses { page_size, auth } => cmd_courses(page_size, auth),
        Commands::Merge { inputs, output } => cmd_merge(inputs, output),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Authorize and build a session for the API clients
fn open_session(token: PathBuf, client_secrets: PathBuf) -> anyhow::Result<Session> {
    let http = reqwest::blocking::Client::new();
    let credential = Authenticator::new(http.clone(), token, client_secrets)
        .get_credential()
        .context("authorization failed")?;
    Ok(Session::from_credential(http, &credential))
}

/// Run the full collect-and-merge pipeline
fn cmd_run(config: &PipelineConfig) -> anyhow::Result<()> {
    let session = open_session(config.token_path.clone(), config.client_secrets_path.clone())?;
    let classroom = ClassroomClient::new(session.clone());
    let drive = DriveClient::new(session);

    let report = pipeline::run(&classroom, &drive, config)?;

    eprintln!(
        "Merged {} of {} selected files ({} pages)",
        report.downloaded.len(),
        report.selected.len(),
        report.page_count
    );
    println!("Merged PDF saved as {}.", report.output_path.display());
    Ok(())
}

/// Print the course listing
fn cmd_courses(page_size: u32, auth: AuthArgs) -> anyhow::Result<()> {
    let session = open_session(auth.token, auth.client_secrets)?;
    if list_courses(&ClassroomClient::new(session), page_size).is_none() {
        bail!("course listing failed");
    }
    Ok(())
}

/// Expand glob patterns in input paths
///
/// Matches of one pattern are sorted; the order of the arguments is kept.
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched: Vec<PathBuf> = Vec::new();
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            matched.sort();
            paths.extend(matched);
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf) -> anyhow::Result<()> {
    let inputs = expand_globs(inputs)?;

    eprintln!("Merging {} PDF files...", inputs.len());

    let pages = merge_pdfs(&MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
    })?;

    eprintln!("Merged {} pages to: {}", pages, output.display());
    Ok(())
}

/// Show the page count of a PDF
fn cmd_info(input: PathBuf) -> anyhow::Result<()> {
    let pages = count_pages(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", pages);
    Ok(())
}

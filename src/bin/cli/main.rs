mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use md2nsx::{AttachmentScope, ConvertOptions, Converter};

#[derive(Parser)]
#[command(
    name = "md2nsx",
    about = "Convert a folder of Markdown files into a Synology Note Station archive",
    version
)]
struct Cli {
    /// Folder containing the Markdown files
    markdown_folder: PathBuf,

    /// Name of the notebook to create (default: "Imported Notebook")
    #[arg(short, long)]
    notebook: Option<String>,

    /// Archive to write (default: <MARKDOWN_FOLDER>.nsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with conversion settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give each note only its own attachments
    #[arg(long)]
    isolate_attachments: bool,

    /// Output format
    #[arg(long, default_value = "plain")]
    format: OutputFormat,

    /// Log debug details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

impl Cli {
    /// Settings file first, then command-line flags on top
    fn options(&self) -> anyhow::Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => ConvertOptions::default(),
        };

        if let Some(notebook) = &self.notebook {
            options.notebook_name = notebook.clone();
        }
        if let Some(output) = &self.output {
            options.output = Some(output.clone());
        }
        if self.isolate_attachments {
            options.attachment_scope = AttachmentScope::Document;
        }

        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let options = cli.options()?;
    let notebook_name = options.notebook_name.clone();

    let summary = Converter::new(options)
        .batch_convert(&cli.markdown_folder, &notebook_name)
        .with_context(|| format!("Failed to convert {}", cli.markdown_folder.display()))?;

    report::print_summary(&summary, &cli.format)?;
    Ok(())
}

use anyhow::Result;
use md2nsx::{DocumentOutcome, RunSummary};

use crate::OutputFormat;

pub fn print_summary(summary: &RunSummary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Plain => {
            for document in &summary.documents {
                match document {
                    DocumentOutcome::Converted {
                        source,
                        skipped_references,
                        ..
                    } => {
                        for skipped in skipped_references {
                            println!(
                                "  {}: kept {} '{}' ({})",
                                source.display(),
                                skipped.kind.as_str(),
                                skipped.link,
                                skipped.reason
                            );
                        }
                    }
                    DocumentOutcome::Skipped { source, reason } => {
                        println!("  Skipped {}: {}", source.display(), reason);
                    }
                }
            }

            for member in &summary.package.skipped {
                println!("  Left out {}: {}", member.name, member.reason);
            }

            println!(
                "Successfully converted {} files to {}",
                summary.package.notes.len(),
                summary.archive_path().display()
            );
        }
    }

    Ok(())
}

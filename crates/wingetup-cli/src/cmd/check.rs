//! Check command

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table, presets};
use wingetup_core::check::{CheckOutcome, write_github_output};
use wingetup_core::config::{load_checkver, walk_checkver_files};
use wingetup_core::{CheckContext, check_package};

/// Check one package; report the version info JSON and step outputs.
pub async fn check(
    checkver: &Path,
    output: Option<&Path>,
    github_output: Option<&Path>,
    token: Option<String>,
) -> Result<()> {
    let config = load_checkver(checkver)?;
    let ctx = CheckContext::new(token)?;
    let id = config.id()?.clone();

    let outcome = check_package(&ctx, &config).await?;
    match &outcome {
        CheckOutcome::NotFound => println!("  {id}: no version found"),
        CheckOutcome::UpToDate { published } => println!("  {id}: up to date ({published})"),
        CheckOutcome::Available { published, info } => println!(
            "  {id}: {} -> {}",
            published.as_deref().unwrap_or("none"),
            info.version
        ),
    }

    let info = outcome.into_update();
    if let Some(info) = &info {
        let json = serde_json::to_string_pretty(info)?;
        match output {
            Some(path) => {
                std::fs::write(path, format!("{json}\n"))
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("  wrote {}", path.display());
            }
            None => println!("{json}"),
        }
    }

    if let Some(path) = github_output {
        write_github_output(path, info.as_ref())?;
    }
    Ok(())
}

enum Status {
    Available(String),
    UpToDate,
    NotFound,
    Failed(String),
}

struct Row {
    package: String,
    published: String,
    status: Status,
}

/// Check every package below `dir` and print a summary table.
pub async fn check_all(dir: &Path, token: Option<String>) -> Result<()> {
    let files = walk_checkver_files(dir)?;
    if files.is_empty() {
        println!("  no checkver files in {}", dir.display());
        return Ok(());
    }

    let ctx = CheckContext::new(token)?;
    let mut rows = Vec::with_capacity(files.len());

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let config = match load_checkver(path) {
            Ok(c) => c,
            Err(e) => {
                rows.push(Row {
                    package: name,
                    published: String::new(),
                    status: Status::Failed(e.to_string()),
                });
                continue;
            }
        };
        let package = config.id().map_or(name, ToString::to_string);

        let row = match check_package(&ctx, &config).await {
            Ok(CheckOutcome::NotFound) => Row {
                package,
                published: String::new(),
                status: Status::NotFound,
            },
            Ok(CheckOutcome::UpToDate { published }) => Row {
                package,
                published,
                status: Status::UpToDate,
            },
            Ok(CheckOutcome::Available { published, info }) => Row {
                package,
                published: published.unwrap_or_default(),
                status: Status::Available(info.version),
            },
            Err(e) => Row {
                package,
                published: String::new(),
                status: Status::Failed(e.to_string()),
            },
        };
        rows.push(row);
    }

    print_summary(&rows);
    Ok(())
}

fn print_summary(rows: &[Row]) {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Package", "Published", "Latest", "Status"]);

    let (mut available, mut failed) = (0, 0);
    for row in rows {
        let (latest, status) = match &row.status {
            Status::Available(v) => {
                available += 1;
                (v.as_str(), "update available".to_string())
            }
            Status::UpToDate => (row.published.as_str(), "up to date".to_string()),
            Status::NotFound => ("", "no version found".to_string()),
            Status::Failed(e) => {
                failed += 1;
                ("", format!("error: {e}"))
            }
        };
        table.add_row(vec![row.package.as_str(), row.published.as_str(), latest, status.as_str()]);
    }

    println!("{table}");
    println!();
    println!("  {available} updates available, {failed} failed");
}

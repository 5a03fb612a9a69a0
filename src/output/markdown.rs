//! Markdown summary generation
//!
//! Writes a human-readable report of a finished crawl.

use crate::output::CrawlSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary to `output_path`
pub fn write_markdown_summary(
    summary: &CrawlSummary,
    seed: &str,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_summary(summary, seed);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary, seed: &str) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", seed));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n\n",
        summary.elapsed.as_secs_f64()
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Pages Completed**: {}\n",
        summary.pages_completed
    ));
    md.push_str(&format!("- **Pages Failed**: {}\n", summary.pages_failed));
    md.push_str(&format!(
        "- **URLs Discovered**: {}\n",
        summary.urls_discovered
    ));
    md.push_str(&format!(
        "- **Left in Frontier**: {}\n",
        summary.frontier_remaining
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !summary.status_codes.is_empty() {
        md.push_str("## HTTP Status Codes\n\n");
        md.push_str("| Status | Count |\n");
        md.push_str("|--------|-------|\n");
        for (code, count) in &summary.status_codes {
            md.push_str(&format!("| {} | {} |\n", code, count));
        }
        md.push('\n');
    }

    md
}

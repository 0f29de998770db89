//! Markdown summary generation
//!
//! Renders a [`ForumSummary`] as a human-readable report: database totals,
//! then one section per subforum with a table of its threads.

use crate::output::summary::{ForumSummary, OutputResult, SubforumSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the Markdown report for `summary` to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &ForumSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a forum summary as markdown
pub fn format_markdown_summary(summary: &ForumSummary) -> String {
    let mut md = String::new();

    md.push_str("# Forum Scrape Summary\n\n");
    md.push_str(&format!("Generated: {}\n\n", summary.generated_at));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Subforums**: {}\n", summary.totals.subforums));
    md.push_str(&format!("- **Threads**: {}\n", summary.totals.threads));
    md.push_str(&format!("- **Posts**: {}\n", summary.totals.posts));
    md.push_str(&format!("- **Users**: {}\n", summary.totals.users));
    md.push_str(&format!("- **Files**: {}\n", summary.totals.files));
    md.push_str(&format!(
        "- **Posts per Thread**: {:.2}\n\n",
        summary.posts_per_thread()
    ));

    if summary.subforums.is_empty() {
        md.push_str("No subforums have been scraped yet.\n");
        return md;
    }

    md.push_str("## Subforums\n\n");
    md.push_str("| Subforum | Threads | Posts | Users |\n");
    md.push_str("|----------|---------|-------|-------|\n");
    for subforum in &summary.subforums {
        md.push_str(&format!(
            "| [{}]({}) | {} | {} | {} |\n",
            escape_cell(&subforum.title),
            subforum.url,
            subforum.threads,
            subforum.posts,
            subforum.users
        ));
    }
    md.push('\n');

    for subforum in &summary.subforums {
        push_subforum_section(&mut md, subforum);
    }

    md
}

fn push_subforum_section(md: &mut String, subforum: &SubforumSummary) {
    md.push_str(&format!("### {}\n\n", subforum.title));

    if subforum.thread_details.is_empty() {
        md.push_str("No threads.\n\n");
        return;
    }

    md.push_str("| Thread | Creator | Created | Posts | Users |\n");
    md.push_str("|--------|---------|---------|-------|-------|\n");
    for thread in &subforum.thread_details {
        md.push_str(&format!(
            "| [{}]({}) | {} | {} | {} | {} |\n",
            escape_cell(&thread.title),
            thread.url,
            escape_cell(&thread.creator),
            escape_cell(&thread.created_at),
            thread.posts,
            thread.users
        ));
    }
    md.push('\n');
}

/// Keeps scraped text from breaking the table layout
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

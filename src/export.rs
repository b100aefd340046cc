//! Render an assembled draft as a Markdown report.
//!
//! The report opens with an `SR&ED Draft` title, has one heading per
//! section in draft order, and ends with an `Evidence Appendix` listing
//! every citation as `path:start-end: text`.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::draft::{generate_draft, Draft};

/// File name suggested for downloaded reports.
pub const REPORT_FILE_NAME: &str = "sred_draft.md";

/// Render `draft` as a Markdown document.
pub fn render_report(draft: &Draft) -> String {
    let mut out = String::from("# SR&ED Draft\n");

    for section in &draft.sections {
        let _ = write!(out, "\n## {}\n\n{}\n", section.section, section.text.trim_end());
    }

    out.push_str("\n## Evidence Appendix\n\n");
    if draft.citations.is_empty() {
        out.push_str("No citations.\n");
    }
    for c in &draft.citations {
        let _ = writeln!(
            out,
            "- {}:{}-{}: {}",
            c.source_path,
            c.char_start,
            c.char_end,
            c.text.trim()
        );
    }
    out
}

/// Write the report for the configured draft.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let draft = generate_draft(config).await?;
    let report = render_report(&draft);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &report)?;
            eprintln!(
                "Exported {} sections, {} citations to {}",
                draft.sections.len(),
                draft.citations.len(),
                path.display()
            );
        }
        None => {
            print!("{}", report);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::Section;
    use crate::models::Citation;

    #[test]
    fn test_report_layout() {
        let draft = Draft {
            sections: vec![
                Section {
                    section: "Advancement".to_string(),
                    text: "We built a thing.\n".to_string(),
                },
                Section {
                    section: "Uncertainty".to_string(),
                    text: "It failed.".to_string(),
                },
            ],
            citations: vec![Citation {
                chunk_id: 4,
                source_path: "notes/run.md".to_string(),
                char_start: 850,
                char_end: 1850,
                text: "  the run failed  ".to_string(),
            }],
        };

        let report = render_report(&draft);
        assert!(report.starts_with("# SR&ED Draft\n"));
        let adv = report.find("## Advancement").unwrap();
        let unc = report.find("## Uncertainty").unwrap();
        let app = report.find("## Evidence Appendix").unwrap();
        assert!(adv < unc && unc < app);
        assert!(report.contains("- notes/run.md:850-1850: the run failed\n"));
    }

    #[test]
    fn test_empty_draft_still_has_appendix() {
        let draft = Draft {
            sections: Vec::new(),
            citations: Vec::new(),
        };
        let report = render_report(&draft);
        assert!(report.contains("## Evidence Appendix"));
        assert!(report.contains("No citations."));
    }
}

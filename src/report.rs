use crate::{
    config::Config,
    edits::{EditAnalysis, EditSample},
    postprocess,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub target_user: String,
    pub export_file: String,
    pub generated_at: String,
    pub total: usize,
    pub direct_edits: usize,
    pub no_edits: usize,
    pub perfect_precaptions: usize,
    pub direct_edit_pct: f64,
    pub no_edit_pct: f64,
    pub perfect_precaption_pct: f64,
}

impl AuditSummary {
    pub fn new(
        cfg: &Config,
        analysis: &EditAnalysis,
        export_file: &str,
        generated_at: &str,
    ) -> Self {
        let total = analysis.total();
        let pct = |n: usize| {
            if total > 0 {
                n as f64 / total as f64 * 100.0
            } else {
                0.0
            }
        };
        Self {
            target_user: cfg.detection.target_user.clone(),
            export_file: export_file.to_string(),
            generated_at: generated_at.to_string(),
            total,
            direct_edits: analysis.direct_edits.len(),
            no_edits: analysis.no_edits.len(),
            perfect_precaptions: analysis.perfect_precaptions.len(),
            direct_edit_pct: pct(analysis.direct_edits.len()),
            no_edit_pct: pct(analysis.no_edits.len()),
            perfect_precaption_pct: pct(analysis.perfect_precaptions.len()),
        }
    }
}

/// Render the full markdown audit report. Direct-edit samples must already
/// carry their diff and change summary.
pub fn render_markdown(
    cfg: &Config,
    summary: &AuditSummary,
    direct_edits: &[EditSample],
) -> Result<String> {
    let user = &summary.target_user;
    let mut md = String::new();

    writeln!(md, "# Direct Caption Edit Detection Report\n")?;
    writeln!(md, "## Overview\n")?;
    writeln!(
        md,
        "This report identifies cases where **{user}** manually edited the generated caption\n\
         instead of using the feedback refinement workflow (re-polish feedback + re-generate caption).\n"
    )?;
    writeln!(md, "## Dataset Information\n")?;
    writeln!(md, "- **Source Export File**: `{}`", summary.export_file)?;
    writeln!(md, "- **Target User**: {user}")?;
    writeln!(md, "- **Analysis Timestamp**: {}\n", summary.generated_at)?;
    writeln!(md, "## Detection Criteria\n")?;
    writeln!(md, "A caption is flagged as \"Direct Edit\" if:\n")?;
    writeln!(
        md,
        "1. `initial_caption_rating_score` != {} (went through the feedback workflow)",
        cfg.detection.perfect_rating
    )?;
    writeln!(md, "2. `gpt_caption` exists (a caption was generated)")?;
    writeln!(
        md,
        "3. `final_caption` != `gpt_caption` (the user modified the generated output)\n"
    )?;
    writeln!(md, "## Summary Statistics\n")?;
    writeln!(md, "| Category | Count | Percentage |")?;
    writeln!(md, "|----------|-------|------------|")?;
    writeln!(
        md,
        "| **Direct Edits** (final != gpt) | {} | {:.1}% |",
        summary.direct_edits, summary.direct_edit_pct
    )?;
    writeln!(
        md,
        "| No Edits (final == gpt) | {} | {:.1}% |",
        summary.no_edits, summary.no_edit_pct
    )?;
    writeln!(
        md,
        "| Perfect Pre-caption (rating={}) | {} | {:.1}% |",
        cfg.detection.perfect_rating, summary.perfect_precaptions, summary.perfect_precaption_pct
    )?;
    writeln!(md, "| **Total by {user}** | {} | 100.0% |\n", summary.total)?;

    if direct_edits.is_empty() {
        writeln!(md, "## Results\n")?;
        writeln!(md, "No direct edit cases found for this user.\n")?;
    } else {
        writeln!(
            md,
            "## Direct Edit Cases ({} total)\n",
            direct_edits.len()
        )?;
        writeln!(
            md,
            "These are cases where the user manually edited the generated caption.\n\
             Sorted by timestamp (latest first).\n"
        )?;
        for (i, sample) in direct_edits.iter().enumerate() {
            write_case(&mut md, sample, i + 1, direct_edits.len())?;
        }
    }

    Ok(postprocess::finalize_report_text(cfg, md))
}

fn write_case(md: &mut String, sample: &EditSample, case: usize, total: usize) -> Result<()> {
    writeln!(md, "### Case {case}/{total}\n")?;
    writeln!(md, "| Field | Value |")?;
    writeln!(md, "|-------|-------|")?;
    writeln!(md, "| Video ID | `{}` |", sample.video_id)?;
    writeln!(md, "| Batch File | `{}` |", sample.batch_file)?;
    writeln!(md, "| Batch Index | {} |", sample.batch_index)?;
    writeln!(md, "| Caption Type | {} |", sample.caption_type)?;
    writeln!(md, "| Status | {} |", sample.status)?;
    writeln!(
        md,
        "| Rating Score | {} |",
        sample
            .initial_caption_rating_score
            .map_or_else(|| "None".to_string(), |r| r.to_string())
    )?;
    writeln!(md, "| Timestamp | {} |\n", sample.timestamp)?;

    writeln!(md, "**Pre-Caption:**\n")?;
    writeln!(md, "> {}\n", sample.pre_caption)?;
    writeln!(md, "**Initial Feedback:**\n")?;
    writeln!(md, "> {}\n", quoted_or_empty(&sample.initial_feedback))?;
    writeln!(md, "**Final Feedback:**\n")?;
    writeln!(md, "> {}\n", quoted_or_empty(&sample.final_feedback))?;
    writeln!(md, "**GPT Caption (before edit):**\n")?;
    writeln!(md, "> {}\n", sample.gpt_caption)?;
    writeln!(md, "**Final Caption (after manual edit):**\n")?;
    writeln!(md, "> {}\n", sample.final_caption)?;
    writeln!(md, "**Diff:**\n")?;
    writeln!(md, "```diff")?;
    writeln!(md, "{}", sample.diff.as_deref().unwrap_or_default())?;
    writeln!(md, "```\n")?;
    writeln!(
        md,
        "**Change Summary:** {}\n",
        sample.change_summary.as_deref().unwrap_or_default()
    )?;
    writeln!(md, "---\n")?;
    Ok(())
}

fn quoted_or_empty(text: &str) -> &str {
    if text.is_empty() { "(empty)" } else { text }
}

/// One JSON object per line, newline-terminated.
pub fn render_jsonl(samples: &[EditSample]) -> Result<String> {
    let mut out = String::new();
    for sample in samples {
        out.push_str(&serde_json::to_string(sample)?);
        out.push('\n');
    }
    Ok(out)
}

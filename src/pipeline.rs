use crate::{
    batch::BatchIndex,
    config::Config,
    diff,
    edits::{self, EditAnalysis},
    export::CaptionExport,
    report::{self, AuditSummary},
    util::now_rfc3339,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct AuditPipeline {
    cfg: Config,
}

pub struct AuditOutput {
    pub report_markdown: String,
    pub samples_jsonl: String,
    pub summary: AuditSummary,
}

impl AuditPipeline {
    pub fn new(cfg: &Config) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn run_job(&self, export_path: &Path, batch_files: &[PathBuf]) -> Result<AuditOutput> {
        let videos = CaptionExport::load(export_path)?.into_videos();
        info!("loaded {} video records from {}", videos.len(), export_path.display());

        let batch_paths = self.resolve_batch_files(batch_files);
        let batches = BatchIndex::from_files(&batch_paths)?;

        let mut analysis = edits::analyze(&self.cfg, &videos, &batches);
        info!(
            "captions by {}: total={} direct={} no_edit={} perfect={}",
            self.cfg.detection.target_user,
            analysis.total(),
            analysis.direct_edits.len(),
            analysis.no_edits.len(),
            analysis.perfect_precaptions.len()
        );

        self.enrich_direct_edits(&mut analysis)?;

        if self.cfg.detection.sort_latest_first {
            analysis
                .direct_edits
                .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }

        let summary = AuditSummary::new(
            &self.cfg,
            &analysis,
            &export_path.display().to_string(),
            &now_rfc3339(),
        );

        let report_markdown = report::render_markdown(&self.cfg, &summary, &analysis.direct_edits)
            .with_context(|| "rendering report")?;
        let samples_jsonl = report::render_jsonl(&analysis.direct_edits)?;

        Ok(AuditOutput {
            report_markdown,
            samples_jsonl,
            summary,
        })
    }

    /// Batch files from the CLI take precedence; the config list is the fallback.
    fn resolve_batch_files(&self, cli_files: &[PathBuf]) -> Vec<PathBuf> {
        if !cli_files.is_empty() {
            return cli_files.to_vec();
        }
        self.cfg
            .detection
            .batch_files
            .iter()
            .map(PathBuf::from)
            .collect()
    }

    fn enrich_direct_edits(&self, analysis: &mut EditAnalysis) -> Result<()> {
        for sample in &mut analysis.direct_edits {
            sample.change_summary = Some(diff::word_summary(
                &self.cfg,
                &sample.gpt_caption,
                &sample.final_caption,
            ));
            sample.diff = Some(diff::sentence_diff(
                &self.cfg,
                &sample.gpt_caption,
                &sample.final_caption,
            )?);
        }
        Ok(())
    }
}

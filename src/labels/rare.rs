use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// One entry of a label map file: the videos that exemplify (pos) and
/// counter-exemplify (neg) a boolean predicate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEntry {
    #[serde(default)]
    pub label_name: String,
    #[serde(default)]
    pub def_question: Vec<String>,
    #[serde(default)]
    pub pos: Vec<String>,
    #[serde(default)]
    pub neg: Vec<String>,
}

/// The frequency record reported per label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelStats {
    pub label: String,
    pub label_name: String,
    pub definition: String,
    pub positive_count: usize,
    pub negative_count: usize,
}

impl LabelStats {
    pub fn is_rare(&self, threshold: u32) -> bool {
        self.positive_count > 0 && self.positive_count < threshold as usize
    }
}

pub fn load_label_map(path: &Path) -> Result<BTreeMap<String, LabelEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading label map: {}", path.display()))?;
    let map: BTreeMap<String, LabelEntry> =
        serde_json::from_str(&raw).with_context(|| "parsing label map JSON")?;
    Ok(map)
}

pub fn compute_stats(map: &BTreeMap<String, LabelEntry>) -> Vec<LabelStats> {
    map.iter()
        .map(|(label, entry)| LabelStats {
            label: label.clone(),
            label_name: entry.label_name.clone(),
            definition: entry.def_question.first().cloned().unwrap_or_default(),
            positive_count: entry.pos.len(),
            negative_count: entry.neg.len(),
        })
        .collect()
}

/// Rare labels sorted by ascending positive count, then key.
pub fn rare_labels(stats: &[LabelStats], threshold: u32) -> Vec<LabelStats> {
    let mut rare: Vec<LabelStats> = stats
        .iter()
        .filter(|s| s.is_rare(threshold))
        .cloned()
        .collect();
    rare.sort_by(|a, b| {
        a.positive_count
            .cmp(&b.positive_count)
            .then_with(|| a.label.cmp(&b.label))
    });
    rare
}

pub fn render_markdown_table(rare: &[LabelStats], threshold: u32) -> String {
    let mut md = String::new();
    md.push_str("# Rare Labels Report\n\n");
    md.push_str(&format!(
        "Labels with fewer than {threshold} positive examples ({} total).\n\n",
        rare.len()
    ));
    md.push_str("| Label | Definition | Positive | Negative |\n");
    md.push_str("|-------|------------|----------|----------|\n");
    for s in rare {
        let name = if s.label_name.is_empty() {
            &s.label
        } else {
            &s.label_name
        };
        md.push_str(&format!(
            "| {} (`{}`) | {} | {} | {} |\n",
            name, s.label, s.definition, s.positive_count, s.negative_count
        ));
    }
    md
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectSummary {
    pub labels_processed: usize,
    pub videos_copied: usize,
    pub videos_missing: usize,
}

/// Copy the positive-example videos of every rare label into a per-label
/// directory under `out_dir`. Missing sources are skipped, not fatal.
pub fn collect_videos(
    map: &BTreeMap<String, LabelEntry>,
    threshold: u32,
    videos_dir: &Path,
    out_dir: &Path,
) -> Result<CollectSummary> {
    let mut summary = CollectSummary {
        labels_processed: 0,
        videos_copied: 0,
        videos_missing: 0,
    };

    for (label, entry) in map {
        let pos = entry.pos.len();
        if pos == 0 || pos >= threshold as usize {
            continue;
        }

        let label_dir = out_dir.join(label);
        crate::util::ensure_dir(&label_dir)?;
        info!("collecting label {label} ({pos} videos)");

        for video in &entry.pos {
            // Some maps store paths; only the file name is meaningful here.
            let name = Path::new(video)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(video.as_str());
            let source = videos_dir.join(name);
            if !source.exists() {
                warn!("video not found: {name}");
                summary.videos_missing += 1;
                continue;
            }
            std::fs::copy(&source, label_dir.join(name))
                .with_context(|| format!("copying {name}"))?;
            summary.videos_copied += 1;
        }
        summary.labels_processed += 1;
    }

    Ok(summary)
}

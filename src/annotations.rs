use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::util::rounded_avg;

/// One annotation record as stored on disk. Rating fields are configurable,
/// so they live in the flattened remainder and are read by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, rename = "startIndex", skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,
    #[serde(default, rename = "endIndex", skip_serializing_if = "Option::is_none")]
    pub end_index: Option<i64>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Annotation {
    pub fn rating(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    /// Complete means every required rating is present and every segment
    /// (if any) carries both character indices.
    pub fn is_complete(&self, required_ratings: &[String]) -> bool {
        let ratings_ok = required_ratings
            .iter()
            .all(|field| self.fields.get(field).is_some_and(|v| !v.is_null()));

        let segments_ok = match self.segments.as_deref() {
            Some(segments) if !segments.is_empty() => segments
                .iter()
                .all(|s| s.start_index.is_some() && s.end_index.is_some()),
            _ => true,
        };

        ratings_ok && segments_ok
    }
}

/// Load `sample_<index>.json` files of one dataset directory, ordered by
/// index. Unreadable files are skipped with a warning.
pub fn scan_dataset(dataset_dir: &Path) -> Result<Vec<(usize, Annotation)>> {
    let mut samples = Vec::new();
    let entries = std::fs::read_dir(dataset_dir)
        .with_context(|| format!("reading {}", dataset_dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        let Some(index) = sample_index(&path) else {
            continue;
        };
        match load_annotation(&path) {
            Ok(annotation) => samples.push((index, annotation)),
            Err(err) => warn!("skipping {}: {err:#}", path.display()),
        }
    }

    samples.sort_by_key(|(index, _)| *index);
    Ok(samples)
}

pub fn load_annotation(path: &Path) -> Result<Annotation> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading annotation: {}", path.display()))?;
    let annotation: Annotation =
        serde_json::from_str(&raw).with_context(|| "parsing annotation JSON")?;
    Ok(annotation)
}

fn sample_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    stem.strip_prefix("sample_")?.parse().ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub completed_count: usize,
}

/// Datasets are subdirectories of the annotations dir; only those with at
/// least one complete annotation are listed.
pub fn list_datasets(annotations_dir: &Path, required_ratings: &[String]) -> Vec<DatasetInfo> {
    let Ok(entries) = std::fs::read_dir(annotations_dir) else {
        return Vec::new();
    };

    let mut datasets = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let completed = match scan_dataset(&path) {
            Ok(samples) => samples
                .iter()
                .filter(|(_, a)| a.is_complete(required_ratings))
                .count(),
            Err(err) => {
                warn!("skipping dataset {name}: {err:#}");
                continue;
            }
        };
        if completed > 0 {
            datasets.push(DatasetInfo {
                name: name.to_string(),
                completed_count: completed,
            });
        }
    }

    datasets.sort_by(|a, b| a.name.cmp(&b.name));
    datasets
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplePayload {
    pub sample_index: usize,
    pub video_id: String,
    pub video_path: String,
    pub captions: Value,
    pub metadata: Value,
    pub annotation: Annotation,
}

impl SamplePayload {
    pub fn new(index: usize, annotation: Annotation) -> Self {
        Self {
            sample_index: index,
            video_id: annotation
                .video_id
                .clone()
                .unwrap_or_else(|| format!("sample_{index}")),
            video_path: annotation.video_path.clone().unwrap_or_default(),
            captions: annotation.captions.clone().unwrap_or(Value::Null),
            metadata: annotation.metadata.clone().unwrap_or(Value::Null),
            annotation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub total: usize,
    pub avg_segments: Option<f64>,
    pub avg_scores: BTreeMap<String, Option<f64>>,
}

impl DatasetStats {
    pub fn empty(required_ratings: &[String]) -> Self {
        Self {
            total: 0,
            avg_segments: None,
            avg_scores: required_ratings
                .iter()
                .map(|f| (f.clone(), None))
                .collect(),
        }
    }
}

/// Aggregate statistics over the complete annotations of a dataset.
pub fn compute_stats(samples: &[(usize, Annotation)], required_ratings: &[String]) -> DatasetStats {
    let mut total = 0usize;
    let mut segment_totals = Vec::new();
    let mut scores: BTreeMap<&str, Vec<f64>> = required_ratings
        .iter()
        .map(|f| (f.as_str(), Vec::new()))
        .collect();

    for (_, annotation) in samples {
        if !annotation.is_complete(required_ratings) {
            continue;
        }
        total += 1;

        if let Some(segments) = annotation.segments.as_deref() {
            if !segments.is_empty() {
                segment_totals.push(segments.len() as f64);
            }
        }

        for field in required_ratings {
            if let Some(score) = annotation.rating(field) {
                if let Some(values) = scores.get_mut(field.as_str()) {
                    values.push(score);
                }
            }
        }
    }

    DatasetStats {
        total,
        avg_segments: rounded_avg(&segment_totals),
        avg_scores: scores
            .into_iter()
            .map(|(field, values)| (field.to_string(), rounded_avg(&values)))
            .collect(),
    }
}

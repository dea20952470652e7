use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where a video URL came from: which batch file, and at which index.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchRef {
    pub batch_file: String,
    pub batch_index: i64,
}

impl BatchRef {
    pub fn unknown() -> Self {
        Self {
            batch_file: "unknown".into(),
            batch_index: -1,
        }
    }
}

/// Maps video URLs to their source batch file and position within it.
#[derive(Debug, Default)]
pub struct BatchIndex {
    by_url: HashMap<String, BatchRef>,
    file_count: usize,
}

impl BatchIndex {
    /// Build from batch files, each a JSON array of video URLs. Missing or
    /// unparseable files are skipped with a warning. Later files win on
    /// URL collisions.
    pub fn from_files(paths: &[PathBuf]) -> Result<Self> {
        let mut index = BatchIndex::default();
        for path in paths {
            match load_url_list(path) {
                Ok(urls) => {
                    index.add_batch(&batch_name(path), urls);
                }
                Err(err) => {
                    warn!("skipping batch file {}: {err:#}", path.display());
                }
            }
        }
        info!(
            "built batch mapping for {} video URLs across {} batch files",
            index.by_url.len(),
            index.file_count
        );
        Ok(index)
    }

    pub fn add_batch(&mut self, name: &str, urls: Vec<String>) {
        for (i, url) in urls.into_iter().enumerate() {
            self.by_url.insert(
                url,
                BatchRef {
                    batch_file: name.to_string(),
                    batch_index: i as i64,
                },
            );
        }
        self.file_count += 1;
    }

    pub fn lookup(&self, url: &str) -> BatchRef {
        self.by_url.get(url).cloned().unwrap_or_else(BatchRef::unknown)
    }

    pub fn url_count(&self) -> usize {
        self.by_url.len()
    }
}

fn load_url_list(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch file: {}", path.display()))?;
    let urls: Vec<String> = serde_json::from_str(&raw).with_context(|| "parsing batch JSON")?;
    Ok(urls)
}

fn batch_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub hashing: Hashing,
    #[serde(default)]
    pub detection: Detection,
    #[serde(default)]
    pub diff: Diff,
    #[serde(default)]
    pub rare_labels: RareLabels,
    #[serde(default)]
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub completeness: Completeness,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub job_name: String,
    pub resume: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            job_name: "default".into(),
            resume: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
    pub annotations_dir: String,
    pub videos_dir: String,
    pub labels_dir: String,
    pub static_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            annotations_dir: "annotations".into(),
            videos_dir: "videos".into(),
            labels_dir: "labels".into(),
            static_dir: "static".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashing {
    pub mode: String,
    pub fast_window_bytes: u64,
}
impl Default for Hashing {
    fn default() -> Self {
        Self {
            mode: "fast_2x16mb".into(),
            fast_window_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Annotator whose captions are audited.
    pub target_user: String,
    /// Rating that means the pre-caption was accepted verbatim.
    pub perfect_rating: i64,
    /// Batch files (JSON arrays of video URLs) used to map videos to batches.
    pub batch_files: Vec<String>,
    pub sort_latest_first: bool,
}
impl Default for Detection {
    fn default() -> Self {
        Self {
            target_user: "".into(),
            perfect_rating: 5,
            batch_files: Vec::new(),
            sort_latest_first: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diff {
    /// Cap on listed added/removed words in the change summary.
    pub max_summary_terms: usize,
    /// Fall back to comma-separated clauses when both captions are one sentence.
    pub clause_fallback: bool,
}
impl Default for Diff {
    fn default() -> Self {
        Self {
            max_summary_terms: 10,
            clause_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RareLabels {
    /// A label is rare when 0 < positives < this threshold.
    pub positive_threshold: u32,
}
impl Default for RareLabels {
    fn default() -> Self {
        Self {
            positive_threshold: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub collections: Vec<String>,
}
impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            collections: vec!["cam_motion".into(), "cam_setup".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completeness {
    /// Rating fields that must all be present for an annotation to count as complete.
    pub required_ratings: Vec<String>,
}
impl Default for Completeness {
    fn default() -> Self {
        Self {
            required_ratings: vec![
                "overall".into(),
                "camera".into(),
                "subject".into(),
                "motion".into(),
                "scene".into(),
                "spatial".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Postprocess {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub trim_trailing_whitespace: bool,
    pub sanitize_control_chars: bool,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            trim_trailing_whitespace: true,
            sanitize_control_chars: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_report: bool,
    pub write_samples_jsonl: bool,
    pub write_index_json: bool,
    pub report_filename: String,
    pub samples_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report: true,
            write_samples_jsonl: true,
            write_index_json: true,
            report_filename: "report.md".into(),
            samples_filename: "direct_edit_samples.jsonl".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub keep_alive: bool,
    pub connection_timeout_seconds: u64,
}
impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8081,
            keep_alive: true,
            connection_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}

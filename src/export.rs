use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A caption export file, either a JSON array of video records or an object
/// keyed by video id. Both shapes occur in the wild.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CaptionExport {
    List(Vec<VideoRecord>),
    Map(BTreeMap<String, VideoRecord>),
}

impl CaptionExport {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading export: {}", path.display()))?;
        let export: CaptionExport =
            serde_json::from_str(&raw).with_context(|| "parsing export JSON")?;
        Ok(export)
    }

    pub fn into_videos(self) -> Vec<VideoRecord> {
        match self {
            CaptionExport::List(videos) => videos,
            CaptionExport::Map(map) => map.into_values().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub video_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub video_url: String,
    #[serde(default)]
    pub captions: BTreeMap<String, CaptionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default)]
    pub caption_data: Option<CaptionData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timestamp: String,
    #[serde(default)]
    pub initial_caption_rating_score: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub workflow_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pre_caption: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub initial_feedback: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub final_feedback: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub gpt_caption: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub final_caption: String,
}

/// Text fields are frequently null in exports; treat null as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

use crate::{
    batch::BatchIndex,
    config::Config,
    export::VideoRecord,
};
use serde::{Deserialize, Serialize};

/// How a caption left the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// The annotator changed the generated caption by hand.
    DirectEdit,
    /// The generated caption was accepted verbatim.
    NoEdit,
    /// The pre-caption was rated perfect, so no caption was generated.
    PerfectPrecaption,
    /// No generated caption despite a non-perfect rating.
    MissingGptCaption,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditSample {
    pub video_id: String,
    pub video_url: String,
    pub batch_file: String,
    pub batch_index: i64,
    pub caption_type: String,
    pub status: String,
    pub user: String,
    pub timestamp: String,
    pub initial_caption_rating_score: Option<i64>,
    pub workflow_type: String,
    pub pre_caption: String,
    pub initial_feedback: String,
    pub final_feedback: String,
    pub gpt_caption: String,
    pub final_caption: String,
    pub edit_kind: EditKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
}

/// Partitioned audit result. Missing-caption cases count toward the
/// direct-edit bucket, since both bypass the regeneration workflow.
#[derive(Debug, Default)]
pub struct EditAnalysis {
    pub direct_edits: Vec<EditSample>,
    pub no_edits: Vec<EditSample>,
    pub perfect_precaptions: Vec<EditSample>,
}

impl EditAnalysis {
    pub fn total(&self) -> usize {
        self.direct_edits.len() + self.no_edits.len() + self.perfect_precaptions.len()
    }
}

pub fn classify(
    rating: Option<i64>,
    gpt_caption: &str,
    final_caption: &str,
    perfect_rating: i64,
) -> EditKind {
    if rating == Some(perfect_rating) {
        EditKind::PerfectPrecaption
    } else if gpt_caption.trim().is_empty() {
        EditKind::MissingGptCaption
    } else if final_caption.trim() != gpt_caption.trim() {
        EditKind::DirectEdit
    } else {
        EditKind::NoEdit
    }
}

/// Walk every caption of every video and keep those authored by the target
/// user, partitioned by edit kind.
pub fn analyze(cfg: &Config, videos: &[VideoRecord], batches: &BatchIndex) -> EditAnalysis {
    let target = cfg.detection.target_user.as_str();
    let mut analysis = EditAnalysis::default();

    for video in videos {
        let batch = batches.lookup(&video.video_url);

        for (caption_type, entry) in &video.captions {
            let Some(data) = entry.caption_data.as_ref() else {
                continue;
            };
            if data.user != target {
                continue;
            }

            let kind = classify(
                data.initial_caption_rating_score,
                &data.gpt_caption,
                &data.final_caption,
                cfg.detection.perfect_rating,
            );

            let sample = EditSample {
                video_id: video.video_id.clone(),
                video_url: video.video_url.clone(),
                batch_file: batch.batch_file.clone(),
                batch_index: batch.batch_index,
                caption_type: caption_type.clone(),
                status: entry.status.clone(),
                user: data.user.clone(),
                timestamp: data.timestamp.clone(),
                initial_caption_rating_score: data.initial_caption_rating_score,
                workflow_type: data.workflow_type.clone(),
                pre_caption: data.pre_caption.trim().to_string(),
                initial_feedback: data.initial_feedback.trim().to_string(),
                final_feedback: data.final_feedback.trim().to_string(),
                gpt_caption: data.gpt_caption.trim().to_string(),
                final_caption: data.final_caption.trim().to_string(),
                edit_kind: kind,
                diff: None,
                change_summary: None,
            };

            match kind {
                EditKind::DirectEdit | EditKind::MissingGptCaption => {
                    analysis.direct_edits.push(sample);
                }
                EditKind::NoEdit => analysis.no_edits.push(sample),
                EditKind::PerfectPrecaption => analysis.perfect_precaptions.push(sample),
            }
        }
    }

    analysis
}

use clip_audit::{
    batch::{BatchIndex, BatchRef},
    config::Config,
    edits::{analyze, classify, EditKind},
    export::{CaptionData, CaptionEntry, VideoRecord},
};
use std::collections::BTreeMap;

#[test]
fn perfect_rating_wins_over_everything() {
    let kind = classify(Some(5), "", "something else", 5);
    assert_eq!(kind, EditKind::PerfectPrecaption);
}

#[test]
fn missing_generated_caption() {
    let kind = classify(Some(3), "  ", "a final caption", 5);
    assert_eq!(kind, EditKind::MissingGptCaption);
}

#[test]
fn direct_edit_on_changed_text() {
    let kind = classify(Some(4), "The cat sits.", "The dog sits.", 5);
    assert_eq!(kind, EditKind::DirectEdit);
}

#[test]
fn whitespace_only_difference_is_no_edit() {
    let kind = classify(None, "The cat sits.", "  The cat sits.  ", 5);
    assert_eq!(kind, EditKind::NoEdit);
}

fn video(url: &str, user: &str, gpt: &str, fin: &str) -> VideoRecord {
    let mut captions = BTreeMap::new();
    captions.insert(
        "subject_description".to_string(),
        CaptionEntry {
            status: "approved".to_string(),
            caption_data: Some(CaptionData {
                user: user.to_string(),
                gpt_caption: gpt.to_string(),
                final_caption: fin.to_string(),
                initial_caption_rating_score: Some(3),
                ..Default::default()
            }),
        },
    );
    VideoRecord {
        video_id: "vid_1".to_string(),
        video_url: url.to_string(),
        captions,
    }
}

#[test]
fn analyze_filters_by_user_and_maps_batches() {
    let mut cfg = Config::default();
    cfg.detection.target_user = "Alice".to_string();

    let mut batches = BatchIndex::default();
    batches.add_batch(
        "batch_0_to_10.json",
        vec!["http://example/v0".to_string(), "http://example/v1".to_string()],
    );

    let videos = vec![
        video("http://example/v1", "Alice", "a cat", "a dog"),
        video("http://example/v1", "Bob", "a cat", "a dog"),
        video("http://unmapped/v9", "Alice", "same", "same"),
    ];

    let analysis = analyze(&cfg, &videos, &batches);
    assert_eq!(analysis.total(), 2);
    assert_eq!(analysis.direct_edits.len(), 1);
    assert_eq!(analysis.no_edits.len(), 1);

    let edited = &analysis.direct_edits[0];
    assert_eq!(edited.batch_file, "batch_0_to_10.json");
    assert_eq!(edited.batch_index, 1);

    let unmapped = &analysis.no_edits[0];
    assert_eq!(unmapped.batch_file, "unknown");
    assert_eq!(unmapped.batch_index, -1);
}

#[test]
fn lookup_of_unknown_url_is_sentinel() {
    let batches = BatchIndex::default();
    assert_eq!(batches.lookup("http://nowhere"), BatchRef::unknown());
}

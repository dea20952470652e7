use clip_audit::annotations::{compute_stats, Annotation};
use clip_audit::config::Config;

fn required() -> Vec<String> {
    Config::default().completeness.required_ratings
}

fn parse(raw: &str) -> Annotation {
    serde_json::from_str(raw).expect("parse annotation")
}

const COMPLETE: &str = r#"{
    "video_id": "vid_1",
    "video_path": "clips/vid_1.mp4",
    "overall": 4, "camera": 5, "subject": 3, "motion": 4, "scene": 5, "spatial": 4,
    "segments": [{"startIndex": 0, "endIndex": 12}]
}"#;

#[test]
fn complete_annotation_passes() {
    assert!(parse(COMPLETE).is_complete(&required()));
}

#[test]
fn missing_rating_is_incomplete() {
    let ann = parse(r#"{"overall": 4, "camera": 5, "subject": 3, "motion": 4, "scene": 5}"#);
    assert!(!ann.is_complete(&required()));
}

#[test]
fn null_rating_is_incomplete() {
    let ann = parse(
        r#"{"overall": null, "camera": 5, "subject": 3, "motion": 4, "scene": 5, "spatial": 4}"#,
    );
    assert!(!ann.is_complete(&required()));
}

#[test]
fn segment_without_indices_is_incomplete() {
    let ann = parse(
        r#"{
            "overall": 4, "camera": 5, "subject": 3, "motion": 4, "scene": 5, "spatial": 4,
            "segments": [{"startIndex": 0}]
        }"#,
    );
    assert!(!ann.is_complete(&required()));
}

#[test]
fn no_segments_is_still_complete() {
    let ann = parse(
        r#"{"overall": 4, "camera": 5, "subject": 3, "motion": 4, "scene": 5, "spatial": 4}"#,
    );
    assert!(ann.is_complete(&required()));
}

#[test]
fn stats_average_complete_annotations_only() {
    let complete_a = parse(COMPLETE);
    let complete_b = parse(
        r#"{
            "overall": 5, "camera": 4, "subject": 5, "motion": 5, "scene": 4, "spatial": 5,
            "segments": [{"startIndex": 3, "endIndex": 9}, {"startIndex": 10, "endIndex": 20}]
        }"#,
    );
    let incomplete = parse(r#"{"overall": 1}"#);

    let samples = vec![(0, complete_a), (1, complete_b), (2, incomplete)];
    let stats = compute_stats(&samples, &required());

    assert_eq!(stats.total, 2);
    assert_eq!(stats.avg_segments, Some(1.5));
    assert_eq!(stats.avg_scores.get("overall"), Some(&Some(4.5)));
    assert_eq!(stats.avg_scores.get("camera"), Some(&Some(4.5)));
}

#[test]
fn empty_dataset_has_null_averages() {
    let stats = compute_stats(&[], &required());
    assert_eq!(stats.total, 0);
    assert_eq!(stats.avg_segments, None);
    assert_eq!(stats.avg_scores.get("overall"), Some(&None));
}

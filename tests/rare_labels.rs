use clip_audit::labels::rare::{compute_stats, rare_labels, render_markdown_table, LabelEntry};
use std::collections::BTreeMap;

fn entry(name: &str, pos: usize, neg: usize) -> LabelEntry {
    LabelEntry {
        label_name: name.to_string(),
        def_question: vec![format!("Does the camera {name}?")],
        pos: (0..pos).map(|i| format!("pos_{i}.mp4")).collect(),
        neg: (0..neg).map(|i| format!("neg_{i}.mp4")).collect(),
    }
}

fn label_map() -> BTreeMap<String, LabelEntry> {
    let mut map = BTreeMap::new();
    map.insert("cam_motion.pan.pan_left".to_string(), entry("Pan Left", 5, 100));
    map.insert("cam_motion.pan.pan_right".to_string(), entry("Pan Right", 29, 80));
    map.insert("cam_motion.zoom.zoom_in".to_string(), entry("Zoom In", 30, 10));
    map.insert("cam_setup.unused".to_string(), entry("Unused", 0, 40));
    map
}

#[test]
fn rare_excludes_zero_and_threshold() {
    let stats = compute_stats(&label_map());
    let rare = rare_labels(&stats, 30);

    let keys: Vec<&str> = rare.iter().map(|s| s.label.as_str()).collect();
    // 0 positives and >= 30 positives are both out.
    assert_eq!(keys, vec!["cam_motion.pan.pan_left", "cam_motion.pan.pan_right"]);
}

#[test]
fn rare_sorted_by_ascending_positive_count() {
    let stats = compute_stats(&label_map());
    let rare = rare_labels(&stats, 30);
    assert_eq!(rare[0].positive_count, 5);
    assert_eq!(rare[1].positive_count, 29);
}

#[test]
fn counts_come_from_example_lists() {
    let stats = compute_stats(&label_map());
    let pan_left = stats
        .iter()
        .find(|s| s.label == "cam_motion.pan.pan_left")
        .expect("pan_left present");
    assert_eq!(pan_left.positive_count, 5);
    assert_eq!(pan_left.negative_count, 100);
    assert_eq!(pan_left.label_name, "Pan Left");
    assert!(pan_left.definition.contains("Pan Left"));
}

#[test]
fn markdown_table_lists_rare_rows() {
    let stats = compute_stats(&label_map());
    let rare = rare_labels(&stats, 30);
    let md = render_markdown_table(&rare, 30);

    assert!(md.contains("| Label | Definition | Positive | Negative |"));
    assert!(md.contains("Pan Left"));
    assert!(md.contains("`cam_motion.pan.pan_left`"));
    assert!(!md.contains("Zoom In"));
}

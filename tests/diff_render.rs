use clip_audit::{
    config::Config,
    diff::{sentence_diff, split_sentences, word_summary},
};

#[test]
fn word_summary_lists_added_and_removed() {
    let cfg = Config::default();
    let summary = word_summary(&cfg, "the man walks", "the woman walks");
    assert!(summary.contains("Added: woman"));
    assert!(summary.contains("Removed: man"));
}

#[test]
fn word_summary_reorder_is_minor() {
    let cfg = Config::default();
    let summary = word_summary(&cfg, "world hello", "hello world");
    assert_eq!(summary, "Minor changes (punctuation/formatting)");
}

#[test]
fn word_summary_caps_listed_terms() {
    let mut cfg = Config::default();
    cfg.diff.max_summary_terms = 3;
    let summary = word_summary(&cfg, "", "one two three four five");
    assert!(summary.contains("one, two, three"));
    assert!(!summary.contains("four"));
}

#[test]
fn sentences_keep_their_terminators() {
    let sentences = split_sentences("The cat sits. The dog barks! Done?").unwrap();
    assert_eq!(
        sentences,
        vec!["The cat sits.", "The dog barks!", "Done?"]
    );
}

#[test]
fn sentence_diff_marks_changed_sentence_only() {
    let cfg = Config::default();
    let diff = sentence_diff(
        &cfg,
        "The cat sits. The dog barks.",
        "The cat sits. The dog howls.",
    )
    .unwrap();
    assert_eq!(diff, "- The dog barks.\n+ The dog howls.");
}

#[test]
fn single_sentence_falls_back_to_clauses() {
    let cfg = Config::default();
    let diff = sentence_diff(&cfg, "a red car, going fast", "a blue car, going fast").unwrap();
    assert_eq!(diff, "- a red car\n+ a blue car");
}

#[test]
fn additions_at_end_are_reported() {
    let cfg = Config::default();
    let diff = sentence_diff(&cfg, "First part.", "First part. A new detail.").unwrap();
    assert_eq!(diff, "+ A new detail.");
}

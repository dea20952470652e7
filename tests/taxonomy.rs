use clip_audit::labels::taxonomy::{
    aspect_of, compose_key, name_mapping, organize_hierarchy, Primitive,
};
use std::collections::BTreeMap;

fn primitive(full_key: &str, label_name: &str) -> Primitive {
    let parts: Vec<&str> = full_key.split('.').collect();
    Primitive {
        label_name: label_name.to_string(),
        label: full_key.to_string(),
        def_question: format!("Is it {label_name}?"),
        def_prompt: String::new(),
        hierarchy_path: parts[1..parts.len() - 1].iter().map(|s| s.to_string()).collect(),
        filename: parts[parts.len() - 1].to_string(),
        full_key: full_key.to_string(),
    }
}

#[test]
fn keys_are_dotted_paths() {
    assert_eq!(
        compose_key("cam_motion", &["pan".to_string()], "pan_left"),
        "cam_motion.pan.pan_left"
    );
    assert_eq!(compose_key("cam_setup", &[], "has_shot_transition"), "cam_setup.has_shot_transition");
}

#[test]
fn aspect_depends_on_key_depth() {
    assert_eq!(aspect_of("cam_setup.has_shot_transition"), "root");
    assert_eq!(aspect_of("cam_motion.tracking.general_tracking"), "tracking");
    assert_eq!(
        aspect_of("cam_motion.ground_centric_movement.forward.has_forward"),
        "ground_centric_movement.forward"
    );
}

#[test]
fn hierarchy_groups_by_collection_and_aspect() {
    let mut primitives = BTreeMap::new();
    for (key, name) in [
        ("cam_motion.pan.pan_left", "Pan Left"),
        ("cam_motion.pan.pan_right", "Pan Right"),
        ("cam_setup.has_overlays", "Has Overlays"),
    ] {
        primitives.insert(key.to_string(), primitive(key, name));
    }

    let hierarchy = organize_hierarchy(&primitives);
    assert_eq!(hierarchy["cam_motion"]["pan"].len(), 2);
    assert_eq!(hierarchy["cam_setup"]["root"].len(), 1);
}

#[test]
fn name_mapping_keeps_latest_on_duplicates() {
    let mut primitives = BTreeMap::new();
    primitives.insert(
        "cam_motion.pan.pan_left".to_string(),
        primitive("cam_motion.pan.pan_left", "Pan Left"),
    );
    primitives.insert(
        "cam_motion.pan_variants.pan_left".to_string(),
        primitive("cam_motion.pan_variants.pan_left", "Pan Left"),
    );

    let mapping = name_mapping(&primitives);
    assert_eq!(mapping.len(), 1);
    // BTreeMap iteration order: the later key overwrites.
    assert_eq!(mapping["Pan Left"], "cam_motion.pan_variants.pan_left");
}

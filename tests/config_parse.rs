use clip_audit::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../clip-audit.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.rare_labels.positive_threshold, 30);
    assert_eq!(cfg.detection.perfect_rating, 5);
    assert!(!cfg.paths.out_dir.is_empty());
    assert_eq!(cfg.completeness.required_ratings.len(), 6);
}

#[test]
fn defaults_round_trip_through_toml() {
    let cfg = Config::default();
    let raw = cfg.normalized_for_hash();
    let parsed: Config = toml::from_str(&raw).expect("parse serialized config");
    assert_eq!(parsed.server.port, cfg.server.port);
    assert_eq!(parsed.taxonomy.collections, cfg.taxonomy.collections);
}

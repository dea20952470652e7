use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// One boolean predicate of the camera-motion/camera-setup taxonomy, read
/// from its JSON leaf file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primitive {
    pub label_name: String,
    pub label: String,
    pub def_question: String,
    pub def_prompt: String,
    pub hierarchy_path: Vec<String>,
    pub filename: String,
    pub full_key: String,
}

/// Raw on-disk shape: questions and prompts are lists of phrasings; only the
/// first one is kept.
#[derive(Debug, Deserialize)]
struct PrimitiveFile {
    #[serde(default)]
    label_name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    def_question: Vec<String>,
    #[serde(default)]
    def_prompt: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyEntry {
    pub full_key: String,
    pub label_name: String,
    pub def_question: String,
    pub def_prompt: String,
}

/// Dotted key for a primitive: collection, then each directory, then the
/// file stem.
pub fn compose_key(collection: &str, dirs: &[String], stem: &str) -> String {
    let mut parts = Vec::with_capacity(dirs.len() + 2);
    parts.push(collection.to_string());
    parts.extend(dirs.iter().cloned());
    parts.push(stem.to_string());
    parts.join(".")
}

/// The aspect a primitive is grouped under: "root" for top-level keys, the
/// middle segment(s) otherwise.
pub fn aspect_of(full_key: &str) -> String {
    let parts: Vec<&str> = full_key.split('.').collect();
    match parts.len() {
        0..=2 => "root".to_string(),
        3 => parts[1].to_string(),
        _ => parts[1..parts.len() - 1].join("."),
    }
}

/// Walk the labels tree for the given collections and return all primitives
/// keyed by their dotted key. Missing collection directories are skipped
/// with a warning.
pub fn walk_labels_dir(
    labels_root: &Path,
    collections: &[String],
) -> Result<BTreeMap<String, Primitive>> {
    let mut primitives = BTreeMap::new();
    for collection in collections {
        let collection_path = labels_root.join(collection);
        if !collection_path.exists() {
            warn!("label collection not found: {}", collection_path.display());
            continue;
        }
        walk_collection(&collection_path, collection, &mut Vec::new(), &mut primitives)?;
    }
    Ok(primitives)
}

fn walk_collection(
    dir: &Path,
    collection: &str,
    dirs: &mut Vec<String>,
    out: &mut BTreeMap<String, Primitive>,
) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            dirs.push(name.to_string());
            walk_collection(&path, collection, dirs, out)?;
            dirs.pop();
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let file: PrimitiveFile = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;

            let full_key = compose_key(collection, dirs, stem);
            out.insert(
                full_key.clone(),
                Primitive {
                    label_name: file.label_name,
                    label: file.label,
                    def_question: file.def_question.into_iter().next().unwrap_or_default(),
                    def_prompt: file.def_prompt.into_iter().next().unwrap_or_default(),
                    hierarchy_path: dirs.clone(),
                    filename: stem.to_string(),
                    full_key,
                },
            );
        }
    }
    Ok(())
}

/// Group primitives as collection -> aspect -> entries.
pub fn organize_hierarchy(
    primitives: &BTreeMap<String, Primitive>,
) -> BTreeMap<String, BTreeMap<String, Vec<HierarchyEntry>>> {
    let mut hierarchy: BTreeMap<String, BTreeMap<String, Vec<HierarchyEntry>>> = BTreeMap::new();

    for (full_key, info) in primitives {
        let collection = full_key.split('.').next().unwrap_or_default().to_string();
        let aspect = aspect_of(full_key);
        hierarchy
            .entry(collection)
            .or_default()
            .entry(aspect)
            .or_default()
            .push(HierarchyEntry {
                full_key: full_key.clone(),
                label_name: info.label_name.clone(),
                def_question: info.def_question.clone(),
                def_prompt: info.def_prompt.clone(),
            });
    }

    hierarchy
}

/// Human-readable name -> dotted key. Duplicate names are reported and the
/// later key wins.
pub fn name_mapping(primitives: &BTreeMap<String, Primitive>) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();
    for (full_key, info) in primitives {
        if info.label_name.is_empty() {
            continue;
        }
        if let Some(existing) = mapping.insert(info.label_name.clone(), full_key.clone()) {
            warn!(
                "duplicate label_name '{}': {} replaces {}",
                info.label_name, full_key, existing
            );
        }
    }
    mapping
}

use crate::config::Config;
use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

/// Word-level change summary between the generated and the final caption.
/// Lists added and removed words (case-insensitive, capped), or a fixed
/// phrase when the word sets are identical.
pub fn word_summary(cfg: &Config, gpt_caption: &str, final_caption: &str) -> String {
    let max_terms = cfg.diff.max_summary_terms;
    let gpt_words = word_set(gpt_caption);
    let final_words = word_set(final_caption);

    let added = ordered_difference(final_caption, &gpt_words, max_terms);
    let removed = ordered_difference(gpt_caption, &final_words, max_terms);

    let mut parts = Vec::new();
    if !added.is_empty() {
        parts.push(format!("Added: {}", added.join(", ")));
    }
    if !removed.is_empty() {
        parts.push(format!("Removed: {}", removed.join(", ")));
    }

    if parts.is_empty() {
        return "Minor changes (punctuation/formatting)".to_string();
    }
    parts.join("; ")
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Words of `text` (lowercased, first occurrence order) not present in `other`.
fn ordered_difference(text: &str, other: &HashSet<String>, max_terms: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for word in text.to_lowercase().split_whitespace() {
        if other.contains(word) || !seen.insert(word.to_string()) {
            continue;
        }
        out.push(word.to_string());
        if out.len() == max_terms {
            break;
        }
    }
    out
}

/// Sentence-level diff in `diff` code-block notation: removed sentences as
/// `- ...`, added ones as `+ ...`, no context lines. When both captions are a
/// single sentence the comparison falls back to comma-separated clauses.
pub fn sentence_diff(cfg: &Config, gpt_caption: &str, final_caption: &str) -> Result<String> {
    let mut old = split_sentences(gpt_caption)?;
    let mut new = split_sentences(final_caption)?;

    if cfg.diff.clause_fallback && old.len() <= 1 && new.len() <= 1 {
        old = split_clauses(gpt_caption);
        new = split_clauses(final_caption);
    }

    let lines = diff_lines(&old, &new);
    if lines.is_empty() {
        // Whitespace-only difference; show the raw pair.
        return Ok(format!("- {gpt_caption}\n+ {final_caption}"));
    }
    Ok(lines.join("\n"))
}

/// Split on sentence terminators followed by whitespace, keeping the
/// terminator with its sentence.
pub fn split_sentences(text: &str) -> Result<Vec<String>> {
    let boundary = Regex::new(r"[.!?]\s+")?;
    let text = text.trim();
    let mut out = Vec::new();
    let mut start = 0;
    for m in boundary.find_iter(text) {
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            out.push(sentence.to_string());
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    Ok(out)
}

fn split_clauses(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Zero-context diff over already-split lines. Within each hunk removals are
/// emitted before additions, unified-diff style.
fn diff_lines(old: &[String], new: &[String]) -> Vec<String> {
    let table = lcs_table(old, new);
    let mut out = Vec::new();
    let mut removed: Vec<String> = Vec::new();
    let mut added: Vec<String> = Vec::new();
    let (mut i, mut j) = (0, 0);

    fn flush(removed: &mut Vec<String>, added: &mut Vec<String>, out: &mut Vec<String>) {
        out.append(removed);
        out.append(added);
    }

    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            flush(&mut removed, &mut added, &mut out);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            removed.push(format!("- {}", old[i]));
            i += 1;
        } else {
            added.push(format!("+ {}", new[j]));
            j += 1;
        }
    }
    for line in &old[i..] {
        removed.push(format!("- {line}"));
    }
    for line in &new[j..] {
        added.push(format!("+ {line}"));
    }
    flush(&mut removed, &mut added, &mut out);

    out
}

fn lcs_table(old: &[String], new: &[String]) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}

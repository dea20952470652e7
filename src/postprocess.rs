use crate::config::Config;
use unicode_normalization::UnicodeNormalization;

/// Normalize rendered report text. Classification always happens on the raw
/// trimmed captions; this only cleans what ends up in the markdown output.
pub fn finalize_report_text(cfg: &Config, text: String) -> String {
    let mut out = text;

    if cfg.postprocess.normalize_newlines {
        out = out.replace("\r\n", "\n");
    }

    if cfg.postprocess.normalize_unicode {
        out = out.nfkc().collect::<String>();
    }

    if cfg.postprocess.sanitize_control_chars {
        out = sanitize_control_chars(&out);
    }

    if cfg.postprocess.trim_trailing_whitespace {
        out = out
            .lines()
            .map(|l| l.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");
    }

    out
}

/// Drop C0 control characters, keeping structural whitespace intact.
fn sanitize_control_chars(s: &str) -> String {
    s.chars()
        .filter(|&ch| !ch.is_control() || ch == '\n' || ch == '\r' || ch == '\t')
        .collect()
}

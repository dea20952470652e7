use super::routes::{error_response, redirect};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{header, Response, StatusCode};
use std::path::Path;
use tracing::{debug, warn};

/// Decode %XX escapes; invalid escapes pass through untouched.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Content-Type from file extension.
pub fn content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("ogg" | "ogv") => "video/ogg",
        _ => "application/octet-stream",
    }
}

/// Parsed single-range request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: usize,
    pub end: Option<usize>,
}

impl RangeRequest {
    pub fn end_position(&self, file_size: usize) -> usize {
        self.end.unwrap_or_else(|| file_size.saturating_sub(1))
    }
}

#[derive(Debug)]
pub enum RangeParseResult {
    Valid(RangeRequest),
    /// start >= file size: respond 416.
    NotSatisfiable,
    /// Absent or malformed: serve the whole file.
    None,
}

/// Parse a `bytes=` Range header (single range only).
pub fn parse_range_header(range_header: Option<&str>, file_size: usize) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };
    let Some(spec) = header.strip_prefix("bytes=") else {
        return RangeParseResult::None;
    };
    if spec.contains(',') {
        return RangeParseResult::None;
    }

    let parts: Vec<&str> = spec.split('-').collect();
    if parts.len() != 2 {
        return RangeParseResult::None;
    }
    let (start_str, end_str) = (parts[0].trim(), parts[1].trim());

    // Suffix form: "-500" means the last 500 bytes.
    if start_str.is_empty() {
        let Ok(suffix) = end_str.parse::<usize>() else {
            return RangeParseResult::None;
        };
        if suffix == 0 || file_size == 0 {
            return RangeParseResult::NotSatisfiable;
        }
        return RangeParseResult::Valid(RangeRequest {
            start: file_size.saturating_sub(suffix),
            end: Some(file_size - 1),
        });
    }

    let Ok(start) = start_str.parse::<usize>() else {
        return RangeParseResult::None;
    };
    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let end = if end_str.is_empty() {
        None
    } else {
        let Ok(e) = end_str.parse::<usize>() else {
            return RangeParseResult::None;
        };
        Some(e.min(file_size - 1))
    };

    if let Some(e) = end {
        if start > e {
            return RangeParseResult::NotSatisfiable;
        }
    }

    RangeParseResult::Valid(RangeRequest { start, end })
}

/// Serve a video from the videos directory with Range support.
pub async fn serve_video(
    videos_dir: &Path,
    video_path: &str,
    range: Option<&str>,
) -> Response<Full<Bytes>> {
    let Some(full_path) = resolve_under(videos_dir, video_path) else {
        return error_response(StatusCode::NOT_FOUND, "Video not found");
    };

    let data = match tokio::fs::read(&full_path).await {
        Ok(data) => data,
        Err(err) => {
            debug!("video read failed {}: {err}", full_path.display());
            return error_response(StatusCode::NOT_FOUND, "Video not found");
        }
    };

    let mime = content_type(full_path.extension().and_then(|e| e.to_str()));
    let total = data.len();

    match parse_range_header(range, total) {
        RangeParseResult::Valid(r) => {
            let start = r.start;
            let end = r.end_position(total);
            let body = Bytes::from(data[start..=end].to_vec());
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, mime)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{total}"),
                )
                .header(header::CONTENT_LENGTH, body.len())
                .body(Full::new(body))
                .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "response"))
        }
        RangeParseResult::NotSatisfiable => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{total}"))
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "response")),
        RangeParseResult::None => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_LENGTH, total)
            .body(Full::new(Bytes::from(data)))
            .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "response")),
    }
}

/// Serve a static asset (HTML/CSS/JS get no-cache headers so edits show up
/// on refresh during annotation review).
pub async fn serve_static(static_dir: &Path, path: &str) -> Response<Full<Bytes>> {
    if path.ends_with('/') {
        return redirect("/viewer.html");
    }

    let Some(full_path) = resolve_under(static_dir, path.trim_start_matches('/')) else {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    };

    let data = match tokio::fs::read(&full_path).await {
        Ok(data) => data,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "Not found"),
    };

    let ext = full_path.extension().and_then(|e| e.to_str());
    let mime = content_type(ext);
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, data.len());
    if matches!(ext, Some("html" | "htm" | "css" | "js")) {
        builder = builder.header(
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, max-age=0",
        );
    }
    builder
        .body(Full::new(Bytes::from(data)))
        .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "response"))
}

/// Join a request path onto a base directory and refuse anything that
/// escapes it.
fn resolve_under(base: &Path, rel: &str) -> Option<std::path::PathBuf> {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return None;
    }

    let base_canonical = base.canonicalize().ok()?;
    let candidate = base.join(rel);
    let candidate_canonical = candidate.canonicalize().ok()?;
    if !candidate_canonical.starts_with(&base_canonical) {
        warn!("path traversal attempt blocked: {rel}");
        return None;
    }
    Some(candidate_canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(percent_decode("/api/dataset/my%20set"), "/api/dataset/my set");
        assert_eq!(percent_decode("/videos/a%2Fb.mp4"), "/videos/a/b.mp4");
        assert_eq!(percent_decode("/plain"), "/plain");
        assert_eq!(percent_decode("/bad%zz"), "/bad%zz");
    }

    #[test]
    fn mime_for_common_types() {
        assert_eq!(content_type(Some("html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Some("mp4")), "video/mp4");
        assert_eq!(content_type(Some("mkv")), "video/x-matroska");
        assert_eq!(content_type(Some("xyz")), "application/octet-stream");
        assert_eq!(content_type(None), "application/octet-stream");
    }

    #[test]
    fn standard_range() {
        match parse_range_header(Some("bytes=0-9"), 100) {
            RangeParseResult::Valid(r) => {
                assert_eq!(r.start, 0);
                assert_eq!(r.end, Some(9));
            }
            _ => panic!("expected Valid"),
        }
    }

    #[test]
    fn open_ended_range() {
        match parse_range_header(Some("bytes=50-"), 100) {
            RangeParseResult::Valid(r) => {
                assert_eq!(r.start, 50);
                assert_eq!(r.end_position(100), 99);
            }
            _ => panic!("expected Valid"),
        }
    }

    #[test]
    fn suffix_range() {
        match parse_range_header(Some("bytes=-20"), 100) {
            RangeParseResult::Valid(r) => {
                assert_eq!(r.start, 80);
                assert_eq!(r.end, Some(99));
            }
            _ => panic!("expected Valid"),
        }
    }

    #[test]
    fn unsatisfiable_and_malformed() {
        assert!(matches!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeParseResult::NotSatisfiable
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=a-b"), 100),
            RangeParseResult::None
        ));
        assert!(matches!(
            parse_range_header(Some("bytes=0-9,20-29"), 100),
            RangeParseResult::None
        ));
        assert!(matches!(
            parse_range_header(None, 100),
            RangeParseResult::None
        ));
    }
}

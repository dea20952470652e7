use super::media;
use super::ViewerState;
use crate::annotations::{self, DatasetStats, SamplePayload};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{header, Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

pub async fn handle(
    req: Request<Incoming>,
    state: Arc<ViewerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET {
        return Ok(method_not_allowed());
    }

    let path = media::percent_decode(req.uri().path());
    let range = req
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = route(&path, range.as_deref(), &state).await;
    if path.starts_with("/api/") {
        info!("GET {path} -> {}", response.status());
    }
    Ok(response)
}

async fn route(path: &str, range: Option<&str>, state: &Arc<ViewerState>) -> Response<Full<Bytes>> {
    if path == "/" {
        return redirect("/viewer.html");
    }

    if path == "/api/datasets" {
        return api_datasets(state).await;
    }
    if let Some(name) = path.strip_prefix("/api/dataset/") {
        return api_dataset(state, name).await;
    }
    if let Some(rest) = path.strip_prefix("/api/sample/") {
        return api_sample(state, rest).await;
    }
    if let Some(name) = path.strip_prefix("/api/stats/") {
        return api_stats(state, name).await;
    }

    if let Some(video_path) = path.strip_prefix("/videos/") {
        return media::serve_video(&state.videos_dir, video_path, range).await;
    }

    media::serve_static(&state.static_dir, path).await
}

/// Dataset names index into the filesystem; anything path-like is rejected.
fn valid_dataset_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

async fn api_datasets(state: &Arc<ViewerState>) -> Response<Full<Bytes>> {
    let state = Arc::clone(state);
    run_blocking(move || {
        let datasets = annotations::list_datasets(&state.annotations_dir, &state.required_ratings);
        json_response(&datasets)
    })
    .await
}

async fn api_dataset(state: &Arc<ViewerState>, name: &str) -> Response<Full<Bytes>> {
    if !valid_dataset_name(name) {
        return error_response(StatusCode::BAD_REQUEST, "invalid dataset name");
    }
    let state = Arc::clone(state);
    let name = name.to_string();
    run_blocking(move || {
        let dir = state.annotations_dir.join(&name);
        if !dir.is_dir() {
            return error_response(StatusCode::NOT_FOUND, "Dataset not found");
        }
        let Ok(all) = annotations::scan_dataset(&dir) else {
            return error_response(StatusCode::NOT_FOUND, "Dataset not found");
        };
        let samples: Vec<SamplePayload> = all
            .into_iter()
            .filter(|(_, a)| a.is_complete(&state.required_ratings))
            .map(|(index, a)| SamplePayload::new(index, a))
            .collect();
        json_response(&json!({
            "dataset_name": name,
            "total_completed": samples.len(),
            "samples": samples,
        }))
    })
    .await
}

async fn api_sample(state: &Arc<ViewerState>, rest: &str) -> Response<Full<Bytes>> {
    let mut parts = rest.splitn(2, '/');
    let name = parts.next().unwrap_or_default().to_string();
    if !valid_dataset_name(&name) {
        return error_response(StatusCode::BAD_REQUEST, "invalid sample reference");
    }
    let Some(index) = parts.next().and_then(|s| s.parse::<usize>().ok()) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid sample reference");
    };

    let state = Arc::clone(state);
    run_blocking(move || {
        let path = state
            .annotations_dir
            .join(&name)
            .join(format!("sample_{index}.json"));
        let Ok(annotation) = annotations::load_annotation(&path) else {
            return error_response(StatusCode::NOT_FOUND, "Sample not found");
        };
        if !annotation.is_complete(&state.required_ratings) {
            return error_response(StatusCode::NOT_FOUND, "Sample not found");
        }
        let payload = SamplePayload::new(index, annotation);
        json_response(&json!({
            "sample": {
                "video_id": payload.video_id,
                "video_path": payload.video_path,
                "captions": payload.captions,
                "metadata": payload.metadata,
            },
            "annotation": payload.annotation,
            "dataset_info": {
                "name": name,
                "sample_index": index,
            },
        }))
    })
    .await
}

async fn api_stats(state: &Arc<ViewerState>, name: &str) -> Response<Full<Bytes>> {
    if !valid_dataset_name(name) {
        return error_response(StatusCode::BAD_REQUEST, "invalid dataset name");
    }
    let state = Arc::clone(state);
    let name = name.to_string();
    run_blocking(move || {
        let dir = state.annotations_dir.join(&name);
        let stats = match annotations::scan_dataset(&dir) {
            Ok(samples) => annotations::compute_stats(&samples, &state.required_ratings),
            Err(_) => DatasetStats::empty(&state.required_ratings),
        };
        json_response(&stats)
    })
    .await
}

/// Annotation scanning is synchronous filesystem work; keep it off the
/// connection tasks.
async fn run_blocking<F>(f: F) -> Response<Full<Bytes>>
where
    F: FnOnce() -> Response<Full<Bytes>> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!("blocking task failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub fn json_response<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(data) {
        Ok(body) => response_builder(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| empty_response(StatusCode::INTERNAL_SERVER_ERROR)),
        Err(err) => {
            tracing::error!("failed to serialize response: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "serialization failed")
        }
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = json!({ "error": message }).to_string();
    response_builder(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| empty_response(status))
}

pub fn redirect(location: &str) -> Response<Full<Bytes>> {
    response_builder(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| empty_response(StatusCode::FOUND))
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    response_builder(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::ALLOW, "GET")
        .body(Full::new(Bytes::from("read-only viewer: GET only")))
        .unwrap_or_else(|_| empty_response(StatusCode::METHOD_NOT_ALLOWED))
}

fn response_builder(status: StatusCode) -> hyper::http::response::Builder {
    Response::builder().status(status)
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

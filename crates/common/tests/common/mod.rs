//! Shared test utilities: an in-process fake of the repository contents API
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use base64::Engine;
use common::repo::{GithubClient, GithubConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const OWNER: &str = "octo";
pub const REPO: &str = "hello";
pub const TOKEN: &str = "test-token";
pub const BRANCH: &str = "main";

const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Repository path, `/` for the root
    pub path: String,
    pub query: Option<String>,
    pub accept: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct RepoState {
    files: BTreeMap<String, (Vec<u8>, String)>,
    requests: Vec<RecordedRequest>,
    forced: Vec<(Method, StatusCode)>,
    revision: u64,
}

impl RepoState {
    fn next_sha(&mut self) -> String {
        self.revision += 1;
        format!("{:040x}", self.revision)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = dir_prefix(path);
        self.files.keys().any(|p| p.starts_with(&prefix))
    }

    fn listing(&self, path: &str) -> Value {
        let prefix = dir_prefix(path);
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        for (file, (content, sha)) in &self.files {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            let (name, value) = match rest.split_once('/') {
                Some((dir, _)) => (
                    dir.to_string(),
                    json!({
                        "name": dir,
                        "path": format!("{}{}", prefix, dir).trim_start_matches('/'),
                        "sha": "0000000000000000000000000000000000000000",
                        "size": 0,
                        "type": "dir",
                        "download_url": null,
                    }),
                ),
                None => (
                    rest.to_string(),
                    json!({
                        "name": rest,
                        "path": file.trim_start_matches('/'),
                        "sha": sha,
                        "size": content.len(),
                        "type": "file",
                        "_links": { "self": format!("/contents{}", file) },
                    }),
                ),
            };
            entries.entry(name).or_insert(value);
        }
        Value::Array(entries.into_values().collect())
    }

    fn object(&self, path: &str) -> Option<Value> {
        let (content, sha) = self.files.get(path)?;
        Some(json!({
            "name": path.rsplit('/').next().unwrap_or_default(),
            "path": path.trim_start_matches('/'),
            "sha": sha,
            "size": content.len(),
            "type": "file",
            "content": wrapped_base64(content),
            "encoding": "base64",
        }))
    }
}

/// Handle to the fake repository's state, shared with the server task
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    state: Arc<Mutex<RepoState>>,
}

impl FakeRepo {
    pub fn insert(&self, path: &str, content: &[u8]) -> String {
        let mut state = self.state.lock();
        let sha = state.next_sha();
        state
            .files
            .insert(path.to_string(), (content.to_vec(), sha.clone()));
        sha
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).map(|(c, _)| c.clone())
    }

    pub fn sha(&self, path: &str) -> Option<String> {
        self.state.lock().files.get(path).map(|(_, s)| s.clone())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    /// Answer the next request with `method` with `status`
    pub fn fail_next(&self, method: Method, status: StatusCode) {
        self.state.lock().forced.push((method, status));
    }
}

pub struct FakeApi {
    pub addr: SocketAddr,
    pub repo: FakeRepo,
}

impl FakeApi {
    pub async fn start() -> Self {
        let repo = FakeRepo::default();
        let router = Router::new().fallback(contents).with_state(repo.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, repo }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> GithubConfig {
        let repo_url = format!("https://github.com/{}/{}", OWNER, REPO);
        let mut config = GithubConfig::new(repo_url, TOKEN);
        config.api_url = self.api_url();
        config.branch = BRANCH.to_string();
        config
    }

    pub fn client(&self) -> GithubClient {
        GithubClient::new(self.config()).unwrap()
    }
}

fn dir_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path.trim_end_matches('/'))
    }
}

/// Base64 wrapped at 60 columns, the way the contents API returns it
fn wrapped_base64(content: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);
    let mut out = String::new();
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % 60 == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out.push('\n');
    out
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn contents(
    State(repo): State<FakeRepo>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let prefix = format!("/repos/{}/{}/contents", OWNER, REPO);
    let Some(rest) = uri.path().strip_prefix(&prefix) else {
        return message(StatusCode::NOT_FOUND, "Not Found");
    };
    let path = if rest.is_empty() {
        "/".to_string()
    } else {
        rest.to_string()
    };

    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let json_body: Option<Value> = serde_json::from_slice(&body).ok();

    let mut state = repo.state.lock();
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        accept: header(ACCEPT),
        authorization: header(AUTHORIZATION),
        body: json_body.clone(),
    });

    let expected = format!("Bearer {}", TOKEN);
    if header(AUTHORIZATION).as_deref() != Some(expected.as_str()) {
        return message(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    if let Some(i) = state.forced.iter().position(|(m, _)| *m == method) {
        let (_, status) = state.forced.remove(i);
        return message(status, "forced failure");
    }

    match method {
        Method::GET => {
            if let Some((content, _)) = state.files.get(&path) {
                if header(ACCEPT).as_deref() == Some(RAW_MEDIA_TYPE) {
                    return (
                        StatusCode::OK,
                        [(CONTENT_TYPE, "application/octet-stream")],
                        content.clone(),
                    )
                        .into_response();
                }
                return match state.object(&path) {
                    Some(object) => Json(object).into_response(),
                    None => message(StatusCode::NOT_FOUND, "Not Found"),
                };
            }
            if path == "/" || state.is_dir(&path) {
                return Json(state.listing(&path)).into_response();
            }
            message(StatusCode::NOT_FOUND, "Not Found")
        }
        Method::PUT => {
            let Some(body) = json_body else {
                return message(StatusCode::BAD_REQUEST, "Problems parsing JSON");
            };
            let sha = body.get("sha").and_then(Value::as_str);
            let current = state.files.get(&path).map(|(_, s)| s.clone());
            match (current.as_deref(), sha) {
                (Some(_), None) => {
                    return message(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "\"sha\" wasn't supplied.",
                    )
                }
                (Some(current), Some(sha)) if current != sha => {
                    return message(StatusCode::CONFLICT, "does not match");
                }
                _ => {}
            }

            let encoded = body.get("content").and_then(Value::as_str).unwrap_or("");
            let Ok(content) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
                return message(StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64");
            };
            let status = if current.is_some() {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            let new_sha = state.next_sha();
            state.files.insert(path.clone(), (content, new_sha));
            (status, Json(json!({ "content": state.object(&path) }))).into_response()
        }
        Method::DELETE => {
            let sha = json_body
                .as_ref()
                .and_then(|b| b.get("sha"))
                .and_then(Value::as_str);
            let Some(current) = state.files.get(&path).map(|(_, s)| s.clone()) else {
                return message(StatusCode::NOT_FOUND, "Not Found");
            };
            if sha != Some(current.as_str()) {
                return message(StatusCode::CONFLICT, "does not match");
            }
            state.files.remove(&path);
            Json(json!({ "content": null })).into_response()
        }
        _ => message(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
    }
}

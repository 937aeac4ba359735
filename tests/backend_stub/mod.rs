use std::collections::HashMap;
use std::io::Read as _;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct StubChapter {
    pub title: String,
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BackendStubConfig {
    pub chapters: Vec<StubChapter>,
    /// Source text to translated text. Anything else gets an `error` field back.
    pub translations: HashMap<String, String>,
    /// Chapter orders that answer with a server error.
    pub failing_chapters: Vec<u32>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
    pub authorization: Option<String>,
}

pub struct BackendStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BackendStub {
    pub fn spawn(config: BackendStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start backend stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/api");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let (path, query) = match url.split_once('?') {
                    Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
                    None => (url.clone(), None),
                };
                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_owned());
                let method = request.method().to_string();
                recorded
                    .lock()
                    .expect("lock recorded requests")
                    .push(RecordedRequest {
                        method: method.clone(),
                        path: path.clone(),
                        query: query.clone(),
                        body: body.clone(),
                        authorization,
                    });

                let (status, payload) = route(&config, &method, &path, query.as_deref(), &body);
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(payload.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock recorded requests").clone()
    }

    /// Bodies of all progress saves, parsed.
    #[allow(dead_code)]
    pub fn progress_saves(&self) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST" && r.path.ends_with("/update_progress/"))
            .map(|r| serde_json::from_str(&r.body).expect("progress body is json"))
            .collect()
    }
}

impl Drop for BackendStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(
    config: &BackendStubConfig,
    method: &str,
    path: &str,
    query: Option<&str>,
    body: &str,
) -> (u16, Value) {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        ("GET", ["api", "books", _, "chapter_content"]) => {
            let order = query
                .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("chapter=")))
                .and_then(|raw| raw.parse::<u32>().ok());
            let Some(order) = order else {
                return (400, serde_json::json!({ "detail": "chapter is required" }));
            };
            if config.failing_chapters.contains(&order) {
                return (500, serde_json::json!({ "detail": "chapter unavailable" }));
            }
            let Some(chapter) = (order as usize)
                .checked_sub(1)
                .and_then(|idx| config.chapters.get(idx))
            else {
                return (404, serde_json::json!({ "detail": "Not found." }));
            };
            (
                200,
                serde_json::json!({
                    "chapter": {
                        "title": chapter.title,
                        "order": order,
                        "content": chapter.content,
                    },
                    "total_chapters": config.chapters.len(),
                }),
            )
        }
        ("POST", ["api", "books", _, "update_progress"]) => {
            match serde_json::from_str::<Value>(body) {
                Ok(value) if value.get("page_number").is_some() => {
                    (200, serde_json::json!({ "status": "ok" }))
                }
                _ => (400, serde_json::json!({ "error": "invalid progress" })),
            }
        }
        ("POST", ["api", "translate"]) => {
            let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
            let text = parsed.get("text").and_then(Value::as_str).unwrap_or("");
            match config.translations.get(text) {
                Some(translated) => (
                    200,
                    serde_json::json!({
                        "original_text": text,
                        "translated_text": translated,
                        "alternatives": [],
                    }),
                ),
                None => (
                    200,
                    serde_json::json!({ "error": format!("no translation for {text}") }),
                ),
            }
        }
        _ => (404, serde_json::json!({ "detail": "Not found." })),
    }
}

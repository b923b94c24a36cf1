//! 测试辅助：进程内的 HTTP 桩服务和内存版能力实现
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, Method, StatusCode, Uri};
use axum::Router;
use batch_url_processor::error::ItemError;
use batch_url_processor::infrastructure::Shutdown;
use batch_url_processor::services::{DuplicateIndex, ExtractionTrigger};
use tokio::net::TcpListener;
use tokio::time::Instant;

/// 桩服务收到的请求，按到达顺序记录
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// 路径加查询串（原样，未解码）
    pub path: String,
    pub body: String,
}

type Handler = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

struct Inner {
    handler: Box<Handler>,
    requests: Mutex<Vec<Recorded>>,
    delay: Duration,
}

/// 进程内 HTTP 桩服务，所有请求都交给同一个处理函数
pub struct StubServer {
    pub base_url: String,
    inner: Arc<Inner>,
}

impl StubServer {
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        Self::spawn_with_delay(Duration::ZERO, handler).await
    }

    /// 每个请求先记录，再等待 `delay` 才响应
    pub async fn spawn_with_delay<F>(delay: Duration, handler: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        let inner = Arc::new(Inner {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            delay,
        });

        let state = inner.clone();
        let app = Router::new().fallback(move |method: Method, uri: Uri, body: String| {
            let state = state.clone();
            async move {
                let request = Recorded {
                    method: method.to_string(),
                    path: uri
                        .path_and_query()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_else(|| uri.path().to_string()),
                    body,
                };
                state.requests.lock().unwrap().push(request.clone());
                tokio::time::sleep(state.delay).await;

                let (status, body) = (state.handler)(&request);
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, inner }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.requests.lock().unwrap().clone()
    }
}

/// 内存版后端
#[derive(Default)]
pub struct MemoryIndex {
    stored: Mutex<HashSet<String>>,
    pub checks: AtomicUsize,
}

impl MemoryIndex {
    pub fn with(urls: &[&str]) -> Self {
        Self {
            stored: Mutex::new(urls.iter().map(|u| u.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn store(&self, url: &str) {
        self.stored.lock().unwrap().insert(url.to_string());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.stored.lock().unwrap().contains(url)
    }
}

#[async_trait]
impl DuplicateIndex for MemoryIndex {
    async fn check_duplicate(&self, url: &str) -> Result<bool, ItemError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.contains(url))
    }
}

/// 触发事件，用于检查批次顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    End(String),
}

/// 模拟扩展：触发后等待片刻，再把链接写入后端
pub struct RecordingTrigger {
    index: Arc<MemoryIndex>,
    work: Duration,
    /// 这些链接永远提取不到数据
    never_persist: HashSet<String>,
    /// 触发时请求停止
    stop_on: Option<String>,
    events: Mutex<Vec<Event>>,
    start_times: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl RecordingTrigger {
    pub fn new(index: &Arc<MemoryIndex>, work: Duration) -> Self {
        Self {
            index: index.clone(),
            work,
            never_persist: HashSet::new(),
            stop_on: None,
            events: Mutex::new(Vec::new()),
            start_times: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never_persist(mut self, urls: &[&str]) -> Self {
        self.never_persist = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn stop_on(mut self, url: &str) -> Self {
        self.stop_on = Some(url.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// 每次触发开始的时间，按发生顺序
    pub fn start_times(&self) -> Vec<Instant> {
        self.start_times.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(url) => Some(url),
                Event::End(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl ExtractionTrigger for RecordingTrigger {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn trigger(&self, url: &str, shutdown: &Shutdown) -> Result<(), ItemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.start_times.lock().unwrap().push(Instant::now());
        self.events.lock().unwrap().push(Event::Start(url.to_string()));

        if self.stop_on.as_deref() == Some(url) {
            shutdown.request();
        }
        let waited = shutdown.sleep(self.work).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event::End(url.to_string()));

        waited?;
        if !self.never_persist.contains(url) {
            self.index.store(url);
        }
        Ok(())
    }
}

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc, unreachable_pub)]
use async_trait::async_trait;
use gomuks_push::adapters::push::{PushError, PushProvider};
use gomuks_push::domain::push::ProviderMessage;
use gomuks_push::server::PushServer;
use gomuks_push::services::dispatcher::PushDispatcher;
use gomuks_push::services::translator::MessageTranslator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub const PUSH_URL_PATH: &str = "/_gomuks/push/fcm";

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("gomuks_push=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

#[derive(Debug, Clone)]
pub enum StubReply {
    MessageId(&'static str),
    Failure(&'static str),
}

/// Provider double that answers every send with the same reply, optionally after a delay.
#[derive(Debug)]
pub struct StubProvider {
    reply: StubReply,
    delay: Duration,
    calls: AtomicUsize,
    abandoned: AtomicUsize,
    sent: Mutex<Vec<ProviderMessage>>,
}

/// Counts sends whose future was dropped before the reply was produced.
struct AbandonGuard<'a> {
    abandoned: &'a AtomicUsize,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl StubProvider {
    pub fn new(reply: StubReply) -> Arc<Self> {
        Self::with_delay(reply, Duration::ZERO)
    }

    pub fn with_delay(reply: StubReply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ProviderMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Waits until at least `count` sends have started.
    pub async fn wait_for_calls(&self, count: usize) {
        let start = std::time::Instant::now();
        while self.calls() < count {
            assert!(start.elapsed() < Duration::from_secs(5), "provider was never called");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits until at least `count` in-flight sends have been dropped.
    pub async fn wait_for_abandoned(&self, count: usize) {
        let start = std::time::Instant::now();
        while self.abandoned() < count {
            assert!(start.elapsed() < Duration::from_secs(5), "in-flight send was never dropped");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl PushProvider for StubProvider {
    async fn send(&self, message: &ProviderMessage) -> Result<String, PushError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(message.clone());
        let mut guard = AbandonGuard { abandoned: &self.abandoned, armed: true };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        guard.armed = false;
        match &self.reply {
            StubReply::MessageId(id) => Ok((*id).to_string()),
            StubReply::Failure(message) => Err(PushError::Other(anyhow::anyhow!(*message))),
        }
    }
}

pub struct TestApp {
    pub server: PushServer,
    pub base_url: String,
    pub client: reqwest::Client,
    pub provider: Arc<StubProvider>,
}

impl TestApp {
    pub async fn spawn(provider: Arc<StubProvider>) -> Self {
        setup_tracing();

        let translator = MessageTranslator::new(Some("app.gomuks.android".into()));
        let dispatcher = Arc::new(PushDispatcher::new(Arc::clone(&provider) as Arc<dyn PushProvider>, translator));
        let server = PushServer::start("127.0.0.1:0", dispatcher).await.unwrap();
        let base_url = format!("http://{}", server.local_addr());

        Self { server, base_url, client: reqwest::Client::new(), provider }
    }

    pub fn push_url(&self) -> String {
        format!("{}{}", self.base_url, PUSH_URL_PATH)
    }

    pub async fn push(&self, body: impl Into<String>) -> reqwest::Response {
        self.client
            .post(self.push_url())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .send()
            .await
            .unwrap()
    }
}

pub fn push_body(payload: &str, high_priority: bool) -> String {
    format!(r#"{{"token":"abc","owner":"u1","payload":"{payload}","high_priority":{high_priority}}}"#)
}

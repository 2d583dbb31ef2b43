//! The sync client: remote-first document access with a local fallback.
//!
//! A [`SyncClient`] talks to the store service over HTTP and keeps a
//! two-state connectivity flag (online/offline) driven solely by the
//! outcome of the most recent call; there is no hysteresis and no backoff.
//! When a [`LocalCache`] is configured, reads fall back to the cached
//! sections and failed saves mirror into the cache before the error
//! propagates.

use crate::cache::LocalCache;
use crate::document::{Ack, Document, SectionPatch, CONFIG_SECTION, CONTACT_REQUESTS_SECTION};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default cadence of the background connectivity poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Client for the shared document endpoint.
///
/// Construct one with [`builder`](Self::builder) at application start and
/// pass it by reference to whoever needs it.
pub struct SyncClient {
    endpoint: String,
    http: reqwest::Client,
    cache: Option<LocalCache>,
    online: AtomicBool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl SyncClient {
    /// Start configuring a client for `endpoint`.
    #[must_use]
    pub fn builder(endpoint: impl Into<String>) -> SyncClientBuilder {
        SyncClientBuilder::new(endpoint)
    }

    // ---- document operations ----

    /// Fetch the full document.
    ///
    /// The request carries a millisecond-timestamp query parameter so no
    /// intermediary serves a stale copy. On failure the client goes
    /// offline and, when a cache is configured, the cached sections come
    /// back in place of the error; without a cache the error propagates.
    pub async fn load(&self) -> Result<Document> {
        match self.fetch().await {
            Ok(doc) => {
                self.set_online(true);
                Ok(doc)
            }
            Err(err) => {
                self.set_online(false);
                match &self.cache {
                    Some(cache) => {
                        tracing::warn!("load failed ({err}), serving cached sections");
                        Ok(cache.document())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Replace the whole remote document.
    ///
    /// `lastModified` is stamped before sending. On failure the stamped
    /// document is mirrored into the cache (when configured) and the error
    /// still propagates; the mirror is a side effect, not a substitute.
    pub async fn save(&self, mut doc: Document) -> Result<()> {
        doc.touch();
        match self.post(&doc).await {
            Ok(()) => {
                self.set_online(true);
                Ok(())
            }
            Err(err) => {
                self.set_online(false);
                if let Some(cache) = &self.cache {
                    tracing::warn!("save failed ({err}), mirroring to cache");
                    if let Err(cache_err) = cache.store_document(&doc) {
                        tracing::error!("cache mirror failed: {cache_err}");
                    }
                }
                Err(err)
            }
        }
    }

    /// Replace one top-level section in place. Failures propagate without
    /// touching the cache; see [`save_config`](Self::save_config) and
    /// friends for the degrading wrappers.
    pub async fn update_section(&self, section: &str, value: Value) -> Result<()> {
        let patch = SectionPatch {
            section: section.to_string(),
            value,
        };
        match self.put(&patch).await {
            Ok(()) => {
                self.set_online(true);
                Ok(())
            }
            Err(err) => {
                self.set_online(false);
                Err(err)
            }
        }
    }

    // ---- section accessors ----

    /// The settings section of the current document.
    pub async fn config(&self) -> Result<Map<String, Value>> {
        Ok(self.load().await?.config)
    }

    /// Replace the settings section, degrading to a full save when the
    /// partial-update path fails.
    pub async fn save_config(&self, config: Map<String, Value>) -> Result<()> {
        if let Err(err) = self
            .update_section(CONFIG_SECTION, Value::Object(config.clone()))
            .await
        {
            tracing::warn!("section update failed ({err}), falling back to full save");
            let mut doc = self.load().await?;
            doc.config = config;
            self.save(doc).await?;
        }
        Ok(())
    }

    /// The contact request list, newest first.
    pub async fn contact_requests(&self) -> Result<Vec<Value>> {
        Ok(self.load().await?.contact_requests)
    }

    /// Replace the contact request list, degrading to a full save when the
    /// partial-update path fails.
    pub async fn save_contact_requests(&self, requests: Vec<Value>) -> Result<()> {
        if let Err(err) = self
            .update_section(CONTACT_REQUESTS_SECTION, Value::Array(requests.clone()))
            .await
        {
            tracing::warn!("section update failed ({err}), falling back to full save");
            let mut doc = self.load().await?;
            doc.contact_requests = requests;
            self.save(doc).await?;
        }
        Ok(())
    }

    /// Prepend a new contact request: the newest entry always sits at the
    /// head of the list. Load-then-save, so two concurrent callers can
    /// lose one entry to the other.
    pub async fn add_contact_request(&self, request: Value) -> Result<()> {
        let mut requests = self.contact_requests().await?;
        requests.insert(0, request);
        self.save_contact_requests(requests).await
    }

    // ---- connectivity ----

    /// One connectivity probe: attempt a load and let it flip the online
    /// flag. The document itself is discarded.
    pub async fn check_connectivity(&self) {
        let _ = self.load().await;
    }

    /// Whether the most recent remote call succeeded.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Snapshot of the client's connection state.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            online: self.is_online(),
            fallback_enabled: self.cache.is_some(),
            endpoint: self.endpoint.clone(),
            last_sync: *self.last_sync.lock(),
        }
    }

    // ---- internal ----

    async fn fetch(&self) -> Result<Document> {
        let url = format!("{}?t={}", self.endpoint, Utc::now().timestamp_millis());
        let response = check_status(self.http.get(&url).send().await?)?;
        Ok(response.json::<Document>().await?)
    }

    async fn post(&self, doc: &Document) -> Result<()> {
        let response = check_status(self.http.post(&self.endpoint).json(doc).send().await?)?;
        let ack: Ack = response.json().await?;
        tracing::debug!("save acknowledged: {}", ack.message);
        Ok(())
    }

    async fn put(&self, patch: &SectionPatch) -> Result<()> {
        let response = check_status(self.http.put(&self.endpoint).json(patch).send().await?)?;
        let ack: Ack = response.json().await?;
        tracing::debug!(section = %patch.section, "update acknowledged: {}", ack.message);
        Ok(())
    }

    fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::Relaxed);
        if was != online {
            if online {
                tracing::info!("endpoint reachable, back online");
            } else {
                tracing::warn!("endpoint unreachable, going offline");
            }
        }
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("endpoint", &self.endpoint)
            .field("online", &self.is_online())
            .field("fallback_enabled", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(Error::Status(response.status().as_u16()))
    }
}

/// Snapshot of the client's connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Whether the most recent remote call succeeded.
    pub online: bool,
    /// Whether a local cache is configured as fallback.
    pub fallback_enabled: bool,
    /// The configured endpoint URL.
    pub endpoint: String,
    /// Time of the last completed sync. Carried for status consumers but
    /// currently never written; wiring it up needs agreement on which
    /// operations count as a sync.
    pub last_sync: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and builds a [`SyncClientHandle`].
///
/// ```rust,no_run
/// use doc_sync::SyncClient;
///
/// # async fn demo() -> doc_sync::Result<()> {
/// let client = SyncClient::builder("http://127.0.0.1:8080/").build()?;
/// let doc = client.load().await?;
/// # Ok(())
/// # }
/// ```
pub struct SyncClientBuilder {
    endpoint: String,
    cache: Option<LocalCache>,
    poll_interval: Duration,
    poll: bool,
}

impl SyncClientBuilder {
    fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cache: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll: true,
        }
    }

    /// Enable local-storage fallback through `cache` (default: disabled).
    #[must_use]
    pub fn cache(mut self, cache: LocalCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cadence of the background connectivity poll (default:
    /// [`DEFAULT_POLL_INTERVAL`]).
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Turn the background poll off entirely. The online flag then only
    /// moves when the caller issues loads and saves.
    #[must_use]
    pub fn poll(mut self, yes: bool) -> Self {
        self.poll = yes;
        self
    }

    /// Build the client and, unless polling is off, start the connectivity
    /// poller. Must be called from within a tokio runtime.
    pub fn build(self) -> Result<SyncClientHandle> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        let client = Arc::new(SyncClient {
            endpoint: self.endpoint,
            http,
            cache: self.cache,
            online: AtomicBool::new(true),
            last_sync: Mutex::new(None),
        });
        let worker = self
            .poll
            .then(|| PollWorker::start(Arc::clone(&client), self.poll_interval));
        Ok(SyncClientHandle {
            inner: client,
            worker,
        })
    }
}

impl std::fmt::Debug for SyncClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("poll_interval", &self.poll_interval)
            .field("poll", &self.poll)
            .field("fallback_enabled", &self.cache.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns the client and its connectivity poller.
///
/// Derefs to [`SyncClient`] so operations can be called directly on it.
/// Dropping the handle stops the poller; [`shutdown`](Self::shutdown) does
/// the same but waits for the task to finish.
pub struct SyncClientHandle {
    inner: Arc<SyncClient>,
    worker: Option<PollWorker>,
}

impl SyncClientHandle {
    /// Stop the connectivity poller and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join().await;
        }
    }
}

impl std::ops::Deref for SyncClientHandle {
    type Target = SyncClient;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for SyncClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.inner, f)
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Background task probing the endpoint on a fixed interval. The first
/// probe fires immediately, then every `interval`. Stops when signalled
/// and aborts if dropped without a signal.
struct PollWorker {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollWorker {
    fn start(client: Arc<SyncClient>, interval: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => client.check_connectivity().await,
                    _ = rx.changed() => break,
                }
            }
        });
        Self {
            shutdown,
            task: Some(task),
        }
    }

    async fn join(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollWorker {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

//! Client side: fetch through the proxy, classify each item, persist.
//!
//! A run is strictly sequential. Each item gets one classification call; a
//! successful analysis is persisted and followed by the pacing delay before
//! the next call. An item whose classification fails is reported as
//! [`RiskTier::Unknown`](crate::risk::RiskTier::Unknown), is not persisted, and
//! the run goes on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::risk::{self, AnalyzedItem, Assessment, RiskSummary};
use crate::store::StoreError;
use crate::types::{TimelineItem, TimelinePage, TimelineUser};
use crate::PipelineError;

/// Pause after each successful analysis.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

const FETCH_PATH: &str = "fetch-twitter";
const ANALYZE_PATH: &str = "analyze-tweet";

/// The two proxy calls a run needs.
#[async_trait]
pub trait ProxyApi: Send + Sync {
    async fn fetch_timeline(&self) -> Result<TimelinePage, PipelineError>;

    /// Raw classifier body for `text`.
    async fn classify(&self, text: &str) -> Result<Value, PipelineError>;
}

/// Document store for analyzed items.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn persist(&self, item: &AnalyzedItem) -> Result<(), StoreError>;

    async fn items_for_user(&self, user_id: &str) -> Result<Vec<AnalyzedItem>, StoreError>;
}

/// Append-only in-process store.
#[derive(Debug, Default)]
pub struct MemoryAnalysisStore {
    items: RwLock<Vec<AnalyzedItem>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn persist(&self, item: &AnalyzedItem) -> Result<(), StoreError> {
        self.items.write().await.push(item.clone());
        Ok(())
    }

    async fn items_for_user(&self, user_id: &str) -> Result<Vec<AnalyzedItem>, StoreError> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// How fresh results are reconciled with what the store already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// One record per item id, the newest `created_at` winning, kept in
    /// first-seen order.
    #[default]
    LatestPerItem,
    /// Show the stored records only when there are more of them than fresh
    /// ones.
    PersistedIfLarger,
}

impl MergePolicy {
    pub fn merge(
        self,
        persisted: Vec<AnalyzedItem>,
        fresh: Vec<AnalyzedItem>,
    ) -> Vec<AnalyzedItem> {
        match self {
            Self::LatestPerItem => latest_per_item(persisted.into_iter().chain(fresh)),
            Self::PersistedIfLarger => {
                if !persisted.is_empty() && persisted.len() > fresh.len() {
                    persisted
                } else {
                    fresh
                }
            }
        }
    }
}

fn latest_per_item(items: impl IntoIterator<Item = AnalyzedItem>) -> Vec<AnalyzedItem> {
    let mut merged: Vec<AnalyzedItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(&item.item_id) {
            Some(&i) => {
                if item.created_at >= merged[i].created_at {
                    merged[i] = item;
                }
            }
            None => {
                index.insert(item.item_id.clone(), merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub delay: Duration,
    pub merge: MergePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            delay: DEFAULT_DELAY,
            merge: MergePolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_merge(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Twitter account the timeline belongs to.
    pub account: TimelineUser,
    /// Items analyzed by this run, in timeline order.
    pub analyzed: Vec<AnalyzedItem>,
    /// Merged view after reconciliation.
    pub items: Vec<AnalyzedItem>,
    pub summary: RiskSummary,
}

pub struct Pipeline {
    proxy: Arc<dyn ProxyApi>,
    store: Arc<dyn AnalysisStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(proxy: Arc<dyn ProxyApi>, store: Arc<dyn AnalysisStore>) -> Self {
        Pipeline {
            proxy,
            store,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze the timeline on behalf of `user_id`.
    ///
    /// Per-item failures are reported as `Unknown` but only successful
    /// analyses are persisted. A failed fetch ends the run with
    /// [`PipelineError::FetchFailed`], which still carries the stored history.
    #[instrument(skip(self))]
    pub async fn run(&self, user_id: &str) -> Result<PipelineReport, PipelineError> {
        let page = match self.proxy.fetch_timeline().await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "timeline fetch failed");
                let stored = self.config.merge.merge(self.stored(user_id).await, Vec::new());
                return Err(PipelineError::FetchFailed {
                    source: Box::new(err),
                    stored,
                });
            }
        };
        info!(count = page.tweets.len(), "timeline fetched");

        let mut analyzed = Vec::with_capacity(page.tweets.len());
        for tweet in &page.tweets {
            let (item, ok) = self.analyze(user_id, tweet).await;
            if ok {
                if let Err(err) = self.store.persist(&item).await {
                    warn!(tweet_id = %item.item_id, error = %err, "failed to persist analysis");
                }
                tokio::time::sleep(self.config.delay).await;
            }
            analyzed.push(item);
        }

        let persisted = self.stored(user_id).await;
        let items = self.config.merge.merge(persisted, analyzed.clone());
        let summary = RiskSummary::from_items(&items);
        info!(
            analyzed = analyzed.len(),
            high = summary.high,
            medium = summary.medium,
            low = summary.low,
            unknown = summary.unknown,
            "analysis finished"
        );

        Ok(PipelineReport {
            account: page.user,
            analyzed,
            items,
            summary,
        })
    }

    async fn stored(&self, user_id: &str) -> Vec<AnalyzedItem> {
        match self.store.items_for_user(user_id).await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "failed to load stored analyses");
                Vec::new()
            }
        }
    }

    async fn analyze(&self, user_id: &str, tweet: &TimelineItem) -> (AnalyzedItem, bool) {
        let assessment = match self.proxy.classify(&tweet.text).await {
            Ok(body) => match risk::parse_scores(&body) {
                Some(scores) => Some(risk::assess(&scores)),
                None => {
                    warn!(tweet_id = %tweet.id, "invalid classifier response");
                    None
                }
            },
            Err(err) => {
                warn!(tweet_id = %tweet.id, error = %err, "classification failed");
                None
            }
        };
        let ok = assessment.is_some();
        let Assessment { tier, reason } = assessment.unwrap_or_else(Assessment::failure);
        debug!(tweet_id = %tweet.id, risk = %tier, "tweet analyzed");

        let item = AnalyzedItem {
            user_id: user_id.to_owned(),
            item_id: tweet.id.clone(),
            text: tweet.text.clone(),
            risk_tier: tier,
            reason,
            created_at: Utc::now(),
        };
        (item, ok)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`ProxyApi`] over HTTP, presenting a session cookie.
#[derive(Debug, Clone)]
pub struct HttpProxyApi {
    inner: reqwest::Client,
    base: Url,
    cookie: Option<String>,
}

impl HttpProxyApi {
    pub fn new(inner: reqwest::Client, base: Url) -> Self {
        HttpProxyApi {
            inner,
            base,
            cookie: None,
        }
    }

    /// `Cookie` header value sent with every call, e.g. `clearpost_session=...`.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, PipelineError> {
        let url = self.base.join(path)?;
        let builder = self.inner.request(method, url);
        Ok(match &self.cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        })
    }
}

#[async_trait]
impl ProxyApi for HttpProxyApi {
    async fn fetch_timeline(&self) -> Result<TimelinePage, PipelineError> {
        let response = self.request(reqwest::Method::GET, FETCH_PATH)?.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PipelineError::Unauthenticated);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::MalformedTimeline(e.to_string()))?;
        if let Ok(ErrorBody { error }) = serde_json::from_value::<ErrorBody>(body.clone()) {
            return Err(PipelineError::Proxy {
                status: status.as_u16(),
                message: error,
            });
        }
        serde_json::from_value(body).map_err(|e| PipelineError::MalformedTimeline(e.to_string()))
    }

    async fn classify(&self, text: &str) -> Result<Value, PipelineError> {
        let response = self
            .request(reqwest::Method::POST, ANALYZE_PATH)?
            .json(&json!({ "text": text }))
            .send()
            .await?;
        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("analysis failed")
                .to_owned();
            return Err(PipelineError::Proxy {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::Instant;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::risk::RiskTier;

    /// Scripted proxy answering `classify` from a queue.
    struct FakeProxy {
        page: Option<TimelinePage>,
        answers: Mutex<Vec<Result<Value, PipelineError>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl FakeProxy {
        fn new(texts: &[&str], answers: Vec<Result<Value, PipelineError>>) -> Self {
            let tweets = texts
                .iter()
                .enumerate()
                .map(|(i, text)| TimelineItem {
                    id: (i + 1).to_string(),
                    text: (*text).to_owned(),
                })
                .collect();
            FakeProxy {
                page: Some(TimelinePage {
                    user: TimelineUser {
                        id: "42".into(),
                        screen_name: "alice".into(),
                    },
                    tweets,
                }),
                answers: Mutex::new(answers.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn unauthenticated() -> Self {
            FakeProxy {
                page: None,
                answers: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProxyApi for FakeProxy {
        async fn fetch_timeline(&self) -> Result<TimelinePage, PipelineError> {
            self.page.clone().ok_or(PipelineError::Unauthenticated)
        }

        async fn classify(&self, text: &str) -> Result<Value, PipelineError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_owned(), Instant::now()));
            self.answers.lock().unwrap().pop().unwrap_or_else(|| Ok(json!([])))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl AnalysisStore for FailingStore {
        async fn persist(&self, _: &AnalyzedItem) -> Result<(), StoreError> {
            Err("store offline".into())
        }

        async fn items_for_user(&self, _: &str) -> Result<Vec<AnalyzedItem>, StoreError> {
            Err("store offline".into())
        }
    }

    fn low() -> Result<Value, PipelineError> {
        Ok(json!([{"label": "toxic", "score": 0.1}]))
    }

    fn high() -> Result<Value, PipelineError> {
        Ok(json!([[{"label": "toxic", "score": 0.95}, {"label": "insult", "score": 0.7}]]))
    }

    fn failed() -> Result<Value, PipelineError> {
        Err(PipelineError::Proxy {
            status: 500,
            message: "AI analysis failed".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn classifies_each_item_once_in_order_with_pacing() {
        let proxy = Arc::new(FakeProxy::new(&["a", "b", "c"], vec![low(), high(), low()]));
        let store = Arc::new(MemoryAnalysisStore::new());
        let pipeline = Pipeline::new(proxy.clone(), store.clone());

        let report = pipeline.run("u1").await.unwrap();

        let calls = proxy.calls();
        let texts: Vec<&str> = calls.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        for pair in calls.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= DEFAULT_DELAY);
        }

        assert_eq!(report.account.screen_name, "alice");
        assert_eq!(report.analyzed[1].risk_tier, RiskTier::High);
        assert_eq!(report.analyzed[1].reason, "Detected: toxic, insult");
        assert_eq!(report.summary.high, 1);
        assert_eq!(report.summary.low, 2);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_item_is_recorded_and_run_continues() {
        let proxy = Arc::new(FakeProxy::new(
            &["a", "b", "c"],
            vec![low(), failed(), Ok(json!({"error": "loading"}))],
        ));
        let store = Arc::new(MemoryAnalysisStore::new());
        let report = Pipeline::new(proxy.clone(), store.clone())
            .run("u1")
            .await
            .unwrap();

        assert_eq!(proxy.calls().len(), 3);
        assert_eq!(report.analyzed[0].risk_tier, RiskTier::Low);
        for item in &report.analyzed[1..] {
            assert_eq!(item.risk_tier, RiskTier::Unknown);
            assert_eq!(item.reason, "AI failure");
        }
        assert_eq!(report.summary.unknown, 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_leave_nothing_in_the_store() {
        let proxy = Arc::new(FakeProxy::new(&["a"], vec![failed()]));
        let store = Arc::new(MemoryAnalysisStore::new());
        let report = Pipeline::new(proxy, store.clone()).run("u").await.unwrap();

        assert!(store.items_for_user("u").await.unwrap().is_empty());
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].risk_tier, RiskTier::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn no_pause_after_a_failure() {
        let proxy = Arc::new(FakeProxy::new(&["a", "b"], vec![failed(), low()]));
        let pipeline = Pipeline::new(proxy.clone(), Arc::new(MemoryAnalysisStore::new()));

        pipeline.run("u1").await.unwrap();

        let calls = proxy.calls();
        assert!(calls[1].1 - calls[0].1 < DEFAULT_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthenticated_fetch_aborts_before_classifying() {
        let proxy = Arc::new(FakeProxy::unauthenticated());
        let store = Arc::new(MemoryAnalysisStore::new());

        let result = Pipeline::new(proxy.clone(), store.clone()).run("u1").await;
        match result {
            Err(PipelineError::FetchFailed { source, stored }) => {
                assert!(matches!(*source, PipelineError::Unauthenticated));
                assert!(stored.is_empty());
            }
            other => panic!("expected a fetch failure, got {other:?}"),
        }
        assert!(proxy.calls().is_empty());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_still_returns_stored_history() {
        let store = Arc::new(MemoryAnalysisStore::new());
        let proxy = Arc::new(FakeProxy::new(&["a"], vec![high()]));
        Pipeline::new(proxy, store.clone()).run("u1").await.unwrap();

        let result = Pipeline::new(Arc::new(FakeProxy::unauthenticated()), store.clone())
            .run("u1")
            .await;
        let Err(PipelineError::FetchFailed { source, stored }) = result else {
            panic!("expected a fetch failure");
        };
        assert!(matches!(*source, PipelineError::Unauthenticated));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].item_id, "1");
        assert_eq!(stored[0].risk_tier, RiskTier::High);
    }

    #[tokio::test(start_paused = true)]
    async fn store_failures_do_not_abort() {
        let proxy = Arc::new(FakeProxy::new(&["a", "b"], vec![low(), low()]));
        let report = Pipeline::new(proxy, Arc::new(FailingStore))
            .run("u1")
            .await
            .unwrap();
        assert_eq!(report.analyzed.len(), 2);
        assert_eq!(report.items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_duplicates_in_store_but_not_in_merged_view() {
        let store = Arc::new(MemoryAnalysisStore::new());
        let run = |answers| {
            let store = store.clone();
            async move {
                let proxy = Arc::new(FakeProxy::new(&["a", "b"], answers));
                Pipeline::new(proxy, store).run("u1").await.unwrap()
            }
        };

        run(vec![low(), low()]).await;
        let second = run(vec![high(), low()]).await;

        assert_eq!(store.len().await, 4);
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.items[0].item_id, "1");
        assert_eq!(second.items[0].risk_tier, RiskTier::High);
        assert_eq!(second.summary.total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persisted_if_larger_prefers_the_bigger_set() {
        let store = Arc::new(MemoryAnalysisStore::new());
        let config = PipelineConfig::default().with_merge(MergePolicy::PersistedIfLarger);

        let proxy = Arc::new(FakeProxy::new(&["a", "b"], vec![low(), low()]));
        Pipeline::new(proxy, store.clone()).run("u1").await.unwrap();

        let proxy = Arc::new(FakeProxy::new(&["a", "b"], vec![high(), high()]));
        let report = Pipeline::new(proxy, store.clone())
            .with_config(config)
            .run("u1")
            .await
            .unwrap();

        assert_eq!(report.items.len(), 4);
        assert_eq!(report.summary.low, 2);
        assert_eq!(report.summary.high, 2);
    }

    #[test]
    fn latest_per_item_keeps_first_seen_order() {
        let at = |secs| chrono::DateTime::from_timestamp(secs, 0).unwrap();
        let item = |id: &str, tier, secs| AnalyzedItem {
            user_id: "u".into(),
            item_id: id.into(),
            text: String::new(),
            risk_tier: tier,
            reason: String::new(),
            created_at: at(secs),
        };
        let merged = MergePolicy::LatestPerItem.merge(
            vec![item("b", RiskTier::Low, 1), item("a", RiskTier::Low, 1)],
            vec![item("a", RiskTier::High, 2), item("c", RiskTier::Medium, 2)],
        );
        let ids: Vec<&str> = merged.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
        assert_eq!(merged[1].risk_tier, RiskTier::High);
    }

    #[tokio::test]
    async fn http_proxy_sends_cookie_and_maps_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fetch-twitter"))
            .and(header("cookie", "sid=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": "42", "screen_name": "alice"},
                "tweets": [{"id": "7", "text": "hi"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/analyze-tweet"))
            .and(body_json(json!({"text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"label": "toxic", "score": 0.2}
            ])))
            .mount(&server)
            .await;

        let api = HttpProxyApi::new(
            reqwest::Client::new(),
            Url::parse(&format!("{}/", server.uri())).unwrap(),
        )
        .with_cookie("sid=abc");

        let page = api.fetch_timeline().await.unwrap();
        assert_eq!(page.tweets[0].id, "7");
        let body = api.classify("hi").await.unwrap();
        assert_eq!(body[0]["label"], "toxic");
    }

    #[tokio::test]
    async fn http_proxy_maps_fetch_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": "Not authenticated with Twitter"})),
            )
            .mount(&server)
            .await;
        let api = HttpProxyApi::new(
            reqwest::Client::new(),
            Url::parse(&format!("{}/", server.uri())).unwrap(),
        );
        assert!(matches!(
            api.fetch_timeline().await,
            Err(PipelineError::Unauthenticated)
        ));

        server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tweets": "nope"})))
            .mount(&server)
            .await;
        assert!(matches!(
            api.fetch_timeline().await,
            Err(PipelineError::MalformedTimeline(_))
        ));
    }
}

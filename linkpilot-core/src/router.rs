// Message routing between the page side (scrapers) and the background side
// (storage). Messages are action-tagged JSON envelopes and every handled
// message produces exactly one response.

use crate::error::{ChannelError, RouterError};
use crate::model::{Backlink, LinkStatus, SiteConfig};
use crate::store::{LocalStore, UpsertOutcome, panic_reason};
use futures::FutureExt;
use futures::future::BoxFuture;
use linkpilot_scanner::{
    KeywordRecord, SubdomainRecord, detect_platform, extract_keyword_from_url,
    extract_keyword_record, extract_subdomains, is_subdomain_page,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub action: String,
    #[serde(default)]
    pub data: Value,
    /// URL of the page that sent the message, when it came from a page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Envelope {
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.into(),
            data,
            origin: None,
        }
    }

    pub fn from_page(mut self, url: impl Into<String>) -> Self {
        self.origin = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn ok_with(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                success: true,
                data: Some(value),
                ..Default::default()
            },
            Err(e) => Self::failure(format!("failed to encode response: {}", e)),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// Known actions. Each has a wire name and, for the core flows, a
/// descriptive alias that is accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    KeywordDataFetched,
    SubdomainDataFetched,
    GetAllKeywords,
    GetAllSubdomains,
    GetPlatform,
    GetKeyword,
    ManualScrapeSubdomains,
    SubmitComment,
    LinkSubmitted,
    SubmitLink,
    FetchKeywordData,
    GetSiteConfig,
    SaveSiteConfig,
    AddBacklink,
    UpdateBacklinkStatus,
    GetAllBacklinks,
    DeleteSubdomain,
    ClearStorage,
    ExportAll,
}

impl Action {
    pub const ALL: [Action; 19] = [
        Action::KeywordDataFetched,
        Action::SubdomainDataFetched,
        Action::GetAllKeywords,
        Action::GetAllSubdomains,
        Action::GetPlatform,
        Action::GetKeyword,
        Action::ManualScrapeSubdomains,
        Action::SubmitComment,
        Action::LinkSubmitted,
        Action::SubmitLink,
        Action::FetchKeywordData,
        Action::GetSiteConfig,
        Action::SaveSiteConfig,
        Action::AddBacklink,
        Action::UpdateBacklinkStatus,
        Action::GetAllBacklinks,
        Action::DeleteSubdomain,
        Action::ClearStorage,
        Action::ExportAll,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Action::KeywordDataFetched => "keyword_data_fetched",
            Action::SubdomainDataFetched => "subdomain_data_fetched",
            Action::GetAllKeywords => "get_all_keywords",
            Action::GetAllSubdomains => "get_all_subdomains",
            Action::GetPlatform => "get_platform",
            Action::GetKeyword => "get_keyword",
            Action::ManualScrapeSubdomains => "manual_scrape_subdomains",
            Action::SubmitComment => "submit_comment",
            Action::LinkSubmitted => "link_submitted",
            Action::SubmitLink => "submit_link",
            Action::FetchKeywordData => "fetch_keyword_data",
            Action::GetSiteConfig => "get_site_config",
            Action::SaveSiteConfig => "save_site_config",
            Action::AddBacklink => "add_backlink",
            Action::UpdateBacklinkStatus => "update_backlink_status",
            Action::GetAllBacklinks => "get_all_backlinks",
            Action::DeleteSubdomain => "delete_subdomain",
            Action::ClearStorage => "clear_storage",
            Action::ExportAll => "export_all",
        }
    }

    pub fn alias(&self) -> Option<&'static str> {
        match self {
            Action::KeywordDataFetched => Some("capture-keyword-data"),
            Action::SubdomainDataFetched => Some("capture-subdomain-batch"),
            Action::GetAllKeywords => Some("list-all-keywords"),
            Action::GetAllSubdomains => Some("list-all-subdomains"),
            Action::GetPlatform => Some("get-current-platform"),
            Action::GetKeyword => Some("get-current-keyword"),
            Action::ManualScrapeSubdomains => Some("manual-trigger-subdomain-scrape"),
            Action::SubmitComment => Some("submit-comment-simulated"),
            Action::LinkSubmitted => Some("link-submission-result-simulated"),
            _ => None,
        }
    }

    /// Look an action up by wire name or alias.
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|action| action.wire_name() == name || action.alias() == Some(name))
    }
}

/// What a router does with an action it has no handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedPolicy {
    /// Produce no response, leaving the message to other listeners.
    Ignore,
    /// Answer with a failure response.
    Reject,
}

pub type Handler =
    Arc<dyn Fn(Envelope) -> BoxFuture<'static, Result<Response, RouterError>> + Send + Sync>;

/// Dispatches envelopes to handlers by exact action name.
pub struct Router {
    name: &'static str,
    handlers: HashMap<String, Handler>,
    policy: UnmatchedPolicy,
}

impl Router {
    pub fn new(name: &'static str, policy: UnmatchedPolicy) -> Self {
        Self {
            name,
            handlers: HashMap::new(),
            policy,
        }
    }

    /// Register a handler under an arbitrary action name.
    pub fn on<F, Fut>(mut self, action: &str, handler: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, RouterError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |envelope| handler(envelope).boxed());
        self.handlers.insert(action.to_string(), handler);
        self
    }

    /// Register a handler under an action's wire name and its alias.
    pub fn on_action<F, Fut>(mut self, action: Action, handler: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, RouterError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |envelope| handler(envelope).boxed());
        if let Some(alias) = action.alias() {
            self.handlers.insert(alias.to_string(), handler.clone());
        }
        self.handlers.insert(action.wire_name().to_string(), handler);
        self
    }

    pub fn handles(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Run the handler for an envelope.
    ///
    /// Handler errors and panics become failure responses. `None` only for
    /// unmatched actions under `UnmatchedPolicy::Ignore`.
    pub async fn dispatch(&self, envelope: Envelope) -> Option<Response> {
        let action = envelope.action.clone();
        let Some(handler) = self.handlers.get(&action).cloned() else {
            return match self.policy {
                UnmatchedPolicy::Ignore => {
                    debug!("[{}] ignoring unknown action '{}'", self.name, action);
                    None
                }
                UnmatchedPolicy::Reject => {
                    warn!("[{}] rejecting unknown action '{}'", self.name, action);
                    Some(Response::failure(format!("unknown action: {}", action)))
                }
            };
        };

        debug!("[{}] dispatching '{}'", self.name, action);
        let outcome = AssertUnwindSafe(async move { handler(envelope).await })
            .catch_unwind()
            .await;

        Some(match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("[{}] '{}' failed: {}", self.name, action, e);
                Response::failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic_reason(panic);
                error!("[{}] '{}' panicked: {}", self.name, action, reason);
                Response::failure(format!("handler panicked: {}", reason))
            }
        })
    }
}

type Delivery = (Envelope, oneshot::Sender<Option<Response>>);

/// Channel front for a router running on its own task. Cloneable; each
/// message is handled on a separate task.
#[derive(Clone)]
pub struct RouterService {
    tx: mpsc::Sender<Delivery>,
}

impl RouterService {
    /// Spawn the router onto the current tokio runtime.
    pub fn spawn(router: Router) -> Self {
        let (tx, mut rx) = mpsc::channel::<Delivery>(256);
        let router = Arc::new(router);

        tokio::spawn(async move {
            info!("Router '{}' listening", router.name);
            while let Some((envelope, reply)) = rx.recv().await {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let response = router.dispatch(envelope).await;
                    if reply.send(response).is_err() {
                        debug!("Sender went away before the response");
                    }
                });
            }
            debug!("Router '{}' stopped", router.name);
        });

        Self { tx }
    }

    /// Deliver an envelope and wait for the router's answer, which is `None`
    /// when the router ignored it.
    pub async fn send(&self, envelope: Envelope) -> Result<Option<Response>, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((envelope, reply_tx))
            .await
            .map_err(|_| ChannelError::NoListener)?;
        reply_rx.await.map_err(|_| ChannelError::Closed)
    }

    /// Like `send`, but an ignored message counts as having no listener.
    pub async fn request(&self, envelope: Envelope) -> Result<Response, ChannelError> {
        self.send(envelope).await?.ok_or(ChannelError::NoListener)
    }
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, RouterError> {
    serde_json::from_value(envelope.data.clone())
        .map_err(|e| RouterError::bad_payload(&envelope.action, e))
}

fn string_field(envelope: &Envelope, field: &str) -> Result<String, RouterError> {
    envelope
        .data
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RouterError::bad_payload(&envelope.action, format!("missing '{}'", field)))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    id: String,
    status: LinkStatus,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionResult {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Router for the storage side. Unknown actions are rejected.
pub fn background_router(store: LocalStore) -> Router {
    Router::new("background", UnmatchedPolicy::Reject)
        .on_action(Action::KeywordDataFetched, with_store(&store, keyword_data_fetched))
        .on_action(Action::SubdomainDataFetched, with_store(&store, subdomain_data_fetched))
        .on_action(Action::GetAllKeywords, with_store(&store, get_all_keywords))
        .on_action(Action::GetAllSubdomains, with_store(&store, get_all_subdomains))
        .on_action(Action::GetAllBacklinks, with_store(&store, get_all_backlinks))
        .on_action(Action::AddBacklink, with_store(&store, add_backlink))
        .on_action(Action::UpdateBacklinkStatus, with_store(&store, update_backlink_status))
        .on_action(Action::LinkSubmitted, with_store(&store, link_submitted))
        .on_action(Action::SubmitLink, submit_link)
        .on_action(Action::GetSiteConfig, with_store(&store, get_site_config))
        .on_action(Action::SaveSiteConfig, with_store(&store, save_site_config))
        .on_action(Action::DeleteSubdomain, with_store(&store, delete_subdomain))
        .on_action(Action::ClearStorage, with_store(&store, clear_storage))
        .on_action(Action::ExportAll, with_store(&store, export_all))
}

fn with_store<F, Fut>(
    store: &LocalStore,
    handler: F,
) -> impl Fn(Envelope) -> Fut + Send + Sync + 'static
where
    F: Fn(LocalStore, Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, RouterError>> + Send + 'static,
{
    let store = store.clone();
    move |envelope| handler(store.clone(), envelope)
}

async fn keyword_data_fetched(store: LocalStore, envelope: Envelope) -> Result<Response, RouterError> {
    let mut record: KeywordRecord = payload(&envelope)?;
    if record.source_url.is_none() {
        record.source_url = envelope.origin.clone();
    }
    info!("Saving keyword '{}' from {}", record.keyword, record.platform());
    let outcome = match store.save_keyword(record).await? {
        UpsertOutcome::Added => "added",
        UpsertOutcome::Updated => "updated",
    };
    Ok(Response::ok_with(json!({ "outcome": outcome })))
}

async fn subdomain_data_fetched(
    store: LocalStore,
    envelope: Envelope,
) -> Result<Response, RouterError> {
    let records: Vec<SubdomainRecord> = payload(&envelope)?;
    let count = records.len();
    let outcome = store.add_subdomains_batch(records).await?;
    Ok(Response::ok_with(json!({
        "added": outcome.added,
        "duplicates": outcome.updated,
    }))
    .with_count(count))
}

async fn get_all_keywords(store: LocalStore, _: Envelope) -> Result<Response, RouterError> {
    let keywords: Vec<KeywordRecord> = store.list().await?;
    let count = keywords.len();
    Ok(Response::ok_with(keywords).with_count(count))
}

async fn get_all_subdomains(store: LocalStore, _: Envelope) -> Result<Response, RouterError> {
    let subdomains: Vec<SubdomainRecord> = store.list().await?;
    let count = subdomains.len();
    Ok(Response::ok_with(subdomains).with_count(count))
}

async fn get_all_backlinks(store: LocalStore, _: Envelope) -> Result<Response, RouterError> {
    let backlinks: Vec<Backlink> = store.list().await?;
    let count = backlinks.len();
    Ok(Response::ok_with(backlinks).with_count(count))
}

async fn add_backlink(store: LocalStore, envelope: Envelope) -> Result<Response, RouterError> {
    let backlink: Backlink = payload(&envelope)?;
    store.add_backlink(backlink).await?;
    Ok(Response::ok())
}

async fn update_backlink_status(
    store: LocalStore,
    envelope: Envelope,
) -> Result<Response, RouterError> {
    let update: StatusUpdate = payload(&envelope)?;
    let found = store
        .update_backlink_status(update.id, update.status, update.error)
        .await?;
    Ok(Response::ok_with(found))
}

async fn link_submitted(store: LocalStore, envelope: Envelope) -> Result<Response, RouterError> {
    info!("Link submission result: {}", envelope.data);
    let result: SubmissionResult = payload(&envelope)?;
    if let Some(id) = result.id {
        let status = if result.success {
            LinkStatus::Success
        } else {
            LinkStatus::Failed
        };
        store.update_backlink_status(id, status, result.error).await?;
    }
    Ok(Response::ok())
}

async fn submit_link(envelope: Envelope) -> Result<Response, RouterError> {
    info!("Simulated link submission: {}", envelope.data);
    Ok(Response::ok())
}

async fn get_site_config(store: LocalStore, _: Envelope) -> Result<Response, RouterError> {
    Ok(Response::ok_with(store.site_config().await?))
}

async fn save_site_config(store: LocalStore, envelope: Envelope) -> Result<Response, RouterError> {
    let config: SiteConfig = payload(&envelope)?;
    store.save_site_config(config).await?;
    Ok(Response::ok())
}

async fn delete_subdomain(store: LocalStore, envelope: Envelope) -> Result<Response, RouterError> {
    // Accepts {"domain": "..."} or a bare string
    let domain = match string_field(&envelope, "domain") {
        Ok(domain) => domain,
        Err(_) => payload::<String>(&envelope)?,
    };
    let found = store.delete_subdomain(domain).await?;
    Ok(Response::ok_with(found))
}

async fn clear_storage(store: LocalStore, _: Envelope) -> Result<Response, RouterError> {
    store.clear_all().await?;
    Ok(Response::ok())
}

async fn export_all(store: LocalStore, _: Envelope) -> Result<Response, RouterError> {
    Ok(Response::ok_with(store.export_all().await?))
}

/// The page a page router answers for.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    pub url: String,
    pub html: String,
}

impl PageContext {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// Router for one analytics page. Scraped data is forwarded to `background`.
/// Unknown actions are ignored so other listeners may answer them.
pub fn page_router(page: PageContext, background: RouterService) -> Router {
    let page = PageHandle {
        page: Arc::new(page),
        background,
    };

    Router::new("page", UnmatchedPolicy::Ignore)
        .on_action(Action::GetPlatform, page.with(get_platform))
        .on_action(Action::GetKeyword, page.with(get_keyword))
        .on_action(Action::FetchKeywordData, page.with(fetch_keyword_data))
        .on_action(Action::ManualScrapeSubdomains, page.with(manual_scrape_subdomains))
        .on_action(Action::SubmitComment, page.with(submit_comment))
}

/// What a page handler gets to work with.
#[derive(Clone)]
struct PageHandle {
    page: Arc<PageContext>,
    background: RouterService,
}

impl PageHandle {
    fn with<F, Fut>(&self, handler: F) -> impl Fn(Envelope) -> Fut + Send + Sync + 'static
    where
        F: Fn(PageHandle, Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, RouterError>> + Send + 'static,
    {
        let handle = self.clone();
        move |envelope| handler(handle.clone(), envelope)
    }

    /// Send to the background and turn a failure response into an error.
    async fn forward(&self, action: Action, data: Value) -> Result<Response, RouterError> {
        let envelope = Envelope::new(action.wire_name(), data).from_page(self.page.url.clone());
        let response = self.background.request(envelope).await?;
        if response.success {
            Ok(response)
        } else {
            Err(RouterError::Refused(response.error.unwrap_or_else(|| {
                format!("background rejected '{}'", action.wire_name())
            })))
        }
    }
}

async fn get_platform(handle: PageHandle, _: Envelope) -> Result<Response, RouterError> {
    Ok(Response::ok_with(detect_platform(&handle.page.url)))
}

async fn get_keyword(handle: PageHandle, _: Envelope) -> Result<Response, RouterError> {
    Ok(Response::ok_with(extract_keyword_from_url(&handle.page.url)))
}

async fn fetch_keyword_data(handle: PageHandle, envelope: Envelope) -> Result<Response, RouterError> {
    let record = extract_keyword_record(&handle.page.html, &handle.page.url)?;
    let data = serde_json::to_value(&record)
        .map_err(|e| RouterError::bad_payload(&envelope.action, e))?;
    handle.forward(Action::KeywordDataFetched, data).await?;
    Ok(Response::ok_with(record))
}

async fn manual_scrape_subdomains(
    handle: PageHandle,
    envelope: Envelope,
) -> Result<Response, RouterError> {
    if !is_subdomain_page(&handle.page.url) {
        return Err(RouterError::Refused(
            "current page is not the subfolder/subdomain report".to_string(),
        ));
    }
    let records = extract_subdomains(&handle.page.html, &handle.page.url)?;
    if records.is_empty() {
        return Err(RouterError::Refused(
            "no subfolder/subdomain rows found".to_string(),
        ));
    }

    let count = records.len();
    let data = serde_json::to_value(&records)
        .map_err(|e| RouterError::bad_payload(&envelope.action, e))?;
    let response = handle.forward(Action::SubdomainDataFetched, data).await?;
    Ok(Response {
        data: response.data,
        ..Response::ok().with_count(count)
    })
}

async fn submit_comment(handle: PageHandle, envelope: Envelope) -> Result<Response, RouterError> {
    let id = envelope.data.get("id").cloned().unwrap_or(Value::Null);
    let result = Envelope::new(
        Action::LinkSubmitted.wire_name(),
        json!({ "id": id, "success": true }),
    )
    .from_page(handle.page.url.clone());

    // The comment counts as submitted even when nobody records the result
    if let Err(e) = handle.background.send(result).await {
        warn!("Could not report link submission: {}", e);
    }
    Ok(Response::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_and_aliases() {
        assert_eq!(
            Action::from_name("capture-subdomain-batch"),
            Some(Action::SubdomainDataFetched)
        );
        assert_eq!(
            Action::from_name("keyword_data_fetched"),
            Some(Action::KeywordDataFetched)
        );
        assert_eq!(Action::from_name("submit-link"), None);
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let value = serde_json::to_value(Response::ok().with_count(3)).unwrap();
        assert_eq!(value, json!({"success": true, "count": 3}));

        let value = serde_json::to_value(Response::failure("nope")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "nope"}));
    }

    #[tokio::test]
    async fn test_unmatched_policies() {
        let ignore = Router::new("t", UnmatchedPolicy::Ignore);
        assert_eq!(ignore.dispatch(Envelope::new("nothing", Value::Null)).await, None);

        let reject = Router::new("t", UnmatchedPolicy::Reject);
        let response = reject
            .dispatch(Envelope::new("nothing", Value::Null))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("unknown action: nothing"));
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_failure() {
        let router = Router::new("t", UnmatchedPolicy::Reject).on("boom", |_| async {
            if true {
                panic!("kaboom");
            }
            Ok::<_, RouterError>(Response::ok())
        });
        let response = router.dispatch(Envelope::new("boom", Value::Null)).await.unwrap();
        assert!(!response.success);
        assert!(response.error.unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_alias_reaches_same_handler() {
        let router = Router::new("t", UnmatchedPolicy::Reject)
            .on_action(Action::GetAllKeywords, |_| async {
                Ok::<_, RouterError>(Response::ok().with_count(0))
            });
        assert!(router.handles("get_all_keywords"));
        assert!(router.handles("list-all-keywords"));
        let response = router
            .dispatch(Envelope::new("list-all-keywords", Value::Null))
            .await
            .unwrap();
        assert_eq!(response.count, Some(0));
    }
}

// Page readiness polling
//
// Analytics pages render their tables client side, so a page is only worth
// scraping once one of the expected elements shows up in its HTML.

use crate::error::{Result, ScanError};
use reqwest::Client;
use scraper::{Html, Selector};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Something that can produce the current HTML of a page.
pub trait PageSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<String>> + Send;

    /// Human readable origin, used in log lines.
    fn describe(&self) -> String;
}

/// Fetches the page over HTTP on every poll.
pub struct HttpPageSource {
    client: Client,
    url: String,
}

impl HttpPageSource {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let url = url.into();
        url::Url::parse(&url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, url })
    }
}

impl PageSource for HttpPageSource {
    async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// HTML that is already in memory, e.g. a page saved from the browser.
pub struct StaticPageSource {
    html: String,
    origin: String,
}

impl StaticPageSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            origin: "<memory>".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self {
            html,
            origin: path.display().to_string(),
        })
    }
}

impl PageSource for StaticPageSource {
    async fn fetch(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    fn describe(&self) -> String {
        self.origin.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// HTML of the first poll that contained an expected element.
    Found(String),
    TimedOut { attempts: u32 },
}

impl Readiness {
    pub fn into_html(self) -> Result<String> {
        match self {
            Readiness::Found(html) => Ok(html),
            Readiness::TimedOut { attempts } => Err(ScanError::Timeout(attempts)),
        }
    }
}

/// Polls a page source until any of the expected selectors matches.
pub struct ReadinessProbe {
    selectors: Vec<Selector>,
    timeout: Duration,
    interval: Duration,
}

impl ReadinessProbe {
    pub fn new(expected: &[&str], timeout: Duration, interval: Duration) -> Self {
        let selectors = expected
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!("Ignoring invalid readiness selector '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        Self {
            selectors,
            timeout,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Whether the HTML already contains one of the expected elements.
    ///
    /// With no usable selectors every non-empty page counts as ready.
    pub fn is_ready(&self, html: &str) -> bool {
        if self.selectors.is_empty() {
            return !html.trim().is_empty();
        }
        let document = Html::parse_document(html);
        self.selectors
            .iter()
            .any(|selector| document.select(selector).next().is_some())
    }

    /// Poll until ready or until the timeout elapses. Fetch failures count as
    /// a not-ready poll.
    pub async fn wait<S: PageSource>(&self, source: &S) -> Readiness {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match source.fetch().await {
                Ok(html) if self.is_ready(&html) => {
                    info!(
                        "{} ready after {} attempt(s) ({:?})",
                        source.describe(),
                        attempts,
                        started.elapsed()
                    );
                    return Readiness::Found(html);
                }
                Ok(_) => debug!("{} not ready (attempt {})", source.describe(), attempts),
                Err(e) => warn!("Fetching {} failed: {}", source.describe(), e),
            }

            if started.elapsed() + self.interval >= self.timeout {
                warn!(
                    "{} not ready after {} attempt(s)",
                    source.describe(),
                    attempts
                );
                return Readiness::TimedOut { attempts };
            }
            sleep(self.interval).await;
        }
    }
}

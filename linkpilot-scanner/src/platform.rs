use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

/// Marker contained in the URL of the subfolder/subdomain traffic report.
pub const SUBDOMAIN_PAGE_MARKER: &str = "sem.3ue.co/analytics/traffic/subfolders-subdomains";

/// Analytics platform a record was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ahrefs,
    Custom,
    Unknown,
    Sim3ue,
    Sumrush,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ahrefs => "ahrefs",
            Platform::Custom => "custom",
            Platform::Unknown => "unknown",
            Platform::Sim3ue => "sim3ue",
            Platform::Sumrush => "sumrush",
        }
    }

    /// Lenient parse: anything unrecognised maps to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ahrefs" => Platform::Ahrefs,
            "custom" => Platform::Custom,
            "sim3ue" => Platform::Sim3ue,
            "sumrush" => Platform::Sumrush,
            _ => Platform::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Platform::parse(&raw))
    }
}

/// Detect the platform from the page's hostname
pub fn detect_platform(page_url: &str) -> Platform {
    let host = match Url::parse(page_url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(_) => return Platform::Unknown,
    };

    let platform = if host.contains("ahrefs") {
        Platform::Ahrefs
    } else if host.contains("sim.3ue.co") {
        Platform::Sim3ue
    } else if host.contains("sem.3ue.co") {
        Platform::Sumrush
    } else {
        Platform::Unknown
    };
    debug!("Detected platform {} for host {}", platform, host);
    platform
}

/// Whether the URL points at the subfolder/subdomain traffic report
pub fn is_subdomain_page(page_url: &str) -> bool {
    page_url.contains(SUBDOMAIN_PAGE_MARKER)
}

/// Pull the `keyword=` parameter out of the URL fragment.
///
/// Analytics pages keep their state in the fragment
/// (`#/overview?db=us&keyword=running%20shoes`), so the query string is not
/// consulted.
pub fn extract_keyword_from_url(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let fragment = parsed.fragment()?;
    let start = fragment.find("keyword=")?;

    url::form_urlencoded::parse(fragment[start..].as_bytes())
        .find(|(name, _)| name == "keyword")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

use linkpilot_scanner::{KeywordRecord, Platform, SubdomainRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// Storage keys of the four persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Backlinks,
    SiteConfig,
    Keywords,
    Subdomains,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Backlinks,
        Collection::SiteConfig,
        Collection::Keywords,
        Collection::Subdomains,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Collection::Backlinks => "backlinks",
            Collection::SiteConfig => "site_config",
            Collection::Keywords => "keywords",
            Collection::Subdomains => "subdomains",
        }
    }

    /// Value a collection holds before anything is written to it.
    pub fn default_value(&self) -> Value {
        match self {
            Collection::SiteConfig => json!(SiteConfig::default()),
            _ => Value::Array(Vec::new()),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A record kept in one of the list collections.
///
/// `created_at`/`updated_at` are stamped by the store on every upsert.
pub trait StoredRecord: Serialize + for<'de> Deserialize<'de> + Send + 'static {
    const COLLECTION: Collection;

    fn created_at(&self) -> i64;
    fn updated_at(&self) -> i64;
    fn set_timestamps(&mut self, created_at: i64, updated_at: i64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Pending,
    Submitted,
    Success,
    Failed,
    Ignored,
}

impl LinkStatus {
    pub const ALL: [LinkStatus; 5] = [
        LinkStatus::Pending,
        LinkStatus::Submitted,
        LinkStatus::Success,
        LinkStatus::Failed,
        LinkStatus::Ignored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Pending => "pending",
            LinkStatus::Submitted => "submitted",
            LinkStatus::Success => "success",
            LinkStatus::Failed => "failed",
            LinkStatus::Ignored => "ignored",
        }
    }
}

impl FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Invalid link status: {}", s))
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Blog,
    Forum,
    Directory,
    Paid,
    #[default]
    Other,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Blog => "blog",
            LinkType::Forum => "forum",
            LinkType::Directory => "directory",
            LinkType::Paid => "paid",
            LinkType::Other => "other",
        }
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blog" => Ok(LinkType::Blog),
            "forum" => Ok(LinkType::Forum),
            "directory" => Ok(LinkType::Directory),
            "paid" => Ok(LinkType::Paid),
            "other" => Ok(LinkType::Other),
            _ => Err(format!("Invalid link type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backlink {
    pub id: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub target_url: String,
    #[serde(rename = "type", default)]
    pub link_type: LinkType,
    #[serde(default = "unknown_platform")]
    pub platform: Platform,
    #[serde(default)]
    pub nofollow: bool,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn unknown_platform() -> Platform {
    Platform::Unknown
}

impl Backlink {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            anchor: String::new(),
            target_url: String::new(),
            link_type: LinkType::default(),
            platform: Platform::Unknown,
            nofollow: false,
            status: LinkStatus::default(),
            comment: None,
            error: None,
            tags: None,
            industry: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl StoredRecord for Backlink {
    const COLLECTION: Collection = Collection::Backlinks;

    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: i64, updated_at: i64) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}

impl StoredRecord for SubdomainRecord {
    const COLLECTION: Collection = Collection::Subdomains;

    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: i64, updated_at: i64) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}

// Keyword records carry a single capture time, which acts as their update
// stamp; the first capture time is not kept.
impl StoredRecord for KeywordRecord {
    const COLLECTION: Collection = Collection::Keywords;

    fn created_at(&self) -> i64 {
        self.captured_at
    }
    fn updated_at(&self) -> i64 {
        self.captured_at
    }
    fn set_timestamps(&mut self, _created_at: i64, updated_at: i64) {
        self.captured_at = updated_at;
    }
}

/// Dedup key of a keyword record: the same keyword may be stored once per
/// platform.
pub fn keyword_key(record: &KeywordRecord) -> String {
    format!("{}\u{1f}{}", record.keyword, record.platform())
}

pub fn subdomain_key(record: &SubdomainRecord) -> String {
    record.domain.clone()
}

pub fn backlink_key(record: &Backlink) -> String {
    record.id.clone()
}

/// The site being promoted. Stored as a single value, not a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub domain: String,
    pub tags: Vec<String>,
    pub industry: String,
}

impl SiteConfig {
    /// Add a tag, keeping insertion order. Returns false for blank or
    /// already present tags.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}

/// Every collection at once, as produced by a full export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSnapshot {
    pub backlinks: Vec<Backlink>,
    pub site_config: SiteConfig,
    pub keywords: Vec<KeywordRecord>,
    pub subdomains: Vec<SubdomainRecord>,
}

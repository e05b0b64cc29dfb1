use crate::platform::Platform;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// A captured keyword together with its platform-specific metrics.
///
/// On the wire this is a single flat JSON object discriminated by its
/// `platform` field, e.g. `{"keyword": "...", "platform": "sim3ue",
/// "captured_at": 0, "volume": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRecord {
    pub keyword: String,
    pub captured_at: i64,
    pub source_url: Option<String>,
    pub metrics: KeywordMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeywordMetrics {
    Sim3ue(Sim3ueMetrics),
    Sumrush(SumrushMetrics),
    Generic(Platform, GenericMetrics),
}

impl KeywordMetrics {
    pub fn platform(&self) -> Platform {
        match self {
            KeywordMetrics::Sim3ue(_) => Platform::Sim3ue,
            KeywordMetrics::Sumrush(_) => Platform::Sumrush,
            KeywordMetrics::Generic(platform, _) => *platform,
        }
    }

    pub fn trends(&self) -> Option<&TrendChart> {
        match self {
            KeywordMetrics::Sim3ue(m) => m.trends.as_ref(),
            KeywordMetrics::Sumrush(m) => m.trends.as_ref(),
            KeywordMetrics::Generic(..) => None,
        }
    }
}

impl KeywordRecord {
    pub fn new(keyword: impl Into<String>, metrics: KeywordMetrics) -> Self {
        Self {
            keyword: keyword.into(),
            captured_at: now_millis(),
            source_url: None,
            metrics,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn platform(&self) -> Platform {
        self.metrics.platform()
    }
}

const BASE_FIELDS: [&str; 4] = ["keyword", "platform", "captured_at", "source_url"];

impl Serialize for KeywordRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let metrics = match &self.metrics {
            KeywordMetrics::Sim3ue(m) => serde_json::to_value(m),
            KeywordMetrics::Sumrush(m) => serde_json::to_value(m),
            KeywordMetrics::Generic(_, m) => serde_json::to_value(m),
        }
        .map_err(S::Error::custom)?;

        let mut object = match metrics {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("keyword".into(), Value::String(self.keyword.clone()));
        object.insert("platform".into(), Value::String(self.platform().as_str().into()));
        object.insert("captured_at".into(), Value::from(self.captured_at));
        if let Some(ref source_url) = self.source_url {
            object.insert("source_url".into(), Value::String(source_url.clone()));
        }

        object.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeywordRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut object = Map::<String, Value>::deserialize(deserializer)?;

        let keyword = match object.get("keyword") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(D::Error::missing_field("keyword")),
        };
        let platform = object
            .get("platform")
            .and_then(Value::as_str)
            .map(Platform::parse)
            .unwrap_or(Platform::Unknown);
        let captured_at = object
            .get("captured_at")
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let source_url = object
            .get("source_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        for field in BASE_FIELDS {
            object.remove(field);
        }
        let rest = Value::Object(object);

        let metrics = match platform {
            Platform::Sim3ue => {
                KeywordMetrics::Sim3ue(serde_json::from_value(rest).map_err(D::Error::custom)?)
            }
            Platform::Sumrush => {
                KeywordMetrics::Sumrush(serde_json::from_value(rest).map_err(D::Error::custom)?)
            }
            other => KeywordMetrics::Generic(
                other,
                serde_json::from_value(rest).map_err(D::Error::custom)?,
            ),
        };

        Ok(KeywordRecord {
            keyword,
            captured_at,
            source_url,
            metrics,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sim3ueMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_through_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<DeviceSplit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendChart>,
    pub related_keywords: Vec<Sim3ueRelatedKeyword>,
    pub top_competitors: Vec<Sim3ueCompetitor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sim3ueRelatedKeyword {
    pub keyword: String,
    pub volume: String,
    pub click_through_rate: String,
    pub kd: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sim3ueCompetitor {
    pub website: String,
    pub clicks: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SumrushMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    pub difficulty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    /// Country code to displayed search volume.
    pub country_distribution: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendChart>,
    pub related_keywords: Vec<SumrushRelatedKeyword>,
    pub top_competitors: Vec<SumrushCompetitor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SumrushRelatedKeyword {
    pub keyword: String,
    pub volume: String,
    pub difficulty: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SumrushCompetitor {
    pub website: String,
    pub traffic: String,
}

/// Metrics for platforms without a dedicated extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSplit {
    pub desktop: String,
    pub mobile: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrendChart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_base64: Option<String>,
}

/// One row of the subfolder/subdomain traffic report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubdomainRecord {
    pub domain: String,
    pub link: String,
    pub traffic: String,
    pub desktop_share: String,
    pub mobile_share: String,
    pub is_subdomain: bool,
    pub parent_domain: String,
    #[serde(rename = "created_at")]
    pub created_at: i64,
    #[serde(rename = "updated_at")]
    pub updated_at: i64,
}

impl SubdomainRecord {
    /// Build a record from raw row values. Links without a scheme are
    /// assumed to be https.
    pub fn new(
        domain: impl Into<String>,
        link: &str,
        traffic: impl Into<String>,
        desktop_share: impl Into<String>,
        mobile_share: impl Into<String>,
    ) -> Self {
        let link = if link.starts_with("http") {
            link.to_string()
        } else {
            format!("https://{}", link)
        };
        let (is_subdomain, parent_domain) = classify_host(&link);
        let now = now_millis();

        Self {
            domain: domain.into(),
            link,
            traffic: traffic.into(),
            desktop_share: desktop_share.into(),
            mobile_share: mobile_share.into(),
            is_subdomain,
            parent_domain,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Decide whether a link is a subdomain or a subfolder and find its parent.
///
/// More than two host labels with a first label other than `www` is a
/// subdomain whose parent is the remaining labels; anything else is a
/// subfolder of its own host.
pub fn classify_host(link: &str) -> (bool, String) {
    let Some(host) = Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    else {
        return (false, String::new());
    };

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 && labels[0] != "www" {
        (true, labels[1..].join("."))
    } else {
        (false, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_host() {
        assert_eq!(
            classify_host("https://blog.example.com/"),
            (true, "example.com".to_string())
        );
        assert_eq!(
            classify_host("https://www.example.com/docs/"),
            (false, "www.example.com".to_string())
        );
        assert_eq!(
            classify_host("https://example.com/blog"),
            (false, "example.com".to_string())
        );
        assert_eq!(classify_host("::not a url::"), (false, String::new()));
    }

    #[test]
    fn test_subdomain_record_adds_scheme() {
        let record = SubdomainRecord::new("shop.example.com", "shop.example.com", "1.2K", "40%", "60%");
        assert_eq!(record.link, "https://shop.example.com");
        assert!(record.is_subdomain);
        assert_eq!(record.parent_domain, "example.com");
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_subdomain_wire_names() {
        let record = SubdomainRecord::new("a.example.com", "https://a.example.com", "10", "1%", "99%");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("desktopShare").is_some());
        assert!(value.get("isSubdomain").is_some());
        assert!(value.get("parentDomain").is_some());
        assert!(value.get("created_at").is_some());
    }

    #[test]
    fn test_keyword_record_flat_wire_format() {
        let record = KeywordRecord {
            keyword: "shoes".into(),
            captured_at: 42,
            source_url: Some("https://sim.3ue.co/#keyword=shoes".into()),
            metrics: KeywordMetrics::Sim3ue(Sim3ueMetrics {
                volume: Some("1.5M".into()),
                click_through_rate: Some("45%".into()),
                ..Default::default()
            }),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["platform"], "sim3ue");
        assert_eq!(value["keyword"], "shoes");
        assert_eq!(value["clickThroughRate"], "45%");
        assert_eq!(value["captured_at"], 42);

        let back: KeywordRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_keyword_record_generic_keeps_extra_fields() {
        let value = json!({
            "keyword": "boots",
            "platform": "ahrefs",
            "captured_at": 7,
            "volume": 1200,
            "serp": {"organic": 8}
        });
        let record: KeywordRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.platform(), Platform::Ahrefs);
        match &record.metrics {
            KeywordMetrics::Generic(_, m) => {
                assert_eq!(m.volume, Some(json!(1200)));
                assert_eq!(m.extra.get("serp"), Some(&json!({"organic": 8})));
                assert!(!m.extra.contains_key("keyword"));
            }
            other => panic!("unexpected metrics: {:?}", other),
        }
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_keyword_record_missing_fields_default() {
        let record: KeywordRecord =
            serde_json::from_value(json!({"keyword": "x", "platform": "sumrush"})).unwrap();
        assert_eq!(record.captured_at, 0);
        match record.metrics {
            KeywordMetrics::Sumrush(m) => {
                assert_eq!(m.difficulty, 0);
                assert!(m.country_distribution.is_empty());
            }
            other => panic!("unexpected metrics: {:?}", other),
        }
    }

    #[test]
    fn test_keyword_record_requires_keyword() {
        let result: Result<KeywordRecord, _> = serde_json::from_value(json!({"platform": "sim3ue"}));
        assert!(result.is_err());
    }
}

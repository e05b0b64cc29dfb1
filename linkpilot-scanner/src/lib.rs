pub mod error;
pub mod keyword;
pub mod platform;
pub mod readiness;
pub mod result;
pub mod selectors;
pub mod subdomain;

pub use error::ScanError;
pub use keyword::{extract_keyword_record, keyword_ready_selectors};
pub use platform::{Platform, detect_platform, extract_keyword_from_url, is_subdomain_page};
pub use readiness::{HttpPageSource, PageSource, Readiness, ReadinessProbe, StaticPageSource};
pub use result::{KeywordMetrics, KeywordRecord, SubdomainRecord};
pub use subdomain::{TABLE_BODY_SELECTORS, extract_subdomain_table, extract_subdomains};

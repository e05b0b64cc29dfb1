// Filtering and sorting for the list views

use crate::model::{Backlink, LinkStatus};
use linkpilot_scanner::SubdomainRecord;
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubdomainKind {
    #[default]
    All,
    Subdomain,
    Subfolder,
}

impl FromStr for SubdomainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(SubdomainKind::All),
            "subdomain" | "subdomains" => Ok(SubdomainKind::Subdomain),
            "subfolder" | "subfolders" => Ok(SubdomainKind::Subfolder),
            _ => Err(format!("Invalid kind: {} (expected all, subdomain or subfolder)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Domain,
    #[default]
    Traffic,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "domain" => Ok(SortKey::Domain),
            "traffic" => Ok(SortKey::Traffic),
            _ => Err(format!("Invalid sort key: {} (expected domain or traffic)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {} (expected asc or desc)", s)),
        }
    }
}

/// Current state of the subdomain list: which rows are shown and in what
/// order.
#[derive(Debug, Clone, Default)]
pub struct SubdomainView {
    pub kind: SubdomainKind,
    pub query: String,
    pub sort_key: SortKey,
    pub order: SortOrder,
}

impl SubdomainView {
    pub fn matches(&self, record: &SubdomainRecord) -> bool {
        let kind_ok = match self.kind {
            SubdomainKind::All => true,
            SubdomainKind::Subdomain => record.is_subdomain,
            SubdomainKind::Subfolder => !record.is_subdomain,
        };
        if !kind_ok {
            return false;
        }

        let query = self.query.trim().to_lowercase();
        query.is_empty()
            || [&record.domain, &record.link, &record.parent_domain]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
    }

    /// Filtered and sorted copy of `records`.
    pub fn apply(&self, records: &[SubdomainRecord]) -> Vec<SubdomainRecord> {
        let mut shown: Vec<SubdomainRecord> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();

        shown.sort_by(|a, b| {
            let ordering = match self.sort_key {
                SortKey::Domain => a.domain.cmp(&b.domain),
                SortKey::Traffic => traffic_value(&a.traffic).cmp(&traffic_value(&b.traffic)),
            };
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        shown
    }
}

/// Sort value of a traffic display string: its digits read as one number,
/// so "1,234" is 1234 and "12.4K" is 124. No digits sorts as 0.
pub fn traffic_value(traffic: &str) -> u64 {
    let digits: String = traffic.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Backlinks shown under a status tab; `None` is the "all" tab.
pub fn filter_backlinks(backlinks: &[Backlink], status: Option<LinkStatus>) -> Vec<Backlink> {
    let mut shown: Vec<Backlink> = backlinks
        .iter()
        .filter(|link| status.is_none_or(|s| link.status == s))
        .cloned()
        .collect();
    // Newest first
    shown.sort_by(|a, b| match b.updated_at.cmp(&a.updated_at) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(domain: &str, link: &str, traffic: &str) -> SubdomainRecord {
        SubdomainRecord::new(domain, link, traffic, "50%", "50%")
    }

    fn sample() -> Vec<SubdomainRecord> {
        vec![
            record("blog.example.com", "https://blog.example.com/", "1,200"),
            record("example.com/docs/", "https://example.com/docs/", "12.4K"),
            record("shop.other.net", "https://shop.other.net/", "n/a"),
        ]
    }

    fn domains(records: &[SubdomainRecord]) -> Vec<&str> {
        records.iter().map(|r| r.domain.as_str()).collect()
    }

    #[test]
    fn test_default_view_sorts_by_traffic_desc() {
        let shown = SubdomainView::default().apply(&sample());
        assert_eq!(
            domains(&shown),
            vec!["blog.example.com", "example.com/docs/", "shop.other.net"]
        );
    }

    #[test]
    fn test_filter_by_kind_and_query() {
        let view = SubdomainView {
            kind: SubdomainKind::Subdomain,
            query: "EXAMPLE".into(),
            ..Default::default()
        };
        assert_eq!(domains(&view.apply(&sample())), vec!["blog.example.com"]);

        let view = SubdomainView {
            kind: SubdomainKind::Subfolder,
            ..Default::default()
        };
        assert_eq!(domains(&view.apply(&sample())), vec!["example.com/docs/"]);
    }

    #[test]
    fn test_query_matches_parent_domain() {
        let view = SubdomainView {
            query: "other.net".into(),
            ..Default::default()
        };
        assert_eq!(domains(&view.apply(&sample())), vec!["shop.other.net"]);
    }

    #[test]
    fn test_sort_by_domain_ascending() {
        let view = SubdomainView {
            sort_key: SortKey::Domain,
            order: SortOrder::Asc,
            ..Default::default()
        };
        assert_eq!(
            domains(&view.apply(&sample())),
            vec!["blog.example.com", "example.com/docs/", "shop.other.net"]
        );
    }

    #[test]
    fn test_traffic_value() {
        assert_eq!(traffic_value("1,234"), 1234);
        assert_eq!(traffic_value("12.4K"), 124);
        assert_eq!(traffic_value("-"), 0);
    }

    #[test]
    fn test_filter_backlinks_by_status() {
        let mut a = Backlink::new("a", "https://a.com");
        a.status = LinkStatus::Success;
        a.updated_at = 5;
        let mut b = Backlink::new("b", "https://b.com");
        b.updated_at = 9;

        let all = filter_backlinks(&[a.clone(), b.clone()], None);
        assert_eq!(all[0].id, "b");
        let success = filter_backlinks(&[a, b], Some(LinkStatus::Success));
        assert_eq!(success.len(), 1);
        assert_eq!(success[0].id, "a");
    }
}

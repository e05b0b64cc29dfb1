// Subfolder/subdomain traffic table extraction

use crate::error::{Result, ScanError};
use crate::platform::is_subdomain_page;
use crate::result::SubdomainRecord;
use crate::selectors::{SelectorChain, element_text};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));
static GRID_CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-table-col]").expect("valid cell selector"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid anchor selector"));

/// Selectors for the table body, most specific first.
pub const TABLE_BODY_SELECTORS: &[&str] = &[
    "div[data-ui-name='DefinitionTable.Body']",
    "[data-ui-name='Table.Body']",
    "table tbody",
    "table",
];

/// Scrape the subdomain table, refusing pages that are not the traffic report.
pub fn extract_subdomains(html: &str, page_url: &str) -> Result<Vec<SubdomainRecord>> {
    if !is_subdomain_page(page_url) {
        return Err(ScanError::NotTargetPage(page_url.to_string()));
    }
    let records = extract_subdomain_table(html);
    info!("Extracted {} subdomain rows from {}", records.len(), page_url);
    Ok(records)
}

/// Read every complete row of the traffic table.
///
/// Rows are read from `<tr>` elements when there are any; otherwise cells
/// tagged with `data-table-row`/`data-table-col` are regrouped into rows.
/// Rows without a domain or a link are skipped.
pub fn extract_subdomain_table(html: &str) -> Vec<SubdomainRecord> {
    let document = Html::parse_document(html);
    let Some(body) = SelectorChain::new("table body", TABLE_BODY_SELECTORS).first(document.root_element())
    else {
        warn!("No subdomain table found on page");
        return Vec::new();
    };

    let rows: Vec<ElementRef<'_>> = body.select(&ROWS).collect();
    if rows.is_empty() {
        debug!("No table rows, falling back to cell grid");
        return from_cell_grid(body);
    }

    let columns = RowColumns::new();
    rows.into_iter()
        .filter_map(|row| columns.read(row))
        .collect()
}

#[derive(Default)]
struct PartialRow {
    domain: Option<String>,
    link: Option<String>,
    traffic: Option<String>,
    desktop_share: Option<String>,
    mobile_share: Option<String>,
}

impl PartialRow {
    fn finish(self) -> Option<SubdomainRecord> {
        let (Some(domain), Some(link)) = (self.domain, self.link) else {
            debug!("Skipping incomplete row");
            return None;
        };
        Some(SubdomainRecord::new(
            domain,
            &link,
            self.traffic.unwrap_or_else(|| "0".to_string()),
            self.desktop_share.unwrap_or_else(|| "0%".to_string()),
            self.mobile_share.unwrap_or_else(|| "0%".to_string()),
        ))
    }
}

struct RowColumns {
    domain: SelectorChain,
    link: SelectorChain,
    traffic: SelectorChain,
    desktop: SelectorChain,
    mobile: SelectorChain,
}

impl RowColumns {
    fn new() -> Self {
        Self {
            domain: SelectorChain::new("domain", &[r#"[data-testid="text"]"#, "td:first-child"]),
            link: SelectorChain::new("link", &[r#"[data-testid="page-link"]"#, "a"]),
            traffic: SelectorChain::new(
                "traffic",
                &[r#"[data-testid="entrances"]"#, "td:nth-child(2)"],
            ),
            desktop: SelectorChain::new(
                "desktop share",
                &[r#"[data-testid="entrancesShareDesktop"]"#, "td:nth-child(3)"],
            ),
            mobile: SelectorChain::new(
                "mobile share",
                &[r#"[data-testid="entrancesShareMobile"]"#, "td:nth-child(4)"],
            ),
        }
    }

    fn read(&self, row: ElementRef<'_>) -> Option<SubdomainRecord> {
        PartialRow {
            domain: self.domain.text(row),
            link: self.link.attr(row, "href"),
            traffic: self.traffic.text(row),
            desktop_share: self.desktop.text(row),
            mobile_share: self.mobile.text(row),
        }
        .finish()
    }
}

fn from_cell_grid(body: ElementRef<'_>) -> Vec<SubdomainRecord> {
    let mut grid: BTreeMap<usize, PartialRow> = BTreeMap::new();

    for cell in body.select(&GRID_CELLS) {
        let index = |name: &str| {
            cell.value()
                .attr(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0)
        };
        let row = grid.entry(index("data-table-row")).or_default();
        let text = Some(element_text(cell)).filter(|t| !t.is_empty());

        match index("data-table-col") {
            0 => {
                row.domain = text;
                row.link = cell
                    .select(&ANCHOR)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| href.trim().to_string())
                    .filter(|href| !href.is_empty());
            }
            1 => row.traffic = text,
            2 => row.desktop_share = text,
            3 => row.mobile_share = text,
            _ => {}
        }
    }

    debug!("Regrouped cells into {} rows", grid.len());
    grid.into_values().filter_map(PartialRow::finish).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET_URL: &str =
        "https://sem.3ue.co/analytics/traffic/subfolders-subdomains/?q=example.com";

    const ROW_TABLE: &str = r#"<html><body>
        <table>
            <thead><tr><th>Domain</th><th>Traffic</th></tr></thead>
            <tbody>
                <tr>
                    <td><a href="https://blog.example.com/">blog.example.com</a></td>
                    <td>12.4K</td><td>35%</td><td>65%</td>
                </tr>
                <tr>
                    <td><a href="example.com/docs/">example.com/docs/</a></td>
                    <td>800</td>
                </tr>
                <tr><td>no-link.example.com</td><td>5</td></tr>
            </tbody>
        </table>
    </body></html>"#;

    #[test]
    fn test_row_mode_extraction() {
        let records = extract_subdomain_table(ROW_TABLE);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].domain, "blog.example.com");
        assert_eq!(records[0].traffic, "12.4K");
        assert_eq!(records[0].desktop_share, "35%");
        assert!(records[0].is_subdomain);
        assert_eq!(records[0].parent_domain, "example.com");

        assert_eq!(records[1].link, "https://example.com/docs/");
        assert!(!records[1].is_subdomain);
        assert_eq!(records[1].parent_domain, "example.com");
        assert_eq!(records[1].desktop_share, "0%");
        assert_eq!(records[1].mobile_share, "0%");
    }

    #[test]
    fn test_cell_grid_fallback() {
        let page = r#"<html><body>
            <div data-ui-name="DefinitionTable.Body">
                <div data-table-row="1" data-table-col="0"><a href="shop.example.org">shop.example.org</a></div>
                <div data-table-row="1" data-table-col="1">3.1K</div>
                <div data-table-row="0" data-table-col="0"><a href="https://www.example.org/a/">www.example.org/a/</a></div>
                <div data-table-row="0" data-table-col="3">70%</div>
                <div data-table-row="2" data-table-col="1">99</div>
            </div>
        </body></html>"#;

        let records = extract_subdomain_table(page);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].domain, "www.example.org/a/");
        assert_eq!(records[0].traffic, "0");
        assert_eq!(records[0].mobile_share, "70%");
        assert!(!records[0].is_subdomain);

        assert_eq!(records[1].link, "https://shop.example.org");
        assert_eq!(records[1].traffic, "3.1K");
        assert!(records[1].is_subdomain);
    }

    #[test]
    fn test_missing_table_is_empty() {
        assert!(extract_subdomain_table("<html><body><p>loading</p></body></html>").is_empty());
    }

    #[test]
    fn test_non_target_page_is_refused() {
        let result = extract_subdomains(ROW_TABLE, "https://sem.3ue.co/analytics/overview/");
        assert!(matches!(result, Err(ScanError::NotTargetPage(_))));

        let records = extract_subdomains(ROW_TABLE, TARGET_URL).unwrap();
        assert_eq!(records.len(), 2);
    }
}

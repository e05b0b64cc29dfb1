// Keyword metric extraction for the supported analytics platforms

use crate::error::{Result, ScanError};
use crate::platform::{Platform, detect_platform, extract_keyword_from_url};
use crate::result::{
    DeviceSplit, GenericMetrics, KeywordMetrics, KeywordRecord, Region, Sim3ueCompetitor,
    Sim3ueMetrics, Sim3ueRelatedKeyword, SumrushCompetitor, SumrushMetrics, SumrushRelatedKeyword,
    TrendChart,
};
use crate::selectors::{SelectorChain, cell_text, element_text, parse_leading_number};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

static FLAG_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"flag-([a-zA-Z]{2})\b").expect("valid flag pattern"));
static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid cell selector"));
static DATA_VALUES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="DataValue-"]"#).expect("valid value selector"));

/// Selectors that show a keyword page has finished rendering.
pub fn keyword_ready_selectors(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Sim3ue => &[r#"div[data-automation="VolumeAndClicks"]"#, r#"div[class*="DataValue-"]"#],
        Platform::Sumrush => &[r#"[data-testid="volume-total"]"#, r#"[data-at="kwo-volume"]"#],
        _ => &["h1", "title"],
    }
}

/// Build a keyword record from a rendered page.
///
/// Fields the page does not show are left empty; only a page without any
/// recognisable keyword is an error.
pub fn extract_keyword_record(html: &str, page_url: &str) -> Result<KeywordRecord> {
    let platform = detect_platform(page_url);
    let document = Html::parse_document(html);
    let root = document.root_element();

    let keyword = extract_keyword_from_url(page_url)
        .or_else(|| match platform {
            // sim3ue only ever carries the keyword in the URL fragment
            Platform::Sim3ue => None,
            _ => keyword_from_heading(root),
        })
        .ok_or_else(|| ScanError::MissingKeyword(page_url.to_string()))?;

    let base = Url::parse(page_url).ok();
    let metrics = match platform {
        Platform::Sim3ue => KeywordMetrics::Sim3ue(extract_sim3ue(root, base.as_ref())),
        Platform::Sumrush => KeywordMetrics::Sumrush(extract_sumrush(root, base.as_ref())),
        other => KeywordMetrics::Generic(other, extract_generic(root)),
    };

    info!("Extracted {} keyword data for '{}'", platform, keyword);
    Ok(KeywordRecord::new(keyword, metrics).with_source_url(page_url))
}

fn keyword_from_heading(root: ElementRef<'_>) -> Option<String> {
    SelectorChain::new(
        "keyword heading",
        &[
            r#"[data-testid="keyword-title"]"#,
            r#"[data-ui-name="KeywordTitle"]"#,
            "h1",
        ],
    )
    .text(root)
}

fn extract_sim3ue(root: ElementRef<'_>, base: Option<&Url>) -> Sim3ueMetrics {
    let values: Vec<String> = SelectorChain::new(
        "volume and clicks",
        &[
            r#"div[data-automation="VolumeAndClicks"] > div"#,
            r#"div[data-automation="VolumeAndClicks"]"#,
        ],
    )
    .first(root)
    .map(|container| container.select(&DATA_VALUES).map(element_text).collect())
    .unwrap_or_default();
    let value_at = |i: usize| values.get(i).filter(|v| !v.is_empty()).cloned();

    let difficulty = SelectorChain::new(
        "difficulty",
        &[
            r#"div[data-automation="KeywordDifficulty"] div[class*="DataValue-"]"#,
            r#"[data-test="kd-value"]"#,
        ],
    )
    .text(root);

    let desktop = SelectorChain::new(
        "desktop share",
        &[r#"[title*="桌面端"] + div"#, r#"[title*="Desktop"] + div"#],
    )
    .text(root);
    let mobile = SelectorChain::new(
        "mobile share",
        &[r#"[title*="移动网络"] + div"#, r#"[title*="Mobile"] + div"#],
    )
    .text(root);
    let devices = (desktop.is_some() || mobile.is_some()).then(|| DeviceSplit {
        desktop: desktop.unwrap_or_else(|| "0%".to_string()),
        mobile: mobile.unwrap_or_else(|| "0%".to_string()),
    });

    let trends = chart(
        root,
        base,
        &[r#"div[data-automation="TrendChart"] img"#, r#"[id*="_trend"] img"#],
    );

    let related_keywords = SelectorChain::new(
        "related keywords",
        &[
            r#"div[data-automation="KeywordIdeas"] tbody tr"#,
            r#"[id*="keywordIdeas"] tr"#,
        ],
    )
    .all(root)
    .into_iter()
    .filter_map(|row| {
        Some(Sim3ueRelatedKeyword {
            keyword: cell_text(row, &CELLS, 0)?,
            volume: cell_text(row, &CELLS, 1).unwrap_or_default(),
            click_through_rate: cell_text(row, &CELLS, 2).unwrap_or_default(),
            kd: cell_text(row, &CELLS, 3).unwrap_or_default(),
        })
    })
    .collect();

    let top_competitors = SelectorChain::new(
        "top competitors",
        &[
            r#"div[data-automation="TopCompetitors"] tbody tr"#,
            r#"[id*="competitors"] tr"#,
        ],
    )
    .all(root)
    .into_iter()
    .filter_map(|row| {
        Some(Sim3ueCompetitor {
            website: cell_text(row, &CELLS, 0)?,
            clicks: cell_text(row, &CELLS, 1).unwrap_or_default(),
        })
    })
    .collect();

    Sim3ueMetrics {
        volume: value_at(0),
        clicks: value_at(1),
        click_through_rate: value_at(2),
        difficulty,
        devices,
        trends,
        related_keywords,
        top_competitors,
    }
}

fn extract_sumrush(root: ElementRef<'_>, base: Option<&Url>) -> SumrushMetrics {
    let volume = SelectorChain::new(
        "volume",
        &[
            r#"[data-testid="volume-total"]"#,
            r#"[data-at="kwo-volume"]"#,
            r#".kwo-volume [data-ui-name="Text"]"#,
        ],
    )
    .text(root);

    let difficulty = SelectorChain::new(
        "difficulty",
        &[r#"[data-testid="difficulty-value"]"#, r#"[data-at="kwo-kd"]"#],
    )
    .text(root)
    .map(|text| parse_leading_number(&text))
    .unwrap_or(0);

    let region = SelectorChain::new(
        "region flag",
        &[
            r#"[data-testid="database-selector"] [class*="flag-"]"#,
            r#"[class*="flag-"]"#,
        ],
    )
    .first(root)
    .and_then(country_code)
    .map(|code| {
        let name = SelectorChain::new(
            "region name",
            &[r#"[data-testid="database-name"]"#, r#"[data-testid="database-selector"]"#],
        )
        .text(root)
        .unwrap_or_else(|| code.to_uppercase());
        Region { code, name }
    });

    let value_chain = SelectorChain::new(
        "country volume",
        &[r#"[data-testid="country-volume"]"#, "span:last-child"],
    );
    let flag_chain = SelectorChain::new("country flag", &[r#"[class*="flag-"]"#]);
    let country_distribution: BTreeMap<String, String> = SelectorChain::new(
        "country distribution",
        &[
            r#"[data-testid="country-distribution"] [data-testid="country-row"]"#,
            ".kwo-country-list li",
        ],
    )
    .all(root)
    .into_iter()
    .filter_map(|row| {
        let code = flag_chain.first(row).and_then(country_code)?;
        let volume = value_chain.text(row).unwrap_or_else(|| "0".to_string());
        Some((code, volume))
    })
    .collect();

    let trends = chart(
        root,
        base,
        &[r#"[data-testid="trend-chart"] img"#, ".kwo-trend img"],
    );

    let related_keywords = SelectorChain::new(
        "related keywords",
        &[
            r#"[data-testid="related-keywords"] tbody tr"#,
            ".kwo-related-keywords tr",
        ],
    )
    .all(root)
    .into_iter()
    .filter_map(|row| {
        Some(SumrushRelatedKeyword {
            keyword: cell_text(row, &CELLS, 0)?,
            volume: cell_text(row, &CELLS, 1).unwrap_or_default(),
            difficulty: cell_text(row, &CELLS, 2)
                .map(|text| parse_leading_number(&text))
                .unwrap_or(0),
        })
    })
    .collect();

    let top_competitors = SelectorChain::new(
        "top competitors",
        &[
            r#"[data-testid="top-competitors"] tbody tr"#,
            ".kwo-serp-competitors tr",
        ],
    )
    .all(root)
    .into_iter()
    .filter_map(|row| {
        Some(SumrushCompetitor {
            website: cell_text(row, &CELLS, 0)?,
            traffic: cell_text(row, &CELLS, 1).unwrap_or_default(),
        })
    })
    .collect();

    SumrushMetrics {
        volume,
        difficulty,
        region,
        country_distribution,
        trends,
        related_keywords,
        top_competitors,
    }
}

fn extract_generic(root: ElementRef<'_>) -> GenericMetrics {
    let volume = SelectorChain::new(
        "volume",
        &[r#"[data-metric="volume"]"#, ".keyword-volume"],
    )
    .text(root)
    .map(Value::String);
    let difficulty = SelectorChain::new(
        "difficulty",
        &[r#"[data-metric="difficulty"]"#, ".keyword-difficulty"],
    )
    .text(root)
    .map(|text| Value::from(parse_leading_number(&text)));

    let mut extra = BTreeMap::new();
    if let Some(title) = SelectorChain::new("title", &["title"]).text(root) {
        extra.insert("title".to_string(), Value::String(title));
    }

    GenericMetrics {
        volume,
        difficulty,
        extra,
    }
}

/// Trend chart image of the page. A relative `src` is joined onto the page
/// URL so the stored reference is always an absolute URL.
fn chart(root: ElementRef<'_>, base: Option<&Url>, candidates: &[&str]) -> Option<TrendChart> {
    let src = SelectorChain::new("trend chart", candidates).attr(root, "src")?;
    let chart_url = match Url::parse(&src) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(&src).ok()?,
        Err(e) => {
            debug!("Dropping trend chart src '{}': {}", src, e);
            return None;
        }
    };
    Some(TrendChart {
        chart_url: Some(chart_url.into()),
        chart_base64: None,
    })
}

/// Two-letter country code from a `flag-xx` CSS class.
fn country_code(element: ElementRef<'_>) -> Option<String> {
    let class = element.value().attr("class")?;
    let code = FLAG_CLASS
        .captures(class)
        .map(|caps| caps[1].to_lowercase());
    debug!("Country code from class '{}': {:?}", class, code);
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIM3UE_URL: &str =
        "https://sim.3ue.co/#/digitalsuite/acquisition/keywords/overview?keyword=running%20shoes&country=840";
    const SUMRUSH_URL: &str = "https://sem.3ue.co/analytics/keywordoverview/?q=boots&db=us";

    const SIM3UE_PAGE: &str = r#"<html><body>
        <div data-automation="VolumeAndClicks">
            <div>
                <div class="DataValue-abc">1.2M</div>
                <div class="DataValue-abc">800K</div>
                <div class="DataValue-abc">66.7%</div>
            </div>
        </div>
        <div data-automation="KeywordDifficulty"><div class="DataValue-x">72</div></div>
        <div><span title="Desktop traffic">Desktop</span><div>35%</div></div>
        <div><span title="Mobile web">Mobile</span><div>65%</div></div>
        <div data-automation="TrendChart"><img src="blob:https://sim.3ue.co/1234"></div>
        <div data-automation="KeywordIdeas"><table>
            <thead><tr><th>Keyword</th></tr></thead>
            <tbody>
                <tr><td>trail running shoes</td><td>90K</td><td>51%</td><td>44</td></tr>
                <tr><td>running shoes men</td><td>60K</td><td>48%</td><td>39</td></tr>
            </tbody>
        </table></div>
        <div data-automation="TopCompetitors"><table><tbody>
            <tr><td>nike.com</td><td>120K</td></tr>
        </tbody></table></div>
    </body></html>"#;

    const SUMRUSH_PAGE: &str = r#"<html><body>
        <h1 data-testid="keyword-title">boots</h1>
        <div data-testid="database-selector"><span class="icon flag-us"></span>
            <span data-testid="database-name">United States</span></div>
        <div data-testid="volume-total">49.5K</div>
        <div data-testid="difficulty-value">67 Hard</div>
        <ul data-testid="country-distribution">
            <li data-testid="country-row"><i class="flag-us"></i><span data-testid="country-volume">49.5K</span></li>
            <li data-testid="country-row"><i class="flag-GB"></i><span data-testid="country-volume">12K</span></li>
            <li data-testid="country-row"><i class="no-flag"></i><span>9K</span></li>
        </ul>
        <div data-testid="related-keywords"><table><tbody>
            <tr><td>winter boots</td><td>22K</td><td>58</td></tr>
            <tr><td>rain boots</td><td>14K</td><td>n/a</td></tr>
        </tbody></table></div>
        <div data-testid="top-competitors"><table><tbody>
            <tr><td>zappos.com</td><td>31K</td></tr>
        </tbody></table></div>
    </body></html>"#;

    #[test]
    fn test_extract_sim3ue_record() {
        let record = extract_keyword_record(SIM3UE_PAGE, SIM3UE_URL).unwrap();
        assert_eq!(record.keyword, "running shoes");
        assert_eq!(record.source_url.as_deref(), Some(SIM3UE_URL));

        let KeywordMetrics::Sim3ue(m) = record.metrics else {
            panic!("expected sim3ue metrics");
        };
        assert_eq!(m.volume.as_deref(), Some("1.2M"));
        assert_eq!(m.clicks.as_deref(), Some("800K"));
        assert_eq!(m.click_through_rate.as_deref(), Some("66.7%"));
        assert_eq!(m.difficulty.as_deref(), Some("72"));
        assert_eq!(
            m.devices,
            Some(DeviceSplit {
                desktop: "35%".into(),
                mobile: "65%".into()
            })
        );
        assert_eq!(
            m.trends.and_then(|t| t.chart_url).as_deref(),
            Some("blob:https://sim.3ue.co/1234")
        );
        assert_eq!(m.related_keywords.len(), 2);
        assert_eq!(m.related_keywords[0].keyword, "trail running shoes");
        assert_eq!(m.related_keywords[0].kd, "44");
        assert_eq!(m.top_competitors[0].website, "nike.com");
    }

    #[test]
    fn test_sim3ue_requires_keyword_in_url() {
        let result = extract_keyword_record(SIM3UE_PAGE, "https://sim.3ue.co/#/overview");
        assert!(matches!(result, Err(ScanError::MissingKeyword(_))));
    }

    #[test]
    fn test_sim3ue_empty_page_yields_absent_fields() {
        let record = extract_keyword_record("<html><body></body></html>", SIM3UE_URL).unwrap();
        let KeywordMetrics::Sim3ue(m) = record.metrics else {
            panic!("expected sim3ue metrics");
        };
        assert_eq!(m.volume, None);
        assert_eq!(m.devices, None);
        assert!(m.related_keywords.is_empty());
    }

    #[test]
    fn test_extract_sumrush_record() {
        let record = extract_keyword_record(SUMRUSH_PAGE, SUMRUSH_URL).unwrap();
        assert_eq!(record.keyword, "boots");

        let KeywordMetrics::Sumrush(m) = record.metrics else {
            panic!("expected sumrush metrics");
        };
        assert_eq!(m.volume.as_deref(), Some("49.5K"));
        assert_eq!(m.difficulty, 67);
        assert_eq!(
            m.region,
            Some(Region {
                code: "us".into(),
                name: "United States".into()
            })
        );
        assert_eq!(m.country_distribution.len(), 2);
        assert_eq!(m.country_distribution.get("gb").map(String::as_str), Some("12K"));
        assert_eq!(m.related_keywords[0].difficulty, 58);
        assert_eq!(m.related_keywords[1].difficulty, 0);
        assert_eq!(m.top_competitors[0].traffic, "31K");
    }

    #[test]
    fn test_relative_chart_src_joins_page_url() {
        let page = r#"<h1>boots</h1><div data-testid="trend-chart"><img src="/static/trend.png"></div>"#;
        let record = extract_keyword_record(page, SUMRUSH_URL).unwrap();
        assert_eq!(
            record.metrics.trends().and_then(|t| t.chart_url.as_deref()),
            Some("https://sem.3ue.co/static/trend.png")
        );

        let page = r#"<div data-automation="TrendChart"><img src="/tmp/secret.txt"></div>"#;
        let record = extract_keyword_record(page, SIM3UE_URL).unwrap();
        assert_eq!(
            record.metrics.trends().and_then(|t| t.chart_url.as_deref()),
            Some("https://sim.3ue.co/tmp/secret.txt")
        );
    }

    #[test]
    fn test_generic_platform_uses_heading() {
        let page = r#"<html><head><title>Widgets - Example</title></head>
            <body><h1>widgets</h1><span data-metric="difficulty">KD 31</span></body></html>"#;
        let record = extract_keyword_record(page, "https://app.ahrefs.com/keywords").unwrap();
        assert_eq!(record.keyword, "widgets");

        let KeywordMetrics::Generic(platform, m) = record.metrics else {
            panic!("expected generic metrics");
        };
        assert_eq!(platform, Platform::Ahrefs);
        assert_eq!(m.difficulty, Some(Value::from(31)));
        assert_eq!(m.volume, None);
        assert_eq!(
            m.extra.get("title"),
            Some(&Value::String("Widgets - Example".into()))
        );
    }
}

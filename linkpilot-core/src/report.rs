// Export of stored data to files

use crate::error::ExportError;
use crate::model::StorageSnapshot;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use linkpilot_scanner::{KeywordRecord, SubdomainRecord};
use linkpilot_scanner::result::now_millis;
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const CSV_HEADERS: [&str; 8] = [
    "Domain",
    "Link",
    "Traffic",
    "Desktop Share",
    "Mobile Share",
    "Type",
    "Parent Domain",
    "Updated At",
];

/// Pretty JSON for one keyword record, stamped with `exported_at`.
///
/// When `chart` holds the trend chart's image bytes the chart is inlined as a
/// PNG data URI under `trends.chartBase64` and `trends.chartUrl` is dropped.
pub fn keyword_json(record: &KeywordRecord, chart: Option<&[u8]>) -> Result<String, ExportError> {
    let mut value = serde_json::to_value(record)?;

    if let (Some(bytes), Some(Value::Object(trends))) = (chart, value.get_mut("trends")) {
        trends.insert(
            "chartBase64".to_string(),
            Value::String(format!("data:image/png;base64,{}", STANDARD.encode(bytes))),
        );
        trends.remove("chartUrl");
        debug!("Inlined {} byte trend chart", bytes.len());
    }

    if let Value::Object(ref mut object) = value {
        object.insert("exported_at".to_string(), Value::from(now_millis()));
    }

    Ok(serde_json::to_string_pretty(&value)?)
}

/// Bytes of a chart reference that is already inline, i.e. a base64 `data:`
/// URI. Scraped URLs and paths are never read.
pub fn resolve_chart(chart_url: &str) -> Option<Vec<u8>> {
    let (meta, payload) = chart_url.strip_prefix("data:")?.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}

/// Read a chart image named on the command line, given as a local path or a
/// `file://` URL.
pub fn read_chart_file(location: &str) -> Result<Vec<u8>, ExportError> {
    let path = if location.starts_with("file://") {
        Url::parse(location)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| ExportError::ChartLocation(location.to_string()))?
    } else {
        PathBuf::from(location)
    };
    debug!("Reading trend chart from {}", path.display());
    Ok(std::fs::read(path)?)
}

/// CSV of subdomain records in the given order, every field quoted.
pub fn subdomains_csv(records: &[SubdomainRecord]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for record in records {
        let updated_at = format_millis(record.updated_at);
        writer.write_record([
            record.domain.as_str(),
            record.link.as_str(),
            record.traffic.as_str(),
            record.desktop_share.as_str(),
            record.mobile_share.as_str(),
            if record.is_subdomain { "Subdomain" } else { "Subfolder" },
            record.parent_domain.as_str(),
            updated_at.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pretty JSON of every collection with generator metadata.
pub fn snapshot_json(snapshot: &StorageSnapshot) -> Result<String, ExportError> {
    let report = serde_json::json!({
        "metadata": {
            "generator": "LinkPilot",
            "version": env!("CARGO_PKG_VERSION"),
            "generated_at": Utc::now().to_rfc3339(),
        },
        "data": snapshot,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn keyword_export_filename(keyword: &str, date: NaiveDate) -> String {
    format!("keyword-{}-{}.json", file_safe(keyword), date.format("%Y-%m-%d"))
}

pub fn subdomain_export_filename(date: NaiveDate) -> String {
    format!("subdomains-{}.csv", date.format("%Y-%m-%d"))
}

pub fn snapshot_export_filename(date: NaiveDate) -> String {
    format!("linkpilot-export-{}.json", date.format("%Y-%m-%d"))
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Epoch milliseconds as a UTC timestamp string.
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn file_safe(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "keyword".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkpilot_scanner::KeywordMetrics;
    use linkpilot_scanner::result::{Sim3ueMetrics, TrendChart};

    fn keyword_with_chart() -> KeywordRecord {
        KeywordRecord {
            keyword: "running shoes".into(),
            captured_at: 1_700_000_000_000,
            source_url: None,
            metrics: KeywordMetrics::Sim3ue(Sim3ueMetrics {
                volume: Some("1.2M".into()),
                trends: Some(TrendChart {
                    chart_url: Some("blob:https://sim.3ue.co/abc".into()),
                    chart_base64: None,
                }),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_keyword_json_inlines_chart() {
        let json = keyword_json(&keyword_with_chart(), Some(&[0x89, b'P', b'N', b'G'])).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["exported_at"].as_i64().is_some());
        assert_eq!(value["trends"]["chartBase64"], "data:image/png;base64,iVBORw==");
        assert!(value["trends"].get("chartUrl").is_none());
    }

    #[test]
    fn test_keyword_json_keeps_unresolved_chart_url() {
        let json = keyword_json(&keyword_with_chart(), None).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["trends"]["chartUrl"], "blob:https://sim.3ue.co/abc");
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_resolve_chart() {
        assert_eq!(
            resolve_chart("data:image/png;base64,iVBORw=="),
            Some(vec![0x89, b'P', b'N', b'G'])
        );
        assert_eq!(resolve_chart("data:image/svg+xml,<svg/>"), None);
        assert_eq!(resolve_chart("blob:https://sim.3ue.co/abc"), None);
    }

    #[test]
    fn test_resolve_chart_never_reads_local_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let secret = temp_dir.path().join("secret.txt");
        std::fs::write(&secret, "TOP-SECRET").unwrap();

        let path = secret.display().to_string();
        assert_eq!(resolve_chart(&path), None);
        assert_eq!(resolve_chart(&format!("file://{}", path)), None);
    }

    #[test]
    fn test_read_chart_file_accepts_path_and_file_url() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let chart = temp_dir.path().join("chart.png");
        std::fs::write(&chart, [0x89, b'P', b'N', b'G']).unwrap();

        let path = chart.display().to_string();
        assert_eq!(read_chart_file(&path).unwrap(), vec![0x89, b'P', b'N', b'G']);
        let url = Url::from_file_path(&chart).unwrap();
        assert_eq!(read_chart_file(url.as_str()).unwrap(), vec![0x89, b'P', b'N', b'G']);

        assert!(matches!(
            read_chart_file("file://remote-host/chart.png"),
            Err(ExportError::ChartLocation(_))
        ));
        assert!(matches!(
            read_chart_file(&temp_dir.path().join("missing.png").display().to_string()),
            Err(ExportError::Io(_))
        ));
    }

    #[test]
    fn test_subdomains_csv_quotes_everything() {
        let mut record = SubdomainRecord::new(
            "say \"hi\".example.com",
            "https://hi.example.com",
            "1,200",
            "40%",
            "60%",
        );
        record.updated_at = 0;
        let csv = subdomains_csv(&[record]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            r#""Domain","Link","Traffic","Desktop Share","Mobile Share","Type","Parent Domain","Updated At""#
        );
        assert_eq!(
            lines[1],
            r#""say ""hi"".example.com","https://hi.example.com","1,200","40%","60%","Subdomain","example.com","1970-01-01 00:00:00""#
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_export_filenames() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            keyword_export_filename("running shoes", date),
            "keyword-running-shoes-2024-03-09.json"
        );
        assert_eq!(keyword_export_filename("a/b", date), "keyword-a-b-2024-03-09.json");
        assert_eq!(subdomain_export_filename(date), "subdomains-2024-03-09.csv");
        assert_eq!(snapshot_export_filename(date), "linkpilot-export-2024-03-09.json");
    }
}

use clap::{Arg, ArgMatches, Command};
use linkpilot::handlers::*;
use linkpilot_core::config::Settings;
use linkpilot_core::store::LocalStore;
use linkpilot_core::view::{SortKey, SortOrder, SubdomainKind};
use linkpilot_scanner::{KeywordMetrics, KeywordRecord, Platform, SubdomainRecord};
use linkpilot_scanner::result::{GenericMetrics, Sim3ueMetrics, TrendChart};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

fn create_test_context() -> (TempDir, AppContext) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let store = LocalStore::open(&db_path).unwrap();
    let settings = Settings {
        export_dir: temp_dir.path().display().to_string(),
        ..Default::default()
    };
    (
        temp_dir,
        AppContext {
            store,
            settings,
            db_path,
        },
    )
}

fn view_matches(argv: &[&str]) -> ArgMatches {
    Command::new("list")
        .arg(Arg::new("kind").long("kind"))
        .arg(Arg::new("search").long("search"))
        .arg(Arg::new("sort").long("sort"))
        .arg(Arg::new("order").long("order"))
        .arg(
            Arg::new("output")
                .long("output")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches_from(argv)
}

fn keyword(name: &str, metrics: KeywordMetrics) -> KeywordRecord {
    KeywordRecord {
        keyword: name.into(),
        captured_at: 1,
        source_url: None,
        metrics,
    }
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_parse_data_arg() {
    assert_eq!(parse_data_arg(None), Value::Null);
    assert_eq!(parse_data_arg(Some(r#"{"domain": "a.com"}"#)), json!({"domain": "a.com"}));
    assert_eq!(parse_data_arg(Some("a.example.com")), json!("a.example.com"));
    assert_eq!(parse_data_arg(Some("42")), json!(42));
}

#[test]
fn test_page_url_for() {
    let url = Url::parse("https://sem.3ue.co/analytics/").unwrap();
    assert_eq!(
        page_url_for(Some(&url), None).unwrap(),
        "https://sem.3ue.co/analytics/"
    );

    let override_url = "https://sim.3ue.co/#/overview?keyword=boots".to_string();
    assert_eq!(
        page_url_for(Some(&url), Some(&override_url)).unwrap(),
        override_url
    );

    let result = page_url_for(None, None);
    assert!(result.unwrap_err().contains("--page-url"));

    let bad = "not a url".to_string();
    assert!(page_url_for(None, Some(&bad)).is_err());
}

#[test]
fn test_resolve_output() {
    let explicit = PathBuf::from("/tmp/out.csv");
    assert_eq!(
        resolve_output(Some(&explicit), Path::new("/exports"), "x.csv"),
        explicit
    );
    assert_eq!(
        resolve_output(None, Path::new("/exports"), "x.csv"),
        PathBuf::from("/exports/x.csv")
    );
}

#[test]
fn test_find_keywords_by_name_and_platform() {
    let records = vec![
        keyword("Boots", KeywordMetrics::Sim3ue(Sim3ueMetrics::default())),
        keyword(
            "boots",
            KeywordMetrics::Generic(Platform::Ahrefs, GenericMetrics::default()),
        ),
        keyword("shoes", KeywordMetrics::Sim3ue(Sim3ueMetrics::default())),
    ];

    assert_eq!(find_keywords(&records, " boots ", None).len(), 2);
    let ahrefs = find_keywords(&records, "boots", Some("ahrefs"));
    assert_eq!(ahrefs.len(), 1);
    assert_eq!(ahrefs[0].platform(), Platform::Ahrefs);
    assert!(find_keywords(&records, "sandals", None).is_empty());
}

#[test]
fn test_keyword_volume() {
    let sim3ue = keyword(
        "boots",
        KeywordMetrics::Sim3ue(Sim3ueMetrics {
            volume: Some("1.2M".into()),
            ..Default::default()
        }),
    );
    assert_eq!(keyword_volume(&sim3ue), "1.2M");

    let generic = keyword(
        "boots",
        KeywordMetrics::Generic(
            Platform::Ahrefs,
            GenericMetrics {
                volume: Some(json!(5400)),
                ..Default::default()
            },
        ),
    );
    assert_eq!(keyword_volume(&generic), "5400");

    let empty = keyword("boots", KeywordMetrics::Sim3ue(Sim3ueMetrics::default()));
    assert_eq!(keyword_volume(&empty), "-");
}

fn keyword_with_chart(chart_url: &str) -> KeywordRecord {
    keyword(
        "boots",
        KeywordMetrics::Sim3ue(Sim3ueMetrics {
            trends: Some(TrendChart {
                chart_url: Some(chart_url.into()),
                chart_base64: None,
            }),
            ..Default::default()
        }),
    )
}

#[test]
fn test_chart_bytes_ignores_scraped_file_paths() {
    let temp_dir = TempDir::new().unwrap();
    let secret = temp_dir.path().join("secret.txt");
    std::fs::write(&secret, "TOP-SECRET").unwrap();

    let scraped = keyword_with_chart(&secret.display().to_string());
    assert_eq!(chart_bytes(&scraped, None).unwrap(), None);

    let inline = keyword_with_chart("data:image/png;base64,iVBORw==");
    assert_eq!(
        chart_bytes(&inline, None).unwrap(),
        Some(vec![0x89, b'P', b'N', b'G'])
    );
}

#[test]
fn test_chart_bytes_reads_file_named_by_user() {
    let temp_dir = TempDir::new().unwrap();
    let chart = temp_dir.path().join("chart.png");
    std::fs::write(&chart, [0x89, b'P', b'N', b'G']).unwrap();

    let record = keyword_with_chart("https://sim.3ue.co/charts/boots.png");
    let location = chart.display().to_string();
    assert_eq!(
        chart_bytes(&record, Some(&location)).unwrap(),
        Some(vec![0x89, b'P', b'N', b'G'])
    );

    let missing = temp_dir.path().join("missing.png").display().to_string();
    assert!(chart_bytes(&record, Some(&missing)).is_err());
}

#[test]
fn test_subdomain_view_from_args() {
    let view = subdomain_view(&view_matches(&[
        "list", "--kind", "subfolder", "--search", "docs", "--sort", "domain", "--order", "asc",
    ]))
    .unwrap();
    assert_eq!(view.kind, SubdomainKind::Subfolder);
    assert_eq!(view.query, "docs");
    assert_eq!(view.sort_key, SortKey::Domain);
    assert_eq!(view.order, SortOrder::Asc);

    let view = subdomain_view(&view_matches(&["list"])).unwrap();
    assert_eq!(view.sort_key, SortKey::Traffic);
    assert_eq!(view.order, SortOrder::Desc);

    assert!(subdomain_view(&view_matches(&["list", "--sort", "size"])).is_err());
}

// ============================================================================
// Handler Tests
// ============================================================================

#[tokio::test]
async fn test_subdomains_export_writes_csv() {
    let (temp_dir, ctx) = create_test_context();
    ctx.store
        .add_subdomains_batch(vec![
            SubdomainRecord::new("a.example.com", "https://a.example.com/", "10", "50%", "50%"),
            SubdomainRecord::new("example.com/b/", "https://example.com/b/", "20", "50%", "50%"),
        ])
        .await
        .unwrap();

    let output = temp_dir.path().join("rows.csv");
    let output_arg = output.display().to_string();
    let args = view_matches(&["export", "--kind", "subdomain", "--output", &output_arg]);
    handle_subdomains_export(&ctx, &args).await.unwrap();

    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("\"a.example.com\""));
    assert!(!csv.contains("example.com/b/"));
}

#[tokio::test]
async fn test_subdomains_export_with_nothing_to_export() {
    let (_temp_dir, ctx) = create_test_context();
    let args = view_matches(&["export"]);
    let result = handle_subdomains_export(&ctx, &args).await;
    assert!(result.unwrap_err().to_string().contains("Nothing to export"));
}

#[tokio::test]
async fn test_export_uses_configured_directory() {
    let (temp_dir, ctx) = create_test_context();
    let args = Command::new("export")
        .arg(
            Arg::new("output")
                .long("output")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches_from(["export"]);

    handle_export(&ctx, &args).await.unwrap();

    let written: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("linkpilot-export-"))
        .collect();
    assert_eq!(written.len(), 1);
}

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkpilot_core::config::{CONFIG_FILE, DATABASE_FILE, DEFAULT_CONFIG_DIR, Settings, expand_dir};
use linkpilot_core::data::Database;
use linkpilot_core::model::{Backlink, LinkStatus, LinkType, SiteConfig};
use linkpilot_core::report::{
    format_millis, keyword_export_filename, keyword_json, read_chart_file, resolve_chart,
    save_report, snapshot_export_filename, snapshot_json, subdomain_export_filename,
    subdomains_csv,
};
use linkpilot_core::router::{
    Action, Envelope, PageContext, Response, RouterService, background_router, page_router,
};
use linkpilot_core::store::{LocalStore, UpsertOutcome};
use linkpilot_core::view::{SubdomainView, filter_backlinks};
use linkpilot_scanner::{
    HttpPageSource, KeywordMetrics, KeywordRecord, PageSource, Platform, ReadinessProbe,
    StaticPageSource, SubdomainRecord, TABLE_BODY_SELECTORS, detect_platform,
    keyword_ready_selectors,
};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Everything a command needs once the database is open.
pub struct AppContext {
    pub store: LocalStore,
    pub settings: Settings,
    pub db_path: PathBuf,
}

impl AppContext {
    /// Load settings from the default config directory and open the database,
    /// creating it when it does not exist yet.
    pub async fn open(db_override: Option<&PathBuf>) -> Result<Self> {
        let config_dir = expand_dir(DEFAULT_CONFIG_DIR);
        let settings = Settings::load(&config_dir.join(CONFIG_FILE))?;
        let db_path = db_override
            .cloned()
            .unwrap_or_else(|| config_dir.join(DATABASE_FILE));

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let store = LocalStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        store.initialize().await?;
        debug!("Using database {}", db_path.display());

        Ok(Self {
            store,
            settings,
            db_path,
        })
    }

    fn background(&self) -> RouterService {
        RouterService::spawn(background_router(self.store.clone()))
    }
}

// Helpers

/// Parse a `send` payload. Text that is not JSON is sent as a JSON string.
pub fn parse_data_arg(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
    }
}

/// The page address scrapers see: `--page-url` when given, otherwise the
/// fetched URL.
pub fn page_url_for(url: Option<&Url>, page_url: Option<&String>) -> Result<String, String> {
    match (page_url, url) {
        (Some(page_url), _) => Url::parse(page_url)
            .map(|_| page_url.clone())
            .map_err(|e| format!("Invalid --page-url '{}': {}", page_url, e)),
        (None, Some(url)) => Ok(url.to_string()),
        (None, None) => Err("--page-url is required when reading the page from a file".to_string()),
    }
}

/// Where an export goes: the explicit output path, or `filename` inside the
/// configured export directory.
pub fn resolve_output(output: Option<&PathBuf>, export_dir: &Path, filename: &str) -> PathBuf {
    output
        .cloned()
        .unwrap_or_else(|| export_dir.join(filename))
}

/// Stored records for a keyword, matched case-insensitively, optionally
/// limited to one platform.
pub fn find_keywords<'a>(
    records: &'a [KeywordRecord],
    keyword: &str,
    platform: Option<&str>,
) -> Vec<&'a KeywordRecord> {
    let keyword = keyword.trim().to_lowercase();
    let platform = platform.map(Platform::parse);
    records
        .iter()
        .filter(|record| record.keyword.to_lowercase() == keyword)
        .filter(|record| platform.is_none_or(|p| record.platform() == p))
        .collect()
}

/// Search volume as displayed, or "-" when the page had none.
pub fn keyword_volume(record: &KeywordRecord) -> String {
    let volume = match &record.metrics {
        KeywordMetrics::Sim3ue(m) => m.volume.clone(),
        KeywordMetrics::Sumrush(m) => m.volume.clone(),
        KeywordMetrics::Generic(_, m) => m.volume.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
    };
    volume.unwrap_or_else(|| "-".to_string())
}

pub fn subdomain_view(args: &ArgMatches) -> Result<SubdomainView, String> {
    let mut view = SubdomainView::default();
    if let Some(kind) = args.get_one::<String>("kind") {
        view.kind = kind.parse()?;
    }
    if let Some(query) = args.get_one::<String>("search") {
        view.query = query.clone();
    }
    if let Some(sort) = args.get_one::<String>("sort") {
        view.sort_key = sort.parse()?;
    }
    if let Some(order) = args.get_one::<String>("order") {
        view.order = order.parse()?;
    }
    Ok(view)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_header(title: &str) {
    print_divider();
    println!("{}", format!("  {}", title).bright_white().bold());
    print_divider();
    println!();
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

fn confirmed(response: &str) -> bool {
    response == "y" || response == "yes"
}

/// Turn a failure response into an error.
fn expect_success(response: Response) -> Result<Response> {
    if response.success {
        Ok(response)
    } else {
        Err(anyhow!(
            response.error.unwrap_or_else(|| "request failed".to_string())
        ))
    }
}

async fn wait_for_page<S: PageSource>(
    source: &S,
    selectors: &[&str],
    settings: &Settings,
) -> Result<String> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Waiting for {} to render...", source.describe()));

    let probe = ReadinessProbe::new(
        selectors,
        settings.readiness_timeout(),
        settings.poll_interval(),
    );
    let readiness = probe.wait(source).await;
    spinner.finish_and_clear();
    Ok(readiness.into_html()?)
}

async fn fetch_page(args: &ArgMatches, selectors: &[&str], settings: &Settings) -> Result<String> {
    if let Some(url) = args.get_one::<Url>("url") {
        let source =
            HttpPageSource::new(url.as_str(), &settings.user_agent, settings.http_timeout_secs)?;
        return wait_for_page(&source, selectors, settings).await;
    }
    if let Some(path) = args.get_one::<PathBuf>("file") {
        let source = StaticPageSource::from_file(path)?;
        return wait_for_page(&source, selectors, settings).await;
    }
    bail!("Either --url or --file must be provided")
}

// Init

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_header("LINKPILOT INITIALIZATION");

    let raw_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let config_dir = expand_dir(raw_dir);
    let db_path = config_dir.join(DATABASE_FILE);
    let config_path = config_dir.join(CONFIG_FILE);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if config_dir.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration directory already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            config_dir.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Do you want to continue? [y/N]:");
        println!();
        if !confirmed(&response) {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    if force || !config_path.exists() {
        Settings::default().save(&config_path)?;
        println!(
            "{} Default config written: {}",
            "✓".green().bold(),
            config_path.display().to_string().bright_white()
        );
    } else {
        println!("{} Keeping existing config", "→".blue());
    }

    if Database::exists(&db_path) {
        let overwrite = force || {
            let response = print_prompt("Database already exists. Overwrite it? [y/N]:");
            println!();
            confirmed(&response)
        };
        if overwrite {
            Database::drop(&db_path)?;
            println!("{} Existing database removed", "✓".green().bold());
        } else {
            println!("{} Keeping existing database", "→".blue());
        }
    }

    if !Database::exists(&db_path) {
        Database::new(&db_path)?;
        println!(
            "{} Database initialized: {}",
            "✓".green().bold(),
            db_path.display().to_string().bright_white()
        );
    }

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    Ok(())
}

// Capture

pub async fn handle_capture_keyword(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let page_url = page_url_for(args.get_one::<Url>("url"), args.get_one::<String>("page-url"))
        .map_err(|e| anyhow!(e))?;
    let platform = detect_platform(&page_url);
    let html = fetch_page(args, keyword_ready_selectors(platform), &ctx.settings).await?;

    let page = RouterService::spawn(page_router(
        PageContext::new(page_url, html),
        ctx.background(),
    ));
    let response = page
        .request(Envelope::new(Action::FetchKeywordData.wire_name(), Value::Null))
        .await?;
    let response = expect_success(response)?;
    let record: KeywordRecord = serde_json::from_value(response.data.unwrap_or_default())?;
    info!("Captured keyword '{}'", record.keyword);

    println!(
        "{} Captured {} from {}",
        "✓".green().bold(),
        record.keyword.bright_white().bold(),
        record.platform().to_string().cyan()
    );
    println!("  {} {}", "Volume:".blue(), keyword_volume(&record));
    Ok(())
}

pub async fn handle_capture_subdomains(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let page_url = page_url_for(args.get_one::<Url>("url"), args.get_one::<String>("page-url"))
        .map_err(|e| anyhow!(e))?;
    let html = fetch_page(args, TABLE_BODY_SELECTORS, &ctx.settings).await?;

    let page = RouterService::spawn(page_router(
        PageContext::new(page_url, html),
        ctx.background(),
    ));
    let response = page
        .request(Envelope::new(
            Action::ManualScrapeSubdomains.wire_name(),
            Value::Null,
        ))
        .await?;
    let response = expect_success(response)?;

    let data = response.data.unwrap_or_default();
    println!(
        "{} Scraped {} rows: {} new, {} already stored",
        "✓".green().bold(),
        response.count.unwrap_or_default().to_string().cyan(),
        data["added"].as_u64().unwrap_or_default(),
        data["duplicates"].as_u64().unwrap_or_default()
    );
    Ok(())
}

// Keywords

pub async fn handle_keywords_list(ctx: &AppContext) -> Result<()> {
    let keywords: Vec<KeywordRecord> = ctx.store.list().await?;
    if keywords.is_empty() {
        println!("No keywords captured yet.");
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<32} {:<9} {:>10}  {}", "KEYWORD", "PLATFORM", "VOLUME", "CAPTURED").bold()
    );
    for record in &keywords {
        println!(
            "{:<32} {:<9} {:>10}  {}",
            truncate(&record.keyword, 32),
            record.platform().to_string(),
            keyword_volume(record),
            format_millis(record.captured_at).dimmed()
        );
    }
    println!("\n{} keyword(s)", keywords.len());
    Ok(())
}

pub async fn handle_keywords_show(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let keyword = args
        .get_one::<String>("KEYWORD")
        .context("KEYWORD is required")?;
    let keywords: Vec<KeywordRecord> = ctx.store.list().await?;
    let matches = find_keywords(
        &keywords,
        keyword,
        args.get_one::<String>("platform").map(String::as_str),
    );
    if matches.is_empty() {
        bail!("No stored record for keyword '{}'", keyword);
    }
    for record in matches {
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    Ok(())
}

/// Chart bytes to inline in a keyword export. A chart file named by the user
/// wins; otherwise only a `data:` URI captured from the page is used.
pub fn chart_bytes(record: &KeywordRecord, explicit: Option<&str>) -> Result<Option<Vec<u8>>> {
    if let Some(location) = explicit {
        let bytes = read_chart_file(location)
            .with_context(|| format!("Failed to read chart {}", location))?;
        return Ok(Some(bytes));
    }
    Ok(record
        .metrics
        .trends()
        .and_then(|trends| trends.chart_url.as_deref())
        .and_then(resolve_chart))
}

pub async fn handle_keywords_export(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let keyword = args
        .get_one::<String>("KEYWORD")
        .context("KEYWORD is required")?;
    let keywords: Vec<KeywordRecord> = ctx.store.list().await?;
    let matches = find_keywords(
        &keywords,
        keyword,
        args.get_one::<String>("platform").map(String::as_str),
    );
    let record = match matches.as_slice() {
        [] => bail!("No stored record for keyword '{}'", keyword),
        [record] => *record,
        several => {
            let platforms: Vec<String> = several.iter().map(|r| r.platform().to_string()).collect();
            bail!(
                "'{}' was captured on several platforms ({}); pick one with --platform",
                keyword,
                platforms.join(", ")
            )
        }
    };

    let chart = chart_bytes(record, args.get_one::<String>("chart").map(String::as_str))?;
    let chart_url = record
        .metrics
        .trends()
        .and_then(|trends| trends.chart_url.as_deref());
    if let (Some(url), None) = (chart_url, &chart) {
        println!(
            "{} Trend chart {} is not inline; keeping its URL (use --chart to embed a saved image)",
            "→".yellow(),
            url.dimmed()
        );
    }

    let json = keyword_json(record, chart.as_deref())?;
    let path = resolve_output(
        args.get_one::<PathBuf>("output"),
        &ctx.settings.export_dir(),
        &keyword_export_filename(&record.keyword, Utc::now().date_naive()),
    );
    save_report(&json, &path).with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{} Exported to {}",
        "✓".green().bold(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

// Subdomains

fn print_subdomain_rows(records: &[SubdomainRecord]) {
    println!(
        "{}",
        format!(
            "{:<40} {:>10} {:>8} {:>8}  {}",
            "DOMAIN", "TRAFFIC", "DESKTOP", "MOBILE", "TYPE"
        )
        .bold()
    );
    for record in records {
        let kind = if record.is_subdomain {
            "subdomain".cyan()
        } else {
            "subfolder".magenta()
        };
        println!(
            "{:<40} {:>10} {:>8} {:>8}  {}",
            truncate(&record.domain, 40),
            record.traffic,
            record.desktop_share,
            record.mobile_share,
            kind
        );
    }
}

pub async fn handle_subdomains_list(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let view = subdomain_view(args).map_err(|e| anyhow!(e))?;
    let records: Vec<SubdomainRecord> = ctx.store.list().await?;
    let shown = view.apply(&records);

    if shown.is_empty() {
        println!("No matching rows.");
    } else {
        print_subdomain_rows(&shown);
    }
    println!("\nShowing {} of {} row(s)", shown.len(), records.len());
    Ok(())
}

pub async fn handle_subdomains_delete(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let domain = args
        .get_one::<String>("DOMAIN")
        .context("DOMAIN is required")?;
    if ctx.store.delete_subdomain(domain.clone()).await? {
        println!("{} Deleted {}", "✓".green().bold(), domain.bright_white());
    } else {
        println!("{} No row for {}", "→".yellow(), domain.bright_white());
    }
    Ok(())
}

pub async fn handle_subdomains_export(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let view = subdomain_view(args).map_err(|e| anyhow!(e))?;
    let records: Vec<SubdomainRecord> = ctx.store.list().await?;
    let shown = view.apply(&records);
    if shown.is_empty() {
        bail!("Nothing to export");
    }

    let csv = subdomains_csv(&shown)?;
    let path = resolve_output(
        args.get_one::<PathBuf>("output"),
        &ctx.settings.export_dir(),
        &subdomain_export_filename(Utc::now().date_naive()),
    );
    save_report(&csv, &path).with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{} Exported {} row(s) to {}",
        "✓".green().bold(),
        shown.len(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

// Backlinks

fn colored_status(status: LinkStatus) -> colored::ColoredString {
    match status {
        LinkStatus::Pending => status.as_str().white(),
        LinkStatus::Submitted => status.as_str().cyan(),
        LinkStatus::Success => status.as_str().green(),
        LinkStatus::Failed => status.as_str().red(),
        LinkStatus::Ignored => status.as_str().dimmed(),
    }
}

pub async fn handle_backlinks_list(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let status = args
        .get_one::<String>("status")
        .map(|s| s.parse::<LinkStatus>())
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let backlinks: Vec<Backlink> = ctx.store.list().await?;
    let shown = filter_backlinks(&backlinks, status);

    if shown.is_empty() {
        println!("No backlinks.");
        return Ok(());
    }
    println!(
        "{}",
        format!("{:<16} {:<10} {:<44} {}", "ID", "STATUS", "SOURCE", "UPDATED").bold()
    );
    for link in &shown {
        println!(
            "{:<16} {:<10} {:<44} {}",
            truncate(&link.id, 16),
            colored_status(link.status),
            truncate(&link.source_url, 44),
            format_millis(link.updated_at).dimmed()
        );
        if let Some(ref error) = link.error {
            println!("  {} {}", "↳".red(), error);
        }
    }
    println!("\n{} of {} backlink(s)", shown.len(), backlinks.len());
    Ok(())
}

pub async fn handle_backlinks_add(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let id = args.get_one::<String>("ID").context("ID is required")?;
    let source_url = args
        .get_one::<String>("SOURCE_URL")
        .context("SOURCE_URL is required")?;

    let mut backlink = Backlink::new(id.clone(), source_url.clone());
    if let Some(anchor) = args.get_one::<String>("anchor") {
        backlink.anchor = anchor.clone();
    }
    if let Some(target) = args.get_one::<String>("target") {
        backlink.target_url = target.clone();
    }
    if let Some(link_type) = args.get_one::<String>("type") {
        backlink.link_type = link_type.parse::<LinkType>().map_err(|e| anyhow!(e))?;
    }
    if let Some(platform) = args.get_one::<String>("platform") {
        backlink.platform = Platform::parse(platform);
    }
    backlink.nofollow = args.get_flag("nofollow");
    backlink.comment = args.get_one::<String>("comment").cloned();

    let verb = match ctx.store.add_backlink(backlink).await? {
        UpsertOutcome::Added => "Added",
        UpsertOutcome::Updated => "Updated",
    };
    println!("{} {} backlink {}", "✓".green().bold(), verb, id.bright_white());
    Ok(())
}

pub async fn handle_backlinks_status(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let id = args.get_one::<String>("ID").context("ID is required")?;
    let status = args
        .get_one::<String>("STATUS")
        .context("STATUS is required")?
        .parse::<LinkStatus>()
        .map_err(|e| anyhow!(e))?;
    let error = args.get_one::<String>("error").cloned();

    if !ctx
        .store
        .update_backlink_status(id.clone(), status, error)
        .await?
    {
        bail!("No backlink with id '{}'", id);
    }
    println!(
        "{} {} is now {}",
        "✓".green().bold(),
        id.bright_white(),
        colored_status(status)
    );
    Ok(())
}

// Site config

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

fn print_site_config(config: &SiteConfig) {
    let tags = config.tags.join(", ");
    println!("{} {}", "Name:".blue(), or_dash(&config.name));
    println!("{} {}", "Domain:".blue(), or_dash(&config.domain));
    println!("{} {}", "Industry:".blue(), or_dash(&config.industry));
    println!("{} {}", "Tags:".blue(), or_dash(&tags));
}

pub async fn handle_site_show(ctx: &AppContext) -> Result<()> {
    print_site_config(&ctx.store.site_config().await?);
    Ok(())
}

pub async fn handle_site_set(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let mut config = ctx.store.site_config().await?;
    if let Some(name) = args.get_one::<String>("name") {
        config.name = name.clone();
    }
    if let Some(domain) = args.get_one::<String>("domain") {
        config.domain = domain.clone();
    }
    if let Some(industry) = args.get_one::<String>("industry") {
        config.industry = industry.clone();
    }
    ctx.store.save_site_config(config.clone()).await?;
    println!("{} Site config saved", "✓".green().bold());
    print_site_config(&config);
    Ok(())
}

pub async fn handle_site_tag(ctx: &AppContext, args: &ArgMatches, add: bool) -> Result<()> {
    let tag = args.get_one::<String>("TAG").context("TAG is required")?;
    let mut config = ctx.store.site_config().await?;
    let changed = if add {
        config.add_tag(tag)
    } else {
        config.remove_tag(tag)
    };
    if !changed {
        let reason = if add { "blank or already present" } else { "not present" };
        println!("{} Tag '{}' is {}", "→".yellow(), tag, reason);
        return Ok(());
    }
    ctx.store.save_site_config(config.clone()).await?;
    println!("{} Tags: {}", "✓".green().bold(), config.tags.join(", "));
    Ok(())
}

// Raw messages

pub async fn handle_send(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let action = args
        .get_one::<String>("ACTION")
        .context("ACTION is required")?;
    if Action::from_name(action).is_none() {
        println!("{} '{}' is not a known action", "→".yellow(), action);
    }
    let envelope = Envelope::new(
        action.clone(),
        parse_data_arg(args.get_one::<String>("DATA").map(String::as_str)),
    );
    let background = ctx.background();

    // Page actions go to a page router; everything else to the background
    let response = match args.get_one::<String>("page-url") {
        Some(page_url) => {
            let html = match args.get_one::<PathBuf>("file") {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => String::new(),
            };
            let router = page_router(PageContext::new(page_url.clone(), html), background.clone());
            let envelope = envelope.from_page(page_url.clone());
            if router.handles(action) {
                debug!("'{}' handled by the page router", action);
                RouterService::spawn(router).request(envelope).await?
            } else {
                background.request(envelope).await?
            }
        }
        None => background.request(envelope).await?,
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    expect_success(response).map(|_| ())
}

// Whole store

pub async fn handle_export(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let snapshot = ctx.store.export_all().await?;
    let json = snapshot_json(&snapshot)?;
    let path = resolve_output(
        args.get_one::<PathBuf>("output"),
        &ctx.settings.export_dir(),
        &snapshot_export_filename(Utc::now().date_naive()),
    );
    save_report(&json, &path).with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{} Exported {} keyword(s), {} subdomain row(s), {} backlink(s) to {}",
        "✓".green().bold(),
        snapshot.keywords.len(),
        snapshot.subdomains.len(),
        snapshot.backlinks.len(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

pub async fn handle_clear(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    if !args.get_flag("force") {
        println!(
            "{} This deletes every keyword, subdomain row, backlink and the site config in {}",
            "⚠".yellow().bold(),
            ctx.db_path.display().to_string().bright_white()
        );
        let response = print_prompt("Do you want to continue? [y/N]:");
        if !confirmed(&response) {
            println!("{} Nothing deleted.", "✗".red().bold());
            return Ok(());
        }
    }
    ctx.store.clear_all().await?;
    ctx.store.initialize().await?;
    println!("{} All stored data cleared", "✓".green().bold());
    Ok(())
}

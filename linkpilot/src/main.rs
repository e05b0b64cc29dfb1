use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use linkpilot::handlers::*;
use linkpilot_core::print_banner;
use std::path::PathBuf;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    init_tracing(verbose);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        return;
    }

    if let Err(e) = run(&chosen_command).await {
        eprintln!("{} {}", "✗".red().bold(), format!("{:#}", e).red());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(chosen_command: &ArgMatches) -> anyhow::Result<()> {
    if let Some(("init", primary_command)) = chosen_command.subcommand() {
        return handle_init(primary_command);
    }

    let ctx = AppContext::open(chosen_command.get_one::<PathBuf>("db")).await?;

    match chosen_command.subcommand() {
        Some(("capture", primary_command)) => match primary_command.subcommand() {
            Some(("keyword", secondary_command)) => {
                handle_capture_keyword(&ctx, secondary_command).await
            }
            Some(("subdomains", secondary_command)) => {
                handle_capture_subdomains(&ctx, secondary_command).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("keywords", primary_command)) => match primary_command.subcommand() {
            Some(("list", _)) => handle_keywords_list(&ctx).await,
            Some(("show", secondary_command)) => handle_keywords_show(&ctx, secondary_command).await,
            Some(("export", secondary_command)) => {
                handle_keywords_export(&ctx, secondary_command).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("subdomains", primary_command)) => match primary_command.subcommand() {
            Some(("list", secondary_command)) => {
                handle_subdomains_list(&ctx, secondary_command).await
            }
            Some(("delete", secondary_command)) => {
                handle_subdomains_delete(&ctx, secondary_command).await
            }
            Some(("export", secondary_command)) => {
                handle_subdomains_export(&ctx, secondary_command).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("backlinks", primary_command)) => match primary_command.subcommand() {
            Some(("list", secondary_command)) => handle_backlinks_list(&ctx, secondary_command).await,
            Some(("add", secondary_command)) => handle_backlinks_add(&ctx, secondary_command).await,
            Some(("status", secondary_command)) => {
                handle_backlinks_status(&ctx, secondary_command).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("site", primary_command)) => match primary_command.subcommand() {
            Some(("show", _)) => handle_site_show(&ctx).await,
            Some(("set", secondary_command)) => handle_site_set(&ctx, secondary_command).await,
            Some(("tag-add", secondary_command)) => {
                handle_site_tag(&ctx, secondary_command, true).await
            }
            Some(("tag-remove", secondary_command)) => {
                handle_site_tag(&ctx, secondary_command, false).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("send", primary_command)) => handle_send(&ctx, primary_command).await,
        Some(("export", primary_command)) => handle_export(&ctx, primary_command).await,
        Some(("clear", primary_command)) => handle_clear(&ctx, primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

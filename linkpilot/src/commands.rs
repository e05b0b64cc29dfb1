use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;
use url::Url;

fn page_source_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-u --"url" <URL>)
            .required(false)
            .help("Fetch the page from this URL")
            .value_parser(clap::value_parser!(Url))
            .conflicts_with("file"),
    )
    .arg(
        arg!(-F --"file" <PATH>)
            .required(false)
            .help("Read a saved copy of the page from disk")
            .value_parser(clap::value_parser!(PathBuf))
            .conflicts_with("url"),
    )
    .arg(
        arg!(-p --"page-url" <URL>)
            .required(false)
            .help("Address the page was loaded from (defaults to --url; required with --file)"),
    )
    .group(
        clap::ArgGroup::new("source")
            .args(["url", "file"])
            .required(true),
    )
}

fn subdomain_view_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-k --"kind" <KIND>)
            .required(false)
            .help("Which rows to show")
            .value_parser(["all", "subdomain", "subfolder"])
            .default_value("all"),
    )
    .arg(
        arg!(-s --"search" <QUERY>)
            .required(false)
            .help("Case-insensitive match on domain, link or parent domain"),
    )
    .arg(
        arg!(--"sort" <KEY>)
            .required(false)
            .value_parser(["domain", "traffic"])
            .default_value("traffic"),
    )
    .arg(
        arg!(--"order" <ORDER>)
            .required(false)
            .value_parser(["asc", "desc"])
            .default_value("desc"),
    )
}

fn output_arg() -> clap::Arg {
    arg!(-o --"output" <PATH>)
        .required(false)
        .help("Write to this file (default: export_dir from config.toml)")
        .value_parser(clap::value_parser!(PathBuf))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkpilot")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkpilot")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log debug output to stderr").required(false))
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Use this database instead of the one in the config directory")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the linkpilot config directory and database")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the config directory")
                        .default_value("~/.config/linkpilot/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite any existing database and config without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("capture")
                .about("Scrape an analytics page and store what it shows")
                .subcommand_required(true)
                .subcommand(page_source_args(
                    command!("keyword").about("Capture the metrics of a keyword overview page"),
                ))
                .subcommand(page_source_args(
                    command!("subdomains")
                        .about("Capture the rows of a subfolder/subdomain traffic report"),
                )),
        )
        .subcommand(
            command!("keywords")
                .about("Stored keyword records")
                .subcommand_required(true)
                .subcommand(command!("list").about("List captured keywords"))
                .subcommand(
                    command!("show")
                        .about("Print the stored record of a keyword")
                        .arg(arg!(<KEYWORD>).help("The keyword"))
                        .arg(
                            arg!(--"platform" <PLATFORM>)
                                .required(false)
                                .help("Only the record captured from this platform"),
                        ),
                )
                .subcommand(
                    command!("export")
                        .about("Export a keyword record as JSON")
                        .arg(arg!(<KEYWORD>).help("The keyword"))
                        .arg(
                            arg!(--"platform" <PLATFORM>)
                                .required(false)
                                .help("Only the record captured from this platform"),
                        )
                        .arg(
                            arg!(--"chart" <PATH>)
                                .required(false)
                                .help("Inline this trend chart image (path or file:// URL)"),
                        )
                        .arg(output_arg()),
                ),
        )
        .subcommand(
            command!("subdomains")
                .about("Stored subfolder/subdomain rows")
                .subcommand_required(true)
                .subcommand(subdomain_view_args(
                    command!("list").about("List rows, filtered and sorted"),
                ))
                .subcommand(
                    command!("delete")
                        .about("Delete a row by domain")
                        .arg(arg!(<DOMAIN>).help("The domain column of the row")),
                )
                .subcommand(subdomain_view_args(
                    command!("export").about("Export the filtered and sorted rows as CSV"),
                )
                .arg(output_arg())),
        )
        .subcommand(
            command!("backlinks")
                .about("Backlink submission tracking")
                .subcommand_required(true)
                .subcommand(
                    command!("list").about("List backlinks, newest first").arg(
                        arg!(-s --"status" <STATUS>)
                            .required(false)
                            .help("Only backlinks with this status")
                            .value_parser(["pending", "submitted", "success", "failed", "ignored"]),
                    ),
                )
                .subcommand(
                    command!("add")
                        .about("Add or replace a backlink")
                        .arg(arg!(<ID>).help("Unique backlink id"))
                        .arg(arg!(<SOURCE_URL>).help("Page the link is placed on"))
                        .arg(arg!(--"anchor" <TEXT>).required(false))
                        .arg(arg!(--"target" <URL>).required(false).help("Page the link points to"))
                        .arg(
                            arg!(--"type" <TYPE>)
                                .required(false)
                                .value_parser(["blog", "forum", "directory", "paid", "other"])
                                .default_value("other"),
                        )
                        .arg(arg!(--"platform" <PLATFORM>).required(false))
                        .arg(arg!(--"nofollow" "The link is marked nofollow").required(false))
                        .arg(arg!(--"comment" <TEXT>).required(false)),
                )
                .subcommand(
                    command!("status")
                        .about("Set the status of a backlink")
                        .arg(arg!(<ID>).help("Backlink id"))
                        .arg(
                            arg!(<STATUS>)
                                .value_parser(["pending", "submitted", "success", "failed", "ignored"]),
                        )
                        .arg(
                            arg!(--"error" <MESSAGE>)
                                .required(false)
                                .help("Why the submission failed"),
                        ),
                ),
        )
        .subcommand(
            command!("site")
                .about("The site being promoted")
                .subcommand_required(true)
                .subcommand(command!("show").about("Print the site config"))
                .subcommand(
                    command!("set")
                        .about("Update site config fields")
                        .arg(arg!(--"name" <NAME>).required(false))
                        .arg(arg!(--"domain" <DOMAIN>).required(false))
                        .arg(arg!(--"industry" <INDUSTRY>).required(false)),
                )
                .subcommand(command!("tag-add").about("Add a tag").arg(arg!(<TAG>)))
                .subcommand(command!("tag-remove").about("Remove a tag").arg(arg!(<TAG>))),
        )
        .subcommand(
            command!("send")
                .about("Send a raw message and print the response")
                .arg(arg!(<ACTION>).help("Action name, e.g. get_all_keywords"))
                .arg(
                    arg!([DATA])
                        .required(false)
                        .help("JSON payload; anything that is not JSON is sent as a string"),
                )
                .arg(
                    arg!(-p --"page-url" <URL>)
                        .required(false)
                        .help("Also offer the message to a page router for this URL"),
                )
                .arg(
                    arg!(-F --"file" <PATH>)
                        .required(false)
                        .requires("page-url")
                        .help("Saved HTML of that page")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("export")
                .about("Export every stored collection as one JSON document")
                .arg(output_arg()),
        )
        .subcommand(
            command!("clear")
                .about("Delete all stored data")
                .arg(
                    arg!(-f - -"force")
                        .help("Don't ask for confirmation")
                        .required(false),
                ),
        )
}

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod router;
pub mod store;
pub mod view;

use colored::Colorize;

pub use error::{ChannelError, ConfigError, ExportError, RouterError, StoreError};
pub use model::{Backlink, Collection, LinkStatus, LinkType, SiteConfig, StorageSnapshot};
pub use router::{
    Action, Envelope, PageContext, Response, Router, RouterService, UnmatchedPolicy,
    background_router, page_router,
};
pub use store::{BatchOutcome, LocalStore, UpsertOutcome};

pub fn print_banner() {
    let banner = r#"
    __    _       __   ____  _ __      __
   / /   (_)___  / /__/ __ \(_) /___  / /_
  / /   / / __ \/ //_/ /_/ / / / __ \/ __/
 / /___/ / / / / ,< / ____/ / / /_/ / /_
/_____/_/_/ /_/_/|_/_/   /_/_/\____/\__/
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "    {} {}\n",
        "keyword & subdomain metrics collector".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

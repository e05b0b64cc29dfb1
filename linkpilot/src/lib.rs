pub mod handlers;

pub use handlers::{
    AppContext, chart_bytes, find_keywords, keyword_volume, page_url_for, parse_data_arg,
    resolve_output,
};

//! Built-in tools

mod web_search;

pub use web_search::{DEFAULT_RESULT_LIMIT, DuckDuckGo, SearchBackend, WebSearchTool};

pub mod http;

// Data sources built on the HTTP capability
pub mod currency_list;
pub mod fallback;
pub mod rate_source;
pub mod series_source;

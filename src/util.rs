mod date;

pub use date::{parse_date, parse_date_or_now};

pub const USER_AGENT: &str =
  concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

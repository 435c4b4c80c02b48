use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

const COMMON_DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",    // Common format without timezone
  "%Y-%m-%d %H:%M:%S %z", // Common format with timezone
];

pub fn parse_date(date_str: impl AsRef<str>) -> Option<DateTime<FixedOffset>> {
  let date_str = date_str.as_ref().trim();
  if date_str.is_empty() {
    return None;
  }

  if let Ok(parsed) = DateTime::parse_from_rfc2822(date_str) {
    return Some(parsed);
  }

  if let Ok(parsed) = DateTime::parse_from_rfc3339(date_str) {
    return Some(parsed);
  }

  for fmt in COMMON_DATE_FORMATS {
    if let Ok(parsed) = DateTime::parse_from_str(date_str, fmt) {
      return Some(parsed);
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(date_str, fmt) {
      return Some(local_or_utc(parsed));
    }
  }

  // date only
  NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(local_or_utc)
}

/// Missing or unreadable publish dates fall back to the current time
/// instead of failing the item.
pub fn parse_date_or_now(date_str: Option<&str>) -> DateTime<FixedOffset> {
  if let Some(parsed) = date_str.and_then(parse_date) {
    return parsed;
  }

  debug!("publish date {:?} not parseable, using now", date_str);
  Utc::now().fixed_offset()
}

// try local time, fallback to UTC
fn local_or_utc(parsed: NaiveDateTime) -> DateTime<FixedOffset> {
  parsed
    .and_local_timezone(Local)
    .earliest()
    .map(|date| date.fixed_offset())
    .unwrap_or_else(|| parsed.and_utc().fixed_offset())
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_parse_rss_pub_date() {
    let date = parse_date("Mon, 01 Jan 2024 23:00:00 -0500").unwrap();
    assert_eq!(date.to_rfc3339(), "2024-01-01T23:00:00-05:00");
  }

  #[test]
  fn test_parse_rfc3339() {
    let date = parse_date("2021-05-04T10:20:30+02:00").unwrap();
    assert_eq!(date.to_utc().to_rfc3339(), "2021-05-04T08:20:30+00:00");
  }

  #[test]
  fn test_parse_date_only() {
    let date = parse_date("2024-02-03").unwrap();
    assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-02-03");
  }

  #[test]
  fn test_unparseable() {
    assert!(parse_date("").is_none());
    assert!(parse_date("   ").is_none());
    assert!(parse_date("yesterday-ish").is_none());
  }

  #[test]
  fn test_fallback_to_now() {
    let before = Utc::now();
    let date = parse_date_or_now(Some("not a date"));
    let after = Utc::now();
    assert!(date.to_utc() >= before && date.to_utc() <= after);

    let date = parse_date_or_now(None);
    assert!((Utc::now() - date.to_utc()).num_seconds().abs() < 5);
  }
}

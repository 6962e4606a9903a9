use chrono::{DateTime, NaiveDateTime, Utc};

/// Accepts RFC 3339 or the zone-less `yyyy-MM-ddTHH:mm:ss[.fff]` form the
/// metrics service emits; the latter is taken as UTC.
pub fn parse_observed_at(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(feature = "web")]
pub fn pad2(n: i32) -> String {
    if n < 10 {
        format!("0{}", n)
    } else {
        n.to_string()
    }
}

/// Local time of day (`HH:MM:SS`) for a snapshot timestamp. Unparsable input
/// is returned unchanged.
#[cfg(feature = "web")]
pub fn format_time_of_day(ts: &str) -> String {
    use js_sys::Date;
    let Some(dt) = parse_observed_at(ts) else {
        return ts.to_string();
    };
    let d = Date::new(&wasm_bindgen::JsValue::from_f64(dt.timestamp_millis() as f64));
    if d.get_time().is_nan() {
        return ts.to_string();
    }
    format!(
        "{}:{}:{}",
        pad2(d.get_hours() as i32),
        pad2(d.get_minutes() as i32),
        pad2(d.get_seconds() as i32)
    )
}

#[cfg(not(feature = "web"))]
pub fn format_time_of_day(ts: &str) -> String {
    match parse_observed_at(ts) {
        Some(dt) => dt.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

pub fn format_minutes(minutes: f64) -> String {
    format!("{:.2}", minutes)
}

pub fn format_rides(count: u64) -> String {
    format!("{} rides", count)
}

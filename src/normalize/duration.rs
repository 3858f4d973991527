/// Parse a feed duration into whole seconds.
///
/// Accepts plain seconds (`"90"`, `"90.5"`) or colon-delimited `H:MM:SS` /
/// `MM:SS`. Anything else yields `None`.
pub fn parse_duration(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if !raw.contains(':') {
        return parse_plain_seconds(raw);
    }

    let parts: Option<Vec<u64>> = raw.split(':').map(parse_segment).collect();
    match parts?.as_slice() {
        [h, m, s] => h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}

fn parse_plain_seconds(raw: &str) -> Option<u64> {
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    raw.parse::<f64>().ok().and_then(seconds_from_f64)
}

/// Whole seconds from a fractional count. `None` for negative, non-finite
/// or out-of-range values.
pub fn seconds_from_f64(secs: f64) -> Option<u64> {
    (secs.is_finite() && secs >= 0.0 && secs < u64::MAX as f64).then(|| secs.floor() as u64)
}

fn parse_segment(segment: &str) -> Option<u64> {
    let segment = segment.trim();
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Short human label: `"1h 5m"`, `"12 min"`, or `"0:00"` when unknown.
pub fn format_duration(seconds: Option<u64>) -> String {
    match seconds {
        None | Some(0) => "0:00".to_string(),
        Some(secs) => {
            let hours = secs / 3600;
            let minutes = (secs % 3600) / 60;
            if hours > 0 {
                format!("{}h {}m", hours, minutes)
            } else {
                format!("{} min", minutes)
            }
        }
    }
}

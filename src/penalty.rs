use chrono::Duration;
use tracing::{debug, warn};

use crate::models::Penalties;

/// Parses `[-]PnDTnHnMn.nS`. Returns `None` for anything else.
pub fn parse_iso_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (negate, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let rest = rest.strip_prefix(['P', 'p'])?;

    let (date_part, time_part) = match rest.find(['T', 't']) {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };
    if date_part.is_empty() && time_part.is_none() {
        return None;
    }

    let mut total = Duration::zero();
    if !date_part.is_empty() {
        let days = date_part.strip_suffix(['D', 'd'])?;
        total = total.checked_add(&Duration::try_days(days.parse().ok()?)?)?;
    }

    if let Some(time) = time_part {
        if time.is_empty() {
            return None;
        }
        let mut remaining = time;
        for (units, scale) in [(['H', 'h'], 3600i64), (['M', 'm'], 60)] {
            if let Some(idx) = remaining.find(units) {
                let value: i64 = remaining[..idx].parse().ok()?;
                total = total.checked_add(&Duration::try_seconds(value.checked_mul(scale)?)?)?;
                remaining = &remaining[idx + 1..];
            }
        }
        if !remaining.is_empty() {
            let seconds = remaining.strip_suffix(['S', 's'])?;
            total = total.checked_add(&parse_seconds(seconds)?)?;
        }
    }

    Some(if negate { -total } else { total })
}

fn parse_seconds(text: &str) -> Option<Duration> {
    let (whole, fraction) = match text.find(['.', ',']) {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };
    let seconds = Duration::try_seconds(whole.parse().ok()?)?;
    let Some(fraction) = fraction else {
        return Some(seconds);
    };
    if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nanos = Duration::nanoseconds(format!("{fraction:0<9}").parse().ok()?);
    Some(if whole.starts_with('-') {
        seconds - nanos
    } else {
        seconds + nanos
    })
}

/// Absent, blank or unparseable values become zero. Unparseable input is logged, never raised.
pub fn duration_or_zero(field: &str, value: Option<&str>) -> Duration {
    let text = match value.map(str::trim) {
        None | Some("") => {
            debug!(field, "no duration supplied, using zero");
            return Duration::zero();
        }
        Some(text) => text,
    };
    match parse_iso_duration(text) {
        Some(duration) => duration,
        None => {
            warn!(field, value = text, "unparseable duration, using zero");
            Duration::zero()
        }
    }
}

/// Whole seconds, rounded towards negative infinity.
pub fn floor_seconds(duration: Duration) -> i64 {
    let whole = duration.num_seconds();
    if duration < Duration::seconds(whole) {
        whole - 1
    } else {
        whole
    }
}

/// `elapsed + waypoint + speed - discount`, no clamping.
pub fn adjusted_seconds(elapsed_time_seconds: Option<i64>, penalties: &Penalties) -> i64 {
    elapsed_time_seconds.unwrap_or(0) + floor_seconds(penalties.waypoint)
        + floor_seconds(penalties.speed)
        - floor_seconds(penalties.discount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn penalties(waypoint: i64, speed: i64, discount: i64) -> Penalties {
        Penalties {
            waypoint: Duration::seconds(waypoint),
            speed: Duration::seconds(speed),
            discount: Duration::seconds(discount),
        }
    }

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_iso_duration("PT30S"), Some(Duration::seconds(30)));
        assert_eq!(parse_iso_duration("PT1M30S"), Some(Duration::seconds(90)));
        assert_eq!(parse_iso_duration("PT2H"), Some(Duration::hours(2)));
        assert_eq!(
            parse_iso_duration("P1DT1H1M1S"),
            Some(Duration::seconds(86_400 + 3_600 + 61))
        );
        assert_eq!(parse_iso_duration("pt5m"), Some(Duration::minutes(5)));
        assert_eq!(parse_iso_duration("PT0S"), Some(Duration::zero()));
    }

    #[test]
    fn parses_signs_and_fractions() {
        assert_eq!(parse_iso_duration("-PT10S"), Some(Duration::seconds(-10)));
        assert_eq!(parse_iso_duration("PT-6H3M"), Some(Duration::seconds(-6 * 3600 + 180)));
        assert_eq!(parse_iso_duration("PT1.5S"), Some(Duration::milliseconds(1500)));
        assert_eq!(parse_iso_duration("PT-0.5S"), Some(Duration::milliseconds(-500)));
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "P", "PT", "30S", "PT30", "PTS", "PT1S2M", "P1W", "abc", "PT1.1234567890S"] {
            assert_eq!(parse_iso_duration(text), None, "{text}");
        }
    }

    #[test]
    fn unparseable_falls_back_to_zero() {
        assert_eq!(duration_or_zero("penaltySpeed", Some("ten seconds")), Duration::zero());
        assert_eq!(duration_or_zero("penaltySpeed", None), Duration::zero());
        assert_eq!(duration_or_zero("penaltySpeed", Some("  ")), Duration::zero());
        assert_eq!(duration_or_zero("penaltySpeed", Some("PT45S")), Duration::seconds(45));
    }

    #[test]
    fn floors_towards_negative_infinity() {
        assert_eq!(floor_seconds(Duration::milliseconds(1500)), 1);
        assert_eq!(floor_seconds(Duration::milliseconds(-1500)), -2);
        assert_eq!(floor_seconds(Duration::seconds(-3)), -3);
    }

    #[test]
    fn adjusts_elapsed_time() {
        assert_eq!(adjusted_seconds(Some(330), &penalties(30, 0, 10)), 350);
        assert_eq!(adjusted_seconds(None, &penalties(30, 15, 0)), 45);
        assert_eq!(adjusted_seconds(Some(100), &Penalties::default()), 100);
    }

    #[test]
    fn large_discount_goes_negative() {
        assert_eq!(adjusted_seconds(Some(20), &penalties(0, 0, 50)), -30);
    }
}

//! Human-readable durations (`"15s"`, `"1m0s"`, `"1h2m3.5s"`).
//!
//! Durations in desired state are written as unit-suffixed strings rather than
//! raw integers. Formatting always produces the canonical form: hours and
//! minutes are spelled out once a larger unit is present, and sub-second
//! values use the largest unit that keeps the integer part non-zero.

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ConvertError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(StdDuration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(StdDuration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(StdDuration::from_millis(millis))
    }

    pub fn as_std(&self) -> StdDuration {
        self.0
    }

    /// Whole seconds, as sent to the provider.
    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl From<StdDuration> for Duration {
    fn from(d: StdDuration) -> Self {
        Self(d)
    }
}

impl From<Duration> for StdDuration {
    fn from(d: Duration) -> Self {
        d.0
    }
}

/// `value / scale` with the fractional part trimmed of trailing zeros.
fn fixed_point(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }

        if nanos < NANOS_PER_SEC {
            let (scale, unit) = if nanos < NANOS_PER_MICRO {
                (1, "ns")
            } else if nanos < NANOS_PER_MILLI {
                (NANOS_PER_MICRO, "µs")
            } else {
                (NANOS_PER_MILLI, "ms")
            };
            return write!(f, "{}{}", fixed_point(nanos, scale), unit);
        }

        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
        let seconds = nanos % NANOS_PER_MIN;

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        write!(f, "{}s", fixed_point(seconds, NANOS_PER_SEC))
    }
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

impl FromStr for Duration {
    type Err = ConvertError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConvertError::InvalidDuration {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("empty"));
        }
        if input == "0" {
            return Ok(Self::default());
        }

        let mut rest = input;
        let mut total: u128 = 0;

        while !rest.is_empty() {
            let int_len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let (int_part, after) = rest.split_at(int_len);

            let (frac_part, after) = match after.strip_prefix('.') {
                Some(tail) => {
                    let len = tail
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(tail.len());
                    tail.split_at(len)
                }
                None => ("", after),
            };
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(invalid("expected a number"));
            }

            let unit_len = after
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(after.len());
            let (unit, next) = after.split_at(unit_len);
            if unit.is_empty() {
                return Err(invalid("missing unit"));
            }
            let scale = unit_scale(unit).ok_or_else(|| invalid("unknown unit"))?;

            let whole: u128 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| invalid("number out of range"))?
            };
            let mut value = whole
                .checked_mul(scale)
                .ok_or_else(|| invalid("number out of range"))?;

            let mut place = scale;
            for digit in frac_part.bytes() {
                place /= 10;
                if place == 0 {
                    break;
                }
                value += u128::from(digit - b'0') * place;
            }

            total = total
                .checked_add(value)
                .ok_or_else(|| invalid("number out of range"))?;
            rest = next;
        }

        let nanos = u64::try_from(total).map_err(|_| invalid("number out of range"))?;
        Ok(Self(StdDuration::from_nanos(nanos)))
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration such as \"30s\" or \"1m0s\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Duration {
        s.parse().unwrap()
    }

    #[test]
    fn test_format() {
        assert_eq!(Duration::from_secs(0).to_string(), "0s");
        assert_eq!(Duration::from_secs(15).to_string(), "15s");
        assert_eq!(Duration::from_secs(60).to_string(), "1m0s");
        assert_eq!(Duration::from_secs(330).to_string(), "5m30s");
        assert_eq!(Duration::from_secs(3600).to_string(), "1h0m0s");
        assert_eq!(Duration::from_millis(3_723_500).to_string(), "1h2m3.5s");
        assert_eq!(Duration::from_millis(250).to_string(), "250ms");
        assert_eq!(Duration::from(StdDuration::from_nanos(1500)).to_string(), "1.5µs");
        assert_eq!(Duration::from(StdDuration::from_nanos(42)).to_string(), "42ns");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("1m").as_std(), StdDuration::from_secs(60));
        assert_eq!(parse("1m0s").as_std(), StdDuration::from_secs(60));
        assert_eq!(parse("90s").as_std(), StdDuration::from_secs(90));
        assert_eq!(parse("1.5h").as_std(), StdDuration::from_secs(5400));
        assert_eq!(parse("2h45m").as_std(), StdDuration::from_secs(9900));
        assert_eq!(parse("300ms").as_std(), StdDuration::from_millis(300));
        assert_eq!(parse("10us").as_std(), StdDuration::from_micros(10));
        assert_eq!(parse(".5s").as_std(), StdDuration::from_millis(500));
        assert_eq!(parse("0").as_std(), StdDuration::ZERO);
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "5", "1x", "m", "-1s", "1.s.", "1h2"] {
            assert!(input.parse::<Duration>().is_err(), "{input:?}");
        }
    }

    #[test]
    fn test_canonical_forms_survive_reparse() {
        for canonical in ["0s", "15s", "1m0s", "5m30s", "1h0m0s", "1h2m3.5s", "250ms", "1.5µs"] {
            assert_eq!(parse(canonical).to_string(), canonical);
        }
    }

    #[test]
    fn test_serde() {
        #[derive(Serialize, Deserialize)]
        struct Example {
            name: String,
            duration: Option<Duration>,
        }

        let json = serde_json::to_string(&Example {
            name: "probe".to_string(),
            duration: Some(Duration::from_secs(60)),
        })
        .unwrap();
        assert_eq!(json, r#"{"name":"probe","duration":"1m0s"}"#);

        let decoded: Example = serde_json::from_str(r#"{"name":"probe","duration":"1m"}"#).unwrap();
        assert_eq!(decoded.duration, Some(Duration::from_secs(60)));

        let decoded: Example = serde_json::from_str(r#"{"name":"probe","duration":null}"#).unwrap();
        assert_eq!(decoded.duration, None);

        assert!(serde_json::from_str::<Example>(r#"{"name":"probe","duration":"soon"}"#).is_err());
    }
}

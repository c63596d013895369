//! Type-directed conversion of raw record values into GraphQL scalars.
//!
//! Everything here is pure: warnings are handed back to the caller, which
//! decides where to log them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::errors::CoercionError;
use crate::value::Scalar;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// The scalar families the coercer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    /// `String`, `ID` and any custom scalar.
    Text,
}

impl ScalarKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Int" | "Long" => ScalarKind::Int,
            "Float" | "Decimal" => ScalarKind::Float,
            "Boolean" => ScalarKind::Boolean,
            "Date" => ScalarKind::Date,
            "DateTime" => ScalarKind::DateTime,
            "Time" => ScalarKind::Time,
            _ => ScalarKind::Text,
        }
    }
}

/// Defaults to full ISO-8601 timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceOptions {
    /// Always emit full ISO-8601 timestamps; otherwise bare dates stay
    /// `YYYY-MM-DD`.
    pub iso_dates: bool,
}

impl CoerceOptions {
    pub fn iso() -> Self {
        Self { iso_dates: true }
    }
}

impl Default for CoerceOptions {
    fn default() -> Self {
        Self::iso()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Scalar,
    pub warning: Option<String>,
}

impl Coerced {
    fn ok(value: Scalar) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    fn fallback(default: Scalar, warning: String) -> Self {
        Self {
            value: default,
            warning: Some(warning),
        }
    }
}

/// Converts `raw` into the literal required by the scalar `type_name`.
///
/// Unparsable numbers and booleans yield `default` plus a warning; malformed
/// dates and times are hard errors.
pub fn coerce(
    type_name: &str,
    raw: &Value,
    default: Scalar,
    options: CoerceOptions,
) -> Result<Coerced, CoercionError> {
    if is_blank(raw) {
        return Ok(Coerced::ok(default));
    }

    match ScalarKind::from_type_name(type_name) {
        ScalarKind::Int | ScalarKind::Float => Ok(coerce_number(type_name, raw, default)),
        ScalarKind::Boolean => Ok(coerce_boolean(raw, default)),
        kind @ (ScalarKind::Date | ScalarKind::DateTime) => {
            coerce_date(type_name, kind, raw, options).map(Coerced::ok)
        }
        ScalarKind::Time => coerce_time(raw).map(Coerced::ok),
        ScalarKind::Text => Ok(Coerced::ok(coerce_text(raw))),
    }
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce_number(type_name: &str, raw: &Value, default: Scalar) -> Coerced {
    let integral = ScalarKind::from_type_name(type_name) == ScalarKind::Int;
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Coerced::ok(Scalar::Int(i))
            } else {
                match n.as_f64() {
                    Some(f) if integral && f.abs() < i64::MAX as f64 => {
                        Coerced::ok(Scalar::Int(f.trunc() as i64))
                    }
                    Some(f) => Coerced::ok(Scalar::Float(f)),
                    None => Coerced::fallback(default, format!("{n} is not a representable {type_name}")),
                }
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if integral {
                if let Ok(i) = s.parse::<i64>() {
                    return Coerced::ok(Scalar::Int(i));
                }
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() && integral && f.abs() < i64::MAX as f64 => {
                    Coerced::ok(Scalar::Int(f.trunc() as i64))
                }
                Ok(f) if f.is_finite() && !integral => Coerced::ok(Scalar::Float(f)),
                _ => Coerced::fallback(default, format!("'{s}' is not a valid {type_name}")),
            }
        }
        other => Coerced::fallback(default, format!("{other} is not a valid {type_name}")),
    }
}

fn coerce_boolean(raw: &Value, default: Scalar) -> Coerced {
    match raw {
        Value::Bool(b) => Coerced::ok(Scalar::Boolean(*b)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => {
            Coerced::ok(Scalar::Boolean(true))
        }
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => {
            Coerced::ok(Scalar::Boolean(false))
        }
        other => Coerced::fallback(default, format!("{other} is not a valid Boolean")),
    }
}

fn coerce_date(
    type_name: &str,
    kind: ScalarKind,
    raw: &Value,
    options: CoerceOptions,
) -> Result<Scalar, CoercionError> {
    let invalid = || CoercionError::InvalidDate {
        type_name: type_name.to_string(),
        value: raw_text(raw),
    };

    let (timestamp, bare_date) = match raw {
        Value::String(s) => parse_datetime(s.trim()).ok_or_else(invalid)?,
        Value::Number(n) => {
            let millis = n.as_i64().ok_or_else(invalid)?;
            (DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?, false)
        }
        _ => return Err(invalid()),
    };

    if bare_date && !options.iso_dates && kind == ScalarKind::Date {
        return Ok(Scalar::Date(timestamp.format("%Y-%m-%d").to_string()));
    }
    Ok(Scalar::Date(
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

/// Parses the date/time spellings found in exported data. Returns the instant
/// and whether the input was a bare calendar date.
fn parse_datetime(s: &str) -> Option<(DateTime<Utc>, bool)> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some((parsed.with_timezone(&Utc), false));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some((naive.and_utc(), false));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some((date.and_time(NaiveTime::MIN).and_utc(), true));
        }
    }
    None
}

fn coerce_time(raw: &Value) -> Result<Scalar, CoercionError> {
    let Value::String(s) = raw else {
        return Err(CoercionError::InvalidTime(raw_text(raw)));
    };
    let trimmed = s.trim();
    let clock = strip_utc_offset(trimmed);
    if TIME_FORMATS
        .iter()
        .any(|format| NaiveTime::parse_from_str(clock, format).is_ok())
    {
        Ok(Scalar::Time(s.clone()))
    } else {
        Err(CoercionError::InvalidTime(s.clone()))
    }
}

/// Drops a trailing `Z`, `+HH:MM`, `-HH:MM` or `+HHMM` designator.
fn strip_utc_offset(s: &str) -> &str {
    if let Some(stripped) = s.strip_suffix(['Z', 'z']) {
        return stripped;
    }
    if let Some(idx) = s.rfind(['+', '-']) {
        let offset = &s[idx + 1..];
        let digits: String = offset.chars().filter(|c| *c != ':').collect();
        if idx > 0 && digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
            return &s[..idx];
        }
    }
    s
}

fn coerce_text(raw: &Value) -> Scalar {
    match raw {
        Value::String(s) => Scalar::String(s.clone()),
        other => Scalar::String(other.to_string()),
    }
}

fn raw_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn value(type_name: &str, raw: Value, options: CoerceOptions) -> Scalar {
        coerce(type_name, &raw, Scalar::Null, options).unwrap().value
    }

    #[test]
    fn booleans_are_case_insensitive() {
        assert_eq!(value("Boolean", json!("TRUE"), CoerceOptions::default()), Scalar::Boolean(true));
        assert_eq!(value("Boolean", json!("False"), CoerceOptions::default()), Scalar::Boolean(false));
        assert_eq!(value("Boolean", json!(true), CoerceOptions::default()), Scalar::Boolean(true));

        let fallback = coerce("Boolean", &json!("yes"), Scalar::Boolean(false), CoerceOptions::default()).unwrap();
        assert_eq!(fallback.value, Scalar::Boolean(false));
        assert!(fallback.warning.is_some());
    }

    #[test]
    fn unparsable_numbers_fall_back_with_warning() {
        let coerced = coerce("Int", &json!("abc"), Scalar::Null, CoerceOptions::default()).unwrap();
        assert_eq!(coerced.value, Scalar::Null);
        assert!(coerced.warning.unwrap().contains("abc"));

        let coerced = coerce("Float", &json!(true), Scalar::Float(0.0), CoerceOptions::default()).unwrap();
        assert_eq!(coerced.value, Scalar::Float(0.0));
        assert!(coerced.warning.is_some());
    }

    #[test]
    fn numbers_parse_from_strings_and_pass_through() {
        let opts = CoerceOptions::default();
        assert_eq!(value("Int", json!(" 42 "), opts), Scalar::Int(42));
        assert_eq!(value("Int", json!("3.7"), opts), Scalar::Int(3));
        assert_eq!(value("Int", json!(7), opts), Scalar::Int(7));
        assert_eq!(value("Float", json!("2.5"), opts), Scalar::Float(2.5));
        assert_eq!(value("Float", json!(2.5), opts), Scalar::Float(2.5));
        assert_eq!(value("Float", json!(4), opts), Scalar::Int(4));
    }

    #[test]
    fn blanks_become_the_default_silently() {
        for raw in [json!(null), json!(""), json!("   ")] {
            let coerced = coerce("Int", &raw, Scalar::Int(0), CoerceOptions::default()).unwrap();
            assert_eq!(coerced, Coerced::ok(Scalar::Int(0)));
        }
    }

    #[test]
    fn dates_normalize_to_iso() {
        let iso = CoerceOptions::iso();
        assert_eq!(
            value("Date", json!("2020-01-05"), iso),
            Scalar::Date("2020-01-05T00:00:00.000Z".into())
        );
        assert_eq!(
            value("DateTime", json!("2020-01-05T10:30:00+02:00"), iso),
            Scalar::Date("2020-01-05T08:30:00.000Z".into())
        );
        assert_eq!(
            value("DateTime", json!("2020-01-05 10:30:00"), iso),
            Scalar::Date("2020-01-05T10:30:00.000Z".into())
        );
        assert_eq!(
            value("DateTime", json!(0), iso),
            Scalar::Date("1970-01-01T00:00:00.000Z".into())
        );
    }

    #[test]
    fn default_options_write_iso_dates() {
        assert_eq!(CoerceOptions::default(), CoerceOptions::iso());
        assert_eq!(
            value("Date", json!("2020-01-05"), CoerceOptions::default()),
            Scalar::Date("2020-01-05T00:00:00.000Z".into())
        );
    }

    #[test]
    fn bare_dates_stay_short_without_iso() {
        let opts = CoerceOptions { iso_dates: false };
        assert_eq!(value("Date", json!("2020/01/05"), opts), Scalar::Date("2020-01-05".into()));
        assert_eq!(
            value("Date", json!("2020-01-05T12:00:00Z"), opts),
            Scalar::Date("2020-01-05T12:00:00.000Z".into())
        );
        assert_eq!(
            value("DateTime", json!("01/05/2020"), opts),
            Scalar::Date("2020-01-05T00:00:00.000Z".into())
        );
    }

    #[test]
    fn invalid_dates_are_errors() {
        let err = coerce("Date", &json!("not a date"), Scalar::Null, CoerceOptions::iso()).unwrap_err();
        assert_eq!(
            err,
            CoercionError::InvalidDate {
                type_name: "Date".into(),
                value: "not a date".into()
            }
        );
        assert!(coerce("DateTime", &json!(true), Scalar::Null, CoerceOptions::iso()).is_err());
    }

    #[test]
    fn times_are_validated_and_passed_through() {
        let opts = CoerceOptions::default();
        for raw in ["10:30", "10:30:15", "10:30:15.250", "23:59:59Z", "08:00:00+02:00", "08:00-0500"] {
            assert_eq!(value("Time", json!(raw), opts), Scalar::Time(raw.into()));
        }
        for raw in ["25:00", "10h30", "noon"] {
            assert_eq!(
                coerce("Time", &json!(raw), Scalar::Null, opts),
                Err(CoercionError::InvalidTime(raw.into()))
            );
        }
    }

    #[test]
    fn other_scalars_become_strings() {
        let opts = CoerceOptions::default();
        assert_eq!(value("String", json!("héllo"), opts), Scalar::String("héllo".into()));
        assert_eq!(value("ID", json!(12), opts), Scalar::String("12".into()));
        assert_eq!(value("Json", json!({"a": 1}), opts), Scalar::String(r#"{"a":1}"#.into()));
    }

    proptest! {
        #[test]
        fn coercion_is_stable(
            type_name in prop::sample::select(vec!["Int", "Float", "Boolean", "String", "ID", "Date", "DateTime"]),
            raw in prop_oneof![
                any::<i32>().prop_map(|i| json!(i)),
                (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
                any::<bool>().prop_map(|b| json!(b)),
                "[a-z0-9 ]{0,12}".prop_map(|s| json!(s)),
                (1970i32..2100, 1u32..13, 1u32..29).prop_map(|(y, m, d)| json!(format!("{y:04}-{m:02}-{d:02}"))),
            ],
            iso in any::<bool>(),
        ) {
            let options = CoerceOptions { iso_dates: iso };
            if let Ok(first) = coerce(type_name, &raw, Scalar::Null, options) {
                let second = coerce(type_name, &first.value.to_json(), Scalar::Null, options).unwrap();
                prop_assert_eq!(second.value, first.value);
            }
        }
    }
}

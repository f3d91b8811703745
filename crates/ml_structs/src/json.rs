//! JSON-safe rendering of stored records.

use serde_json::{Map, Value};

/// Serde helpers writing timestamps as `%Y-%m-%dT%H:%M:%S%.6f`.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    /// Serializes a UTC timestamp without zone suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer rejects the string.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    /// Parses a timestamp written by [`serialize`].
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not in the expected format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Magnitude (2^63) at which floats stop fitting in `i64`.
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Rewrites whole-valued floats as integers, recursing into arrays and objects.
///
/// Weights such as `1.0` are stored as floats but read back as `1`, which
/// keeps rendered records stable for clients that compare them textually.
#[must_use]
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Number(number) => number
            .as_f64()
            .filter(|f| number.is_f64() && f.fract() == 0.0 && f.abs() < I64_FLOAT_BOUND)
            .map_or(Value::Number(number), |f| {
                #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
                let whole = f as i64;
                Value::from(whole)
            }),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, field)| (key, normalize(field)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Serializes any record and normalizes the result.
///
/// # Errors
///
/// Returns an error if the record cannot be represented as JSON.
pub fn to_json_safe<T: serde::Serialize>(record: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(record).map(normalize)
}

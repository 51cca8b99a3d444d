//! Lenient readers and canonical writers for store column values.

use crate::constants::LIST_SEPARATOR;
use crate::error::{RecordError, RecordResult};
use crate::store::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;
use ward_types::RecordId;

/// Decode a store row into a wire struct, reporting the failing field path.
pub(crate) fn decode<T: DeserializeOwned>(table: &str, record: Record) -> RecordResult<T> {
    serde_path_to_error::deserialize(Value::Object(record)).map_err(|err| {
        let path = err.path().to_string();
        RecordError::Malformed(format!("{table} row at {path}: {}", err.into_inner()))
    })
}

/// Decode caller-supplied JSON; any failure is the caller's fault.
pub(crate) fn decode_input<T: DeserializeOwned>(what: &str, record: Record) -> RecordResult<T> {
    serde_path_to_error::deserialize(Value::Object(record)).map_err(|err| {
        let path = err.path().to_string();
        RecordError::InvalidInput(format!("{what} field {path}: {}", err.into_inner()))
    })
}

/// Serialize a wire struct into a store row.
pub(crate) fn encode<T: Serialize>(wire: &T) -> RecordResult<Record> {
    match serde_json::to_value(wire) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(RecordError::InvalidInput(format!(
            "expected a record object, built {other}"
        ))),
        Err(err) => Err(RecordError::InvalidInput(err.to_string())),
    }
}

pub(crate) fn date_to_wire(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn datetime_to_wire(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn list_to_wire(items: &BTreeSet<String>) -> String {
    items
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

pub(crate) fn list_from_wire(text: &str) -> BTreeSet<String> {
    text.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Accepts `YYYY-MM-DD`, or a timestamp whose date part is taken.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|at| at.date_naive()))
}

/// Accepts RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn present(value: Option<Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        other => other,
    }
}

/// Text column that may come back as a number; blank becomes `None`.
pub(crate) fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match present(Option::<Value>::deserialize(d)?) {
        None => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Lookup column: bare integer, numeric string, or `{"Id": n, "Name": ...}`.
pub(crate) fn opt_lookup<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RecordId>, D::Error> {
    let value = match present(Option::<Value>::deserialize(d)?) {
        Some(Value::Object(mut lookup)) => present(lookup.remove("Id")),
        other => other,
    };
    let raw = match value {
        None => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("lookup id {n} is not an integer")))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("lookup id '{s}' is not an integer")))?,
        Some(other) => return Err(D::Error::custom(format!("unexpected lookup value {other}"))),
    };
    RecordId::new(raw).map(Some).map_err(D::Error::custom)
}

fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match present(Option::<Value>::deserialize(d)?) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("'{s}' is not a number"))),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    opt_number(d)
}

pub(crate) fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    match opt_number(d)? {
        None => Ok(None),
        Some(n) if n.fract() == 0.0 && n >= 0.0 && n <= f64::from(u32::MAX) => Ok(Some(n as u32)),
        Some(n) => Err(D::Error::custom(format!("{n} is not a whole number"))),
    }
}

/// Text column holding one of a fixed set of values.
pub(crate) fn opt_parsed<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match opt_text(d)? {
        None => Ok(None),
        Some(text) => text.parse().map(Some).map_err(D::Error::custom),
    }
}

pub(crate) fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    match opt_text(d)? {
        None => Ok(None),
        Some(text) => parse_date(&text)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("'{text}' is not a date"))),
    }
}

pub(crate) fn opt_datetime<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match opt_text(d)? {
        None => Ok(None),
        Some(text) => parse_datetime(&text)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("'{text}' is not a timestamp"))),
    }
}

/// Newline-joined text or a JSON array of strings. Array entries cannot hold the separator.
pub(crate) fn opt_list<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<BTreeSet<String>>, D::Error> {
    match present(Option::<Value>::deserialize(d)?) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(list_from_wire(&text))),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) if s.contains(LIST_SEPARATOR) => Err(D::Error::custom(format!(
                    "list entry {s:?} must not contain a line break"
                ))),
                Value::String(s) => Ok(s.trim().to_owned()),
                other => Err(D::Error::custom(format!("list entry {other} is not text"))),
            })
            .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Some),
        Some(other) => Err(D::Error::custom(format!("expected a list, got {other}"))),
    }
}

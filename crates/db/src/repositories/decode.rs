//! Row-decoding helpers shared by the SQLite repositories. Values are
//! stored as TEXT (uuids, decimals, RFC3339 timestamps) and decoded
//! explicitly so a corrupt row surfaces as `RepositoryError::Decode`
//! instead of a silent default.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::RepositoryError;

pub(crate) fn get_string(row: &SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn get_opt_string(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<String>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn get_i64(row: &SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn get_opt_i64(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<i64>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn get_bool(row: &SqliteRow, column: &str) -> Result<bool, RepositoryError> {
    let value = get_i64(row, column)?;
    Ok(value != 0)
}

pub(crate) fn get_u32(row: &SqliteRow, column: &str) -> Result<u32, RepositoryError> {
    let value = get_i64(row, column)?;
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{column}: value {value} out of range")))
}

pub(crate) fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, RepositoryError> {
    let raw = get_string(row, column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("{column}: invalid uuid `{raw}`: {e}")))
}

pub(crate) fn parse_opt_uuid(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Uuid>, RepositoryError> {
    match get_opt_string(row, column)? {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| RepositoryError::Decode(format!("{column}: invalid uuid `{raw}`: {e}"))),
        None => Ok(None),
    }
}

pub(crate) fn parse_datetime(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw = get_string(row, column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: invalid timestamp `{raw}`: {e}")))
}

pub(crate) fn parse_opt_datetime(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    match get_opt_string(row, column)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                RepositoryError::Decode(format!("{column}: invalid timestamp `{raw}`: {e}"))
            }),
        None => Ok(None),
    }
}

pub(crate) fn parse_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw = get_string(row, column)?;
    Decimal::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("{column}: invalid decimal `{raw}`: {e}")))
}

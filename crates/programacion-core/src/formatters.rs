//! Smart cell formatters.
//!
//! Handles:
//! - Code completion (`123` → `123-26`, `45` → `COTIZ.N-45-26`, `7` → `F001-0007`)
//! - Date shorthand expansion (`1203` → `2026-03-12`, `5/3/25` → `2025-03-05`)
//! - Option validation for dropdown columns
//!
//! Every formatter is a pure function of its input and [`FormatterConfig`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{AuthorizationDecision, Field, PaymentStatus, WorkStatus};

/// Formatter errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Empty value")]
    Empty,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Value {value:?} is not a valid option for {field}")]
    UnknownOption { field: Field, value: String },

    #[error("Field {0} is not editable")]
    NotEditable(Field),
}

pub type FormatResult<T> = Result<T, FormatError>;

/// Year used for code suffixes and for dates typed without a year.
pub const DEFAULT_YEAR: i32 = 2026;

/// Formatter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub year: i32,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self { year: DEFAULT_YEAR }
    }
}

impl FormatterConfig {
    /// Two-digit suffix appended to reception, work order and quotation codes.
    pub fn year_suffix(&self) -> String {
        format!("{:02}", self.year.rem_euclid(100))
    }
}

/// Formatter for typed cell input.
#[derive(Debug, Clone, Default)]
pub struct SmartFormatter {
    config: FormatterConfig,
}

impl SmartFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Reception number: bare digits get the year suffix.
    pub fn reception_number(&self, raw: &str) -> FormatResult<String> {
        let value = non_empty(raw)?;
        if is_digits(value) {
            return Ok(format!("{}-{}", value, self.config.year_suffix()));
        }
        Ok(value.to_string())
    }

    /// Work order: an optional `LEM` marker and trailing dash are dropped, then
    /// bare digits get the year suffix.
    pub fn work_order(&self, raw: &str) -> FormatResult<String> {
        let value = non_empty(raw)?;
        let suffix = format!("-{}", self.config.year_suffix());
        if value.ends_with(&suffix) {
            return Ok(value.to_string());
        }

        let stripped = strip_prefix_ignore_case(value, "LEM")
            .map(|rest| rest.trim_start_matches([' ', '-']))
            .unwrap_or(value);
        let stripped = stripped.trim_end_matches('-').trim();

        if is_digits(stripped) {
            Ok(format!("{}{}", stripped, suffix))
        } else {
            Ok(value.to_string())
        }
    }

    /// Lab quotation: bare digits expand to `COTIZ.N-<n>-<yy>`, and the long
    /// `COTIZACION-` prefix is shortened.
    pub fn quotation(&self, raw: &str) -> FormatResult<String> {
        let value = non_empty(raw)?;
        if is_digits(value) {
            return Ok(format!("COTIZ.N-{}-{}", value, self.config.year_suffix()));
        }
        if let Some(rest) = value.strip_prefix("COTIZACION-") {
            return Ok(format!("COTIZ.N-{}", rest));
        }
        Ok(value.to_string())
    }

    /// Invoice number in `Fsss-nnnn` form.
    pub fn invoice(&self, raw: &str) -> FormatResult<String> {
        let value = non_empty(raw)?;

        if is_digits(value) {
            return Ok(format!("F001-{}", pad(value, 4)));
        }
        if let Some((series, number)) = value.split_once('-') {
            if is_digits(series) && is_digits(number) {
                return Ok(format!("F{}-{}", pad(series, 3), pad(number, 4)));
            }
        }
        if let Some(rest) = value.strip_prefix(['f', 'F']) {
            if is_digits(rest) {
                return Ok(format!("F001-{}", pad(rest, 4)));
            }
        }
        Ok(value.to_string())
    }

    /// Expand date shorthand into a calendar date.
    ///
    /// Accepted inputs: `DDMM`, `DMM`, `DDMMYY`, `DDMMYYYY`, `D/M`, `D/M/YY`,
    /// `D/M/YYYY` (with `/`, `.` or `-` separators) and ISO `YYYY-MM-DD`.
    /// Returns `Ok(None)` for blank input, which clears the cell.
    pub fn date(&self, raw: &str) -> FormatResult<Option<NaiveDate>> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(None);
        }

        if let Some(date) = parse_iso_date(value) {
            return Ok(Some(date));
        }

        let invalid = || FormatError::InvalidDate(value.to_string());

        let (day, month, year): (&str, &str, Option<&str>) = if is_digits(value) {
            match value.len() {
                3 => (&value[0..1], &value[1..3], None),
                4 => (&value[0..2], &value[2..4], None),
                6 | 8 => (&value[0..2], &value[2..4], Some(&value[4..])),
                _ => return Err(invalid()),
            }
        } else {
            let parts: Vec<&str> = value.split(['/', '.', '-']).collect();
            if parts.iter().any(|p| !is_digits(p)) {
                return Err(invalid());
            }
            match parts.as_slice() {
                [d, m] if d.len() <= 2 && m.len() <= 2 => (*d, *m, None),
                [d, m, y] if d.len() <= 2 && m.len() <= 2 && (y.len() == 2 || y.len() == 4) => {
                    (*d, *m, Some(*y))
                }
                _ => return Err(invalid()),
            }
        };

        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let year: i32 = match year {
            None => self.config.year,
            Some(y) if y.len() == 2 => 2000 + y.parse::<i32>().map_err(|_| invalid())?,
            Some(y) => y.parse().map_err(|_| invalid())?,
        };

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Some)
            .ok_or_else(invalid)
    }

    /// Format raw input for a field into the value written to the backend.
    ///
    /// Blank input maps to `null` for every editable field.
    pub fn format_field(&self, field: Field, raw: &str) -> FormatResult<Value> {
        if !field.is_client_writable() {
            return Err(FormatError::NotEditable(field));
        }
        if raw.trim().is_empty() {
            return Ok(Value::Null);
        }

        let text = match field {
            f if f.is_date() => {
                return Ok(self
                    .date(raw)?
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Value::Null));
            }
            Field::ReceptionNumber => self.reception_number(raw)?,
            Field::WorkOrder => self.work_order(raw)?,
            Field::LabQuotation => self.quotation(raw)?,
            Field::InvoiceNumber => self.invoice(raw)?,
            Field::WorkStatus => WorkStatus::parse(raw)
                .map(|s| s.as_str().to_string())
                .ok_or_else(|| unknown_option(field, raw))?,
            Field::LabAuthorization | Field::AdminAuthorization => {
                AuthorizationDecision::parse(raw)
                    .map(|s| s.as_str().to_string())
                    .ok_or_else(|| unknown_option(field, raw))?
            }
            Field::PaymentStatus => PaymentStatus::parse(raw)
                .map(|s| s.as_str().to_string())
                .ok_or_else(|| unknown_option(field, raw))?,
            _ => raw.trim().to_string(),
        };

        Ok(Value::String(text))
    }
}

/// Parse the date part of an ISO date or timestamp (`2026-03-12`,
/// `2026-03-12T10:00:00Z`).
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10)?;
    if raw.len() > 10 && !raw[10..].starts_with(['T', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Short display form `DD/MM/YY`. Unparseable input is returned unchanged.
pub fn display_date(raw: &str) -> String {
    match parse_iso_date(raw) {
        Some(date) => format!(
            "{:02}/{:02}/{:02}",
            date.day(),
            date.month(),
            date.year().rem_euclid(100)
        ),
        None => raw.to_string(),
    }
}

fn unknown_option(field: Field, raw: &str) -> FormatError {
    FormatError::UnknownOption {
        field,
        value: raw.to_string(),
    }
}

fn non_empty(raw: &str) -> FormatResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(FormatError::Empty)
    } else {
        Ok(trimmed)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn pad(digits: &str, width: usize) -> String {
    format!("{:0>width$}", digits, width = width)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

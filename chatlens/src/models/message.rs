use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ChatlensError, Result};

/// A single chat message as produced by the transcript reader.
///
/// `date` and `time` are kept in the exporter's locale format; they are only
/// parsed when a point in time is needed (see [`Message::timestamp`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Message {
    #[serde(default)]
    pub sender: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub text: String,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            date: date.into(),
            time: time.into(),
            text: text.into(),
        }
    }

    /// `"<date> <time>"` exactly as exported.
    pub fn stamp(&self) -> String {
        format!("{} {}", self.date, self.time)
    }

    pub fn timestamp(&self) -> Result<NaiveDateTime> {
        parse_timestamp(&self.date, &self.time)
    }
}

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const FOUR_DIGIT_YEAR_FORMATS: &[&str] = &["%m/%d/%Y", "%d.%m.%Y"];
const TWO_DIGIT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%d.%m.%y"];
const TIME_FORMATS: &[&str] = &["%I:%M:%S %p", "%I:%M %p", "%H:%M:%S", "%H:%M"];

/// Parse an exported calendar date and clock time into a single point.
///
/// Accepts ISO dates, US `M/D/YY[YY]` and dotted `D.M.YY[YY]` dates, 12-hour
/// clocks with an AM/PM marker (with or without the narrow no-break space
/// WhatsApp inserts) and 24-hour clocks.
pub fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime> {
    let invalid = || ChatlensError::InvalidTimestamp {
        date: date.to_string(),
        time: time.to_string(),
    };

    let date_part = parse_date(date).ok_or_else(invalid)?;
    let time_part = parse_time(time).ok_or_else(invalid)?;

    Ok(date_part.and_time(time_part))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT) {
        return Some(date);
    }

    let year_len = raw.rsplit(['/', '.']).next().map(str::len)?;
    let formats = if year_len == 4 {
        FOUR_DIGIT_YEAR_FORMATS
    } else {
        TWO_DIGIT_YEAR_FORMATS
    };

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let normalized = normalize_time(raw);
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&normalized, format).ok())
}

/// Collapse exotic spaces and make sure a meridiem marker is space-separated.
fn normalize_time(raw: &str) -> String {
    let mut time: String = raw
        .chars()
        .map(|c| match c {
            '\u{202F}' | '\u{00A0}' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_uppercase();

    for marker in ["AM", "PM"] {
        if let Some(head) = time.strip_suffix(marker) {
            if !head.ends_with(' ') {
                time = format!("{head} {marker}");
            }
            break;
        }
    }

    time
}

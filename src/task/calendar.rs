#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use time::macros::{date, format_description};
use time::{Date, Duration, Month, OffsetDateTime};

use crate::error::DaybookError;

/// Earliest due date the editor accepts.
pub const MIN_DUE_DATE: Date = date!(2020 - 01 - 01);

/// Source of "now". The store asks it for today's date and for id timestamps.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        // The local offset is unavailable on some platforms once threads exist.
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// Always reports the same day, at midnight UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0.midnight().assume_utc()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateLocale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "pt-BR")]
    PtBr,
}

impl DateLocale {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DateLocale::EnUs => "en-US",
            DateLocale::PtBr => "pt-BR",
        }
    }

    /// Day and short month, no year: `Oct 19` / `19 de out`.
    #[must_use]
    pub fn format_label(self, d: Date) -> String {
        let day = d.day();
        match self {
            DateLocale::EnUs => format!("{} {day:02}", month_abbrev_en(d.month())),
            DateLocale::PtBr => format!("{day:02} de {}", month_abbrev_pt(d.month())),
        }
    }

    /// Numeric day/month used under chart bars: `10/19` / `19/10`.
    #[must_use]
    pub fn format_chart(self, d: Date) -> String {
        let day = d.day();
        let month = u8::from(d.month());
        match self {
            DateLocale::EnUs => format!("{month:02}/{day:02}"),
            DateLocale::PtBr => format!("{day:02}/{month:02}"),
        }
    }
}

impl fmt::Display for DateLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn month_abbrev_en(m: Month) -> &'static str {
    match m {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn month_abbrev_pt(m: Month) -> &'static str {
    match m {
        Month::January => "jan",
        Month::February => "fev",
        Month::March => "mar",
        Month::April => "abr",
        Month::May => "mai",
        Month::June => "jun",
        Month::July => "jul",
        Month::August => "ago",
        Month::September => "set",
        Month::October => "out",
        Month::November => "nov",
        Month::December => "dez",
    }
}

#[must_use]
pub fn format_iso(d: Date) -> String {
    d.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| d.to_string())
}

pub fn parse_iso(input: &str) -> Result<Date, DaybookError> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| {
        DaybookError::InvalidDate {
            input: input.to_owned(),
            msg: format!("expected YYYY-MM-DD ({e})"),
        }
    })
}

/// Accepts `YYYY-MM-DD` plus the words `today`, `tomorrow` and `yesterday`.
pub fn parse_date(input: &str, today: Date) -> Result<Date, DaybookError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(add_days(today, 1)),
        "yesterday" => Ok(add_days(today, -1)),
        _ => parse_iso(input),
    }
}

/// Saturates at the calendar bounds instead of overflowing.
#[must_use]
pub fn add_days(d: Date, days: i64) -> Date {
    d.checked_add(Duration::days(days)).unwrap_or(d)
}

/// Serde adapter storing a [`Date`] as `YYYY-MM-DD`.
pub mod iso_date {
    use serde::{Deserialize as _, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(d: &Date, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_iso(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_iso(&raw).map_err(serde::de::Error::custom)
    }
}

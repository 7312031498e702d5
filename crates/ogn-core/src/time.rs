use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OgnError, OgnResult};

/// First day the coverage database holds data for.
pub const ARCHIVE_START: (i32, u32, u32) = (2015, 3, 31);

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Named date selection as it appears in the URL fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    Today,
    Yesterday,
    LastWeek,
    Recent,
    All,
    /// `dN`: the last N days.
    Days(u32),
    /// `Dstart#end`: explicit inclusive range.
    Between(NaiveDate, NaiveDate),
}

impl DatePreset {
    pub fn parse(token: &str) -> OgnResult<Self> {
        match token {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "lastweek" => Ok(Self::LastWeek),
            "recent" => Ok(Self::Recent),
            "all" => Ok(Self::All),
            _ => {
                if let Some(days) = token.strip_prefix('d') {
                    return days
                        .parse::<u32>()
                        .map(Self::Days)
                        .map_err(|_| OgnError::invalid(format!("bad day count in {token}")));
                }
                if let Some(range) = token.strip_prefix('D') {
                    let (start, end) = range
                        .split_once('#')
                        .ok_or_else(|| OgnError::invalid(format!("bad date range {token}")))?;
                    let start = NaiveDate::parse_from_str(start, DATE_FORMAT)
                        .map_err(|err| OgnError::invalid(format!("{token}: {err}")))?;
                    let end = NaiveDate::parse_from_str(end, DATE_FORMAT)
                        .map_err(|err| OgnError::invalid(format!("{token}: {err}")))?;
                    return Ok(Self::Between(start, end));
                }
                Err(OgnError::invalid(format!("unknown date preset {token}")))
            }
        }
    }

    pub fn token(&self) -> String {
        match self {
            Self::Today => "today".to_string(),
            Self::Yesterday => "yesterday".to_string(),
            Self::LastWeek => "lastweek".to_string(),
            Self::Recent => "recent".to_string(),
            Self::All => "all".to_string(),
            Self::Days(days) => format!("d{days}"),
            Self::Between(start, end) => format!(
                "D{}#{}",
                start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            ),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Today => "Today".to_string(),
            Self::Yesterday => "Yesterday".to_string(),
            Self::LastWeek => "Last Week".to_string(),
            Self::Recent => "This Year".to_string(),
            Self::All => "All Time".to_string(),
            other => other.token(),
        }
    }

    /// Resolves the preset against `today` (UTC calendar day).
    pub fn range(&self, today: NaiveDate) -> DateRange {
        let (start, end) = match self {
            Self::Today => (today, today),
            Self::Yesterday => (today - Duration::days(2), today - Duration::days(1)),
            Self::LastWeek => (today - Duration::days(7), today),
            Self::Recent => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                today,
            ),
            Self::All => {
                let (year, month, day) = ARCHIVE_START;
                (
                    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(today),
                    today,
                )
            }
            Self::Days(days) => (today - Duration::days(i64::from(*days)), today),
            Self::Between(start, end) => (*start, *end),
        };
        DateRange { start, end }
    }

    pub fn current_range(&self) -> DateRange {
        self.range(Utc::now().date_naive())
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn presets_resolve_relative_to_today() {
        let today = day(2024, 6, 15);
        assert_eq!(
            DatePreset::Yesterday.range(today),
            DateRange { start: day(2024, 6, 13), end: day(2024, 6, 14) }
        );
        assert_eq!(DatePreset::LastWeek.range(today).start, day(2024, 6, 8));
        assert_eq!(DatePreset::Recent.range(today).start, day(2024, 1, 1));
        assert_eq!(DatePreset::All.range(today).start, day(2015, 3, 31));
        assert_eq!(DatePreset::Days(3).range(today).start, day(2024, 6, 12));
    }

    #[test]
    fn explicit_range_survives_token_round_trip() {
        let preset = DatePreset::parse("D2020-01-02#2020-02-03").unwrap();
        assert_eq!(preset, DatePreset::Between(day(2020, 1, 2), day(2020, 2, 3)));
        assert_eq!(preset.token(), "D2020-01-02#2020-02-03");
        assert_eq!(preset.range(day(2024, 1, 1)).end_param(), "2020-02-03");
    }

    #[test]
    fn unknown_presets_are_rejected() {
        assert!(DatePreset::parse("lastmonth").is_err());
        assert!(DatePreset::parse("dx").is_err());
        assert!(DatePreset::parse("D2020-01-01").is_err());
    }
}

use crate::types::{AcError, AcResult, Mjd};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Unix timestamp of 2000-01-01T00:00:00Z
const MJD2000_UNIX_EPOCH: i64 = 946_684_800;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fixed-period temporal windowing of ancillary products.
///
/// Files are produced every `period` days starting at midnight. A file is
/// representative for the time half a period after its nominal time, so
/// brackets run from one file's centre to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketPolicy {
    /// Bracket length in days
    pub period: f64,
    /// Offset in days between file time and bracket start
    pub phase: f64,
}

impl BracketPolicy {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            phase: period / 2.0,
        }
    }

    /// Four files per day (NCEP meteorology)
    pub fn six_hourly() -> Self {
        Self::new(0.25)
    }

    /// One file per day (TOMS/OMI ozone)
    pub fn daily() -> Self {
        Self::new(1.0)
    }

    /// The unique bracket with `start <= time < end`
    pub fn bracket(&self, time: Mjd) -> Bracket {
        let file_start = ((time - self.phase) / self.period).floor() * self.period;
        let start = file_start + self.phase;
        Bracket {
            start_mjd: start,
            end_mjd: start + self.period,
            start_file_mjd: file_start,
            end_file_mjd: file_start + self.period,
        }
    }

    /// All brackets overlapping `[start, end]`, in time order
    pub fn brackets_between(&self, start: Mjd, end: Mjd) -> Vec<Bracket> {
        let mut brackets = Vec::new();
        if !(start.is_finite() && end.is_finite()) || end < start {
            return brackets;
        }
        let mut bracket = self.bracket(start);
        loop {
            brackets.push(bracket);
            if bracket.end_mjd > end {
                break;
            }
            let next = self.bracket(bracket.end_mjd);
            // Past f64 resolution one period no longer advances the time
            if next.start_mjd <= bracket.start_mjd {
                log::warn!("Bracket walk stalled at MJD {}", bracket.start_mjd);
                break;
            }
            bracket = next;
        }
        brackets
    }
}

/// Half-open time window `[start_mjd, end_mjd)` between two ancillary files
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub start_mjd: Mjd,
    pub end_mjd: Mjd,
    /// Nominal time of the file valid at the bracket start
    pub start_file_mjd: Mjd,
    /// Nominal time of the file valid at the bracket end
    pub end_file_mjd: Mjd,
}

impl Bracket {
    /// Cache key: bracket start in whole seconds since the MJD epoch
    pub fn key(&self) -> i64 {
        (self.start_mjd * SECONDS_PER_DAY).round() as i64
    }

    pub fn contains(&self, time: Mjd) -> bool {
        time >= self.start_mjd && time < self.end_mjd
    }

    /// Interpolation weight of the end raster at `time`
    pub fn weight(&self, time: Mjd) -> f64 {
        (time - self.start_mjd) / (self.end_mjd - self.start_mjd)
    }

    pub fn start_prefix(&self) -> AcResult<String> {
        file_prefix(self.start_file_mjd)
    }

    pub fn end_prefix(&self) -> AcResult<String> {
        file_prefix(self.end_file_mjd)
    }
}

pub fn mjd_to_datetime(mjd: Mjd) -> AcResult<DateTime<Utc>> {
    if !mjd.is_finite() {
        return Err(AcError::InvalidFormat(format!("non-finite MJD {}", mjd)));
    }
    let millis = (mjd * SECONDS_PER_DAY * 1000.0).round() as i64 + MJD2000_UNIX_EPOCH * 1000;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AcError::InvalidFormat(format!("MJD {} is out of the representable range", mjd)))
}

pub fn datetime_to_mjd(time: &DateTime<Utc>) -> Mjd {
    (time.timestamp_millis() - MJD2000_UNIX_EPOCH * 1000) as f64 / (SECONDS_PER_DAY * 1000.0)
}

/// Ancillary file name prefix `N<yyyy><ddd><hh>` for a nominal file time
pub fn file_prefix(file_mjd: Mjd) -> AcResult<String> {
    let time = mjd_to_datetime(file_mjd)?;
    Ok(format!("N{:04}{:03}{:02}", time.year(), time.ordinal(), time.hour()))
}

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^N([12][09]\d{2})([0-3]\d{2})([0-2]\d)_").expect("literal file name pattern compiles")
    })
}

/// True for names of the form `N<yyyy><ddd><hh>_...`
pub fn is_valid_file_name(name: &str) -> bool {
    file_name_pattern().is_match(name)
}

/// Nominal file time encoded in an ancillary file name
pub fn parse_file_time(name: &str) -> AcResult<Mjd> {
    let caps = file_name_pattern()
        .captures(name)
        .ok_or_else(|| AcError::InvalidFormat(format!("not an ancillary file name: {}", name)))?;

    let number = |i: usize| -> AcResult<u32> {
        caps[i]
            .parse::<u32>()
            .map_err(|_| AcError::InvalidFormat(format!("invalid date field in {}", name)))
    };
    let (year, day, hour) = (number(1)?, number(2)?, number(3)?);

    let time = NaiveDate::from_yo_opt(year as i32, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| AcError::InvalidFormat(format!("invalid date in file name {}", name)))?;
    Ok(datetime_to_mjd(&Utc.from_utc_datetime(&time)))
}

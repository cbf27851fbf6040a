//! Facet axis types
//!
//! Each axis value renders to one search qualifier. Ranges on the numeric
//! and time axes are inclusive on both ends, matching the search syntax
//! `lo..hi`.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Inclusive popularity range; `max = None` means no upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StarRange {
    pub min: u64,
    pub max: Option<u64>,
}

impl StarRange {
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Returns true if min <= max (open-ended ranges are always valid)
    pub fn is_well_formed(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }

    /// Returns true if the two ranges share at least one value
    pub fn overlaps(&self, other: &StarRange) -> bool {
        let self_below_other = self.max.map_or(false, |max| max < other.min);
        let other_below_self = other.max.map_or(false, |max| max < self.min);
        !(self_below_other || other_below_self)
    }

    /// Renders the `stars:` qualifier
    pub fn qualifier(&self) -> String {
        match self.max {
            Some(max) => format!("stars:{}..{}", self.min, max),
            None => format!("stars:>={}", self.min),
        }
    }
}

impl fmt::Display for StarRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..", self.min),
        }
    }
}

/// Inclusive creation-date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TimeWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Builds the window covering a whole calendar year
    ///
    /// Returns None if the year is out of chrono's supported range.
    pub fn calendar_year(year: i32) -> Option<Self> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)?;
        Some(Self { from, to })
    }

    pub fn is_well_formed(&self) -> bool {
        self.from <= self.to
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Renders the `created:` qualifier
    pub fn qualifier(&self) -> String {
        format!(
            "created:{}..{}",
            self.from.format("%Y-%m-%d"),
            self.to.format("%Y-%m-%d")
        )
    }

    /// Returns the year if this window spans exactly one calendar year
    pub fn as_calendar_year(&self) -> Option<i32> {
        let year = self.from.year();
        (Self::calendar_year(year) == Some(*self)).then_some(year)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_calendar_year() {
            Some(year) => write!(f, "{}", year),
            None => write!(f, "{}..{}", self.from, self.to),
        }
    }
}

/// One combination of facet values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchFacet {
    pub language: String,
    pub window: TimeWindow,
    pub stars: StarRange,
}

impl SearchFacet {
    /// Renders the `language:` qualifier, quoting values with whitespace
    pub fn language_qualifier(&self) -> String {
        if self.language.chars().any(char::is_whitespace) {
            format!("language:\"{}\"", self.language)
        } else {
            format!("language:{}", self.language)
        }
    }

    /// Builds the full search expression for this facet
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.language_qualifier(),
            self.stars.qualifier(),
            self.window.qualifier()
        )
    }
}

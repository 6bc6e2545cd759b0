//! Model version stamps
//!
//! Store folders follow the `v<YYYYMMDD>_<HHMMSS>` naming convention. Names
//! are parsed into structured timestamps and compared chronologically;
//! an unrecognized name is an error rather than a silent sort participant,
//! so a convention change breaks loudly instead of reordering quietly.

use chrono::{NaiveDate, NaiveDateTime};
use privcase_core::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v(\d{8})_(\d{6})$").expect("version pattern"))
}

/// A parsed model version folder name.
///
/// Ordering is chronological by the embedded timestamp, with the raw name as
/// a tiebreaker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionStamp {
    stamp: NaiveDateTime,
    name: String,
}

impl VersionStamp {
    /// Parse a folder name such as `v20250729_092253`.
    pub fn parse(name: &str) -> Result<Self> {
        let caps = version_re()
            .captures(name)
            .ok_or_else(|| Error::store(format!("unrecognized model folder name: {name}")))?;
        let stamp = NaiveDateTime::parse_from_str(&format!("{}{}", &caps[1], &caps[2]), "%Y%m%d%H%M%S")
            .map_err(|e| Error::store(format!("model folder name {name} has an invalid timestamp: {e}")))?;
        Ok(Self {
            stamp,
            name: name.to_string(),
        })
    }

    /// The raw folder name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The calendar date embedded in the name
    pub fn date(&self) -> NaiveDate {
        self.stamp.date()
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

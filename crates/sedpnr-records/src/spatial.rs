//! Spatial Records
//!
//! Per-tick, per-agent rows consumed by offline map playback.
//!
//! Unassigned sites are written as `-1` so the stream stays a flat integer table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::BeliefState;

/// Header line of the spatial CSV stream.
pub const SPATIAL_CSV_HEADER: &str = "Time,AgentId,TownId,SchoolId,ReligiousId,WorkplaceId,ClaimId,State,IsMisinformation,Ethnicity,Denomination";

/// One agent's state for one claim at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialRecord {
    pub tick: u64,
    pub agent_id: u32,
    pub district_id: u32,
    #[serde(default)]
    pub school_id: Option<u32>,
    #[serde(default)]
    pub religious_id: Option<u32>,
    #[serde(default)]
    pub workplace_id: Option<u32>,
    pub claim_id: u32,
    pub state: BeliefState,
    pub is_misinformation: bool,
    pub ethnicity: u8,
    pub denomination: u8,
}

impl SpatialRecord {
    /// Formats the record as one CSV line (no trailing newline).
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.tick,
            self.agent_id,
            self.district_id,
            site_field(self.school_id),
            site_field(self.religious_id),
            site_field(self.workplace_id),
            self.claim_id,
            self.state.code(),
            u8::from(self.is_misinformation),
            self.ethnicity,
            self.denomination,
        )
    }

    /// Parses a CSV line written by [`SpatialRecord::to_csv_row`].
    pub fn from_csv_row(line: &str) -> Result<Self, ParseRecordError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 11 {
            return Err(ParseRecordError::FieldCount(fields.len()));
        }

        let state_code: u8 = parse_field(fields[7], "State")?;
        let state = BeliefState::from_code(state_code)
            .ok_or_else(|| ParseRecordError::InvalidField("State", fields[7].to_string()))?;

        Ok(Self {
            tick: parse_field(fields[0], "Time")?,
            agent_id: parse_field(fields[1], "AgentId")?,
            district_id: parse_field(fields[2], "TownId")?,
            school_id: parse_site(fields[3], "SchoolId")?,
            religious_id: parse_site(fields[4], "ReligiousId")?,
            workplace_id: parse_site(fields[5], "WorkplaceId")?,
            claim_id: parse_field(fields[6], "ClaimId")?,
            state,
            is_misinformation: parse_field::<u8>(fields[8], "IsMisinformation")? != 0,
            ethnicity: parse_field(fields[9], "Ethnicity")?,
            denomination: parse_field(fields[10], "Denomination")?,
        })
    }
}

fn site_field(site: Option<u32>) -> String {
    match site {
        Some(id) => id.to_string(),
        None => "-1".to_string(),
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &'static str) -> Result<T, ParseRecordError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ParseRecordError::InvalidField(name, raw.to_string()))
}

fn parse_site(raw: &str, name: &'static str) -> Result<Option<u32>, ParseRecordError> {
    let value: i64 = parse_field(raw, name)?;
    if value < 0 {
        Ok(None)
    } else {
        u32::try_from(value)
            .map(Some)
            .map_err(|_| ParseRecordError::InvalidField(name, raw.to_string()))
    }
}

/// Errors from decoding a spatial CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseRecordError {
    FieldCount(usize),
    InvalidField(&'static str, String),
}

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseRecordError::FieldCount(n) => {
                write!(f, "expected 11 fields in spatial row, found {}", n)
            }
            ParseRecordError::InvalidField(name, raw) => {
                write!(f, "invalid value for {}: '{}'", name, raw)
            }
        }
    }
}

impl std::error::Error for ParseRecordError {}

//! Record Module
//!
//! The fixed-width student record and the attributes it can be searched by.
//!
//! ## Slot Format
//! ```text
//! ┌───────────┬─────────┬───────────────┬──────────┬──────────┐
//! │ State (1) │ Id (4)  │  Name (32)    │ GPA (8)  │ Year (4) │
//! └───────────┴─────────┴───────────────┴──────────┴──────────┘
//! ```
//! All integers are big-endian. The name is UTF-8, space padded, and cut on
//! a character boundary when it does not fit. Every slot is exactly
//! [`RECORD_SIZE`] bytes so a record is addressed by its offset alone.

pub mod codec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::index::{gpa_key, name_key, year_key};

pub use codec::{decode, decode_slot, encode, SlotState};

// =============================================================================
// Layout Constants
// =============================================================================

/// State byte + id
pub const HEADER_SIZE: usize = 1 + 4;

/// Bytes reserved for the name (one byte per unit, UTF-8)
pub const NAME_WIDTH: usize = 32;

/// Total size of one slot in the data file
pub const RECORD_SIZE: usize = HEADER_SIZE + NAME_WIDTH + 8 + 4;

/// Tolerance used when comparing GPAs
pub const GPA_EPSILON: f64 = 1e-6;

// =============================================================================
// Record
// =============================================================================

/// One student record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key
    pub id: i32,
    pub name: String,
    pub gpa: f64,
    /// Enrollment year
    pub year: i32,
}

impl Record {
    /// Create a record, normalizing the name to what the slot can hold
    pub fn new(id: i32, name: &str, gpa: f64, year: i32) -> Self {
        Self {
            id,
            name: normalize_name(name),
            gpa,
            year,
        }
    }

    /// Copy of this record with the name normalized
    pub fn normalized(&self) -> Self {
        Self::new(self.id, &self.name, self.gpa, self.year)
    }

    /// The value this record holds for `field`
    pub fn value_of(&self, field: Field) -> FieldValue {
        match field {
            Field::Name => FieldValue::Name(self.name.clone()),
            Field::Gpa => FieldValue::Gpa(self.gpa),
            Field::Year => FieldValue::Year(self.year),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, Name: {}, GPA: {:.2}, Year: {}",
            self.id, self.name, self.gpa, self.year
        )
    }
}

/// Cut `name` to [`NAME_WIDTH`] bytes on a char boundary (no trimming)
pub(crate) fn truncate_name(name: &str) -> &str {
    if name.len() <= NAME_WIDTH {
        return name;
    }
    let mut end = NAME_WIDTH;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// The name exactly as it reads back from a slot
pub fn normalize_name(name: &str) -> String {
    truncate_name(name).trim().to_string()
}

// =============================================================================
// Fields
// =============================================================================

/// Attributes with a secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Name,
    Gpa,
    Year,
}

impl Field {
    /// Every indexed field, in index file order
    pub const ALL: [Field; 3] = [Field::Name, Field::Gpa, Field::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Gpa => "gpa",
            Field::Year => "year",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(Field::Name),
            "gpa" => Ok(Field::Gpa),
            "year" | "enrollmentYear" | "enrollment_year" => Ok(Field::Year),
            other => Err(DbError::UnknownField(other.to_string())),
        }
    }
}

/// A typed value for one field, used for searches and deletes
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Name(String),
    Gpa(f64),
    Year(i32),
}

impl FieldValue {
    /// Parse a raw value for the named field
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        let field: Field = field.parse()?;
        let invalid = || DbError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
        };

        match field {
            Field::Name => Ok(FieldValue::Name(raw.to_string())),
            Field::Gpa => raw.trim().parse().map(FieldValue::Gpa).map_err(|_| invalid()),
            Field::Year => raw.trim().parse().map(FieldValue::Year).map_err(|_| invalid()),
        }
    }

    pub fn field(&self) -> Field {
        match self {
            FieldValue::Name(_) => Field::Name,
            FieldValue::Gpa(_) => Field::Gpa,
            FieldValue::Year(_) => Field::Year,
        }
    }

    /// Key under which this value is stored in its secondary index
    pub fn index_key(&self) -> i32 {
        match self {
            FieldValue::Name(name) => name_key(&normalize_name(name)),
            FieldValue::Gpa(gpa) => gpa_key(*gpa),
            FieldValue::Year(year) => year_key(*year),
        }
    }

    /// True value comparison, exact except for GPA
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            FieldValue::Name(name) => normalize_name(name) == record.name,
            FieldValue::Gpa(gpa) => (record.gpa - gpa).abs() < GPA_EPSILON,
            FieldValue::Year(year) => record.year == *year,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Name(name) => write!(f, "name={}", name),
            FieldValue::Gpa(gpa) => write!(f, "gpa={}", gpa),
            FieldValue::Year(year) => write!(f, "year={}", year),
        }
    }
}

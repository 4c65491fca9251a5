//! Core types for XPT file handling.

use std::fmt;

use crate::error::{Result, XptError};

/// SAS Transport format version.
///
/// | Feature | V5 Limit | V8 Limit |
/// |---------|----------|----------|
/// | Variable name | 8 chars | 32 chars |
/// | Variable label | 40 chars | 256 chars |
/// | Dataset name | 8 chars | 32 chars |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XptVersion {
    /// V5/V6 format (maximum compatibility).
    #[default]
    V5,
    /// V8/V9 format (extended names and labels).
    V8,
}

impl XptVersion {
    /// Maximum length for variable names.
    #[must_use]
    pub const fn name_limit(self) -> usize {
        match self {
            Self::V5 => 8,
            Self::V8 => 32,
        }
    }

    /// Maximum length for variable labels.
    #[must_use]
    pub const fn label_limit(self) -> usize {
        match self {
            Self::V5 => 40,
            Self::V8 => 256,
        }
    }

    /// Maximum length for dataset names.
    #[must_use]
    pub const fn dataset_name_limit(self) -> usize {
        match self {
            Self::V5 => 8,
            Self::V8 => 32,
        }
    }
}

impl fmt::Display for XptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V5 => write!(f, "V5"),
            Self::V8 => write!(f, "V8"),
        }
    }
}

/// Variable data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XptType {
    /// Numeric (8-byte IBM float).
    Num,
    /// Character (fixed-width, space-padded).
    Char,
}

impl XptType {
    /// Map the NAMESTR `ntype` field (1=NUM, 2=CHAR).
    #[must_use]
    pub fn from_ntype(ntype: i16) -> Option<Self> {
        match ntype {
            1 => Some(Self::Num),
            2 => Some(Self::Char),
            _ => None,
        }
    }

    /// NAMESTR `ntype` value for this type.
    #[must_use]
    pub const fn to_ntype(self) -> i16 {
        match self {
            Self::Num => 1,
            Self::Char => 2,
        }
    }
}

/// SAS missing-value code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingValue {
    /// Standard missing (`.`).
    Standard,
    /// Underscore missing (`._`).
    Underscore,
    /// Special missing (`.A` through `.Z`).
    Special(char),
}

impl MissingValue {
    /// The marker byte stored in the first byte of the numeric field.
    #[must_use]
    pub fn marker_byte(self) -> u8 {
        match self {
            Self::Standard => b'.',
            Self::Underscore => b'_',
            Self::Special(c) => c.to_ascii_uppercase() as u8,
        }
    }
}

/// A numeric cell: either a value or one of the missing codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Value(f64),
    Missing(MissingValue),
}

impl NumericValue {
    /// True when the cell holds an actual number.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// True when the cell is any missing code.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    /// The numeric value, if present.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Missing(_) => None,
        }
    }

    /// The missing code, if missing.
    #[must_use]
    pub fn missing_type(&self) -> Option<MissingValue> {
        match self {
            Self::Value(_) => None,
            Self::Missing(m) => Some(*m),
        }
    }
}

/// A single observation cell.
#[derive(Debug, Clone, PartialEq)]
pub enum XptValue {
    Char(String),
    Num(NumericValue),
}

impl XptValue {
    /// Character value.
    pub fn character(value: impl Into<String>) -> Self {
        Self::Char(value.into())
    }

    /// Present numeric value.
    #[must_use]
    pub fn numeric(value: f64) -> Self {
        Self::Num(NumericValue::Value(value))
    }

    /// Standard missing numeric value.
    #[must_use]
    pub fn numeric_missing() -> Self {
        Self::Num(NumericValue::Missing(MissingValue::Standard))
    }

    /// True for missing numerics (character cells are never missing).
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Num(n) if n.is_missing())
    }
}

/// A variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XptColumn {
    /// Variable name (long names supported via the V8 label section).
    pub name: String,
    /// Variable label.
    pub label: Option<String>,
    /// Data type.
    pub data_type: XptType,
    /// Field width in the observation record.
    pub length: u16,
}

impl XptColumn {
    /// Numeric column (always 8 bytes wide).
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            data_type: XptType::Num,
            length: 8,
        }
    }

    /// Character column with the given field width.
    pub fn character(name: impl Into<String>, length: u16) -> Self {
        Self {
            name: name.into(),
            label: None,
            data_type: XptType::Char,
            length,
        }
    }

    /// Attach a label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An in-memory dataset parsed from (or destined for) an XPT file.
#[derive(Debug, Clone)]
pub struct XptDataset {
    /// Member (dataset) name.
    pub name: String,
    /// Member label.
    pub label: Option<String>,
    /// Variable definitions in observation order.
    pub columns: Vec<XptColumn>,
    /// Observation rows; each row has one value per column.
    pub rows: Vec<Vec<XptValue>>,
}

impl XptDataset {
    /// Empty dataset with a name and no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Dataset with predefined columns.
    pub fn with_columns(name: impl Into<String>, columns: Vec<XptColumn>) -> Self {
        Self {
            name: name.into(),
            label: None,
            columns,
            rows: Vec::new(),
        }
    }

    /// Attach a member label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a row, checking its width against the column count.
    pub fn push_row(&mut self, row: Vec<XptValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(XptError::RowLengthMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Number of observation rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of variables.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Variable names in observation order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

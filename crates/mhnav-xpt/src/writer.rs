//! XPT file writer.
//!
//! Produces transport files for round-trip checks and test fixtures; the
//! pipeline itself only reads XPT. The writer emits V5 when every name and
//! label fits the V5 field widths and upgrades to V8 (with a LABELV8
//! section) otherwise.

use std::fs;
use std::path::Path;

use crate::error::{Result, XptError};
use crate::float::{ieee_to_ibm, missing_bytes};
use crate::header::{
    NAMESTR_LEN, RECORD_LEN, build_dscrptr_header, build_label_entry, build_label_header,
    build_library_header, build_member_data, build_member_header, build_member_second,
    build_namestr, build_namestr_header, build_obs_header, build_real_header,
    build_second_header,
};
use crate::types::{NumericValue, XptColumn, XptDataset, XptType, XptValue, XptVersion};

const SAS_VERSION: &str = "9.4";
const OS_NAME: &str = "RUST";
const DATETIME: &str = "01JAN70:00:00:00";

/// Write a dataset to an XPT file.
pub fn write_xpt(path: &Path, dataset: &XptDataset) -> Result<()> {
    let bytes = xpt_to_bytes(dataset)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Encode a dataset as XPT bytes.
pub fn xpt_to_bytes(dataset: &XptDataset) -> Result<Vec<u8>> {
    validate_dataset(dataset)?;
    let version = required_version(dataset);

    let mut out = Vec::new();
    out.extend_from_slice(&build_library_header(version));
    out.extend_from_slice(&build_real_header(SAS_VERSION, OS_NAME, DATETIME));
    out.extend_from_slice(&build_second_header(DATETIME));
    out.extend_from_slice(&build_member_header(version, NAMESTR_LEN));
    out.extend_from_slice(&build_dscrptr_header(version));
    out.extend_from_slice(&build_member_data(
        version,
        &dataset.name,
        SAS_VERSION,
        OS_NAME,
        DATETIME,
    ));
    out.extend_from_slice(&build_member_second(dataset.label.as_deref(), DATETIME));
    out.extend_from_slice(&build_namestr_header(version, dataset.num_columns()));

    let mut position = 0u32;
    for (idx, column) in dataset.columns.iter().enumerate() {
        out.extend_from_slice(&build_namestr(column, (idx + 1) as u16, position));
        position += u32::from(column.length);
    }
    pad_to_record(&mut out);

    if version == XptVersion::V8 {
        write_label_section(&mut out, &dataset.columns);
    }

    out.extend_from_slice(&build_obs_header(version));
    for row in &dataset.rows {
        if row.len() != dataset.columns.len() {
            return Err(XptError::RowLengthMismatch {
                expected: dataset.columns.len(),
                actual: row.len(),
            });
        }
        for (column, value) in dataset.columns.iter().zip(row) {
            encode_value(&mut out, column, value)?;
        }
    }
    pad_to_record(&mut out);
    Ok(out)
}

fn validate_dataset(dataset: &XptDataset) -> Result<()> {
    if dataset.name.is_empty() {
        return Err(XptError::invalid_format("empty dataset name"));
    }
    if dataset.columns.is_empty() {
        return Err(XptError::invalid_format("dataset has no columns"));
    }
    for column in &dataset.columns {
        if column.length == 0 {
            return Err(XptError::zero_length(&column.name));
        }
        if column.data_type == XptType::Num && !(2..=8).contains(&column.length) {
            return Err(XptError::invalid_format(format!(
                "numeric column {} must be 2-8 bytes wide",
                column.name
            )));
        }
    }
    Ok(())
}

/// V8 is needed when any name or label exceeds its V5 field.
fn required_version(dataset: &XptDataset) -> XptVersion {
    let v5 = XptVersion::V5;
    let long_dataset = dataset.name.len() > v5.dataset_name_limit();
    let long_column = dataset.columns.iter().any(|c| {
        c.name.len() > v5.name_limit() || c.label.as_deref().is_some_and(|l| l.len() > v5.label_limit())
    });
    if long_dataset || long_column {
        XptVersion::V8
    } else {
        XptVersion::V5
    }
}

/// Emit LABELV8 entries for every column the NAMESTR fields truncate.
fn write_label_section(out: &mut Vec<u8>, columns: &[XptColumn]) {
    let long: Vec<(u16, &XptColumn)> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.name.len() > 8 || c.label.as_deref().is_some_and(|l| l.len() > 40)
        })
        .map(|(idx, c)| ((idx + 1) as u16, c))
        .collect();
    if long.is_empty() {
        return;
    }
    out.extend_from_slice(&build_label_header(long.len()));
    for (varnum, column) in long {
        out.extend_from_slice(&build_label_entry(
            varnum,
            &column.name,
            column.label.as_deref().unwrap_or(""),
        ));
    }
    pad_to_record(out);
}

/// Encode one cell into the observation stream.
fn encode_value(out: &mut Vec<u8>, column: &XptColumn, value: &XptValue) -> Result<()> {
    match (column.data_type, value) {
        (XptType::Char, XptValue::Char(s)) => {
            let width = column.length as usize;
            let bytes = s.as_bytes();
            if bytes.len() >= width {
                out.extend_from_slice(&bytes[..width]);
            } else {
                out.extend_from_slice(bytes);
                out.resize(out.len() + (width - bytes.len()), b' ');
            }
        }
        (XptType::Num, XptValue::Num(numeric)) => {
            let encoded = match numeric {
                NumericValue::Value(v) => ieee_to_ibm(*v),
                NumericValue::Missing(m) => missing_bytes(*m),
            };
            out.extend_from_slice(&encoded[..column.length as usize]);
        }
        _ => {
            return Err(XptError::invalid_format(format!(
                "column {}: value does not match the declared type",
                column.name
            )));
        }
    }
    Ok(())
}

/// Pad with spaces up to the next 80-byte boundary.
fn pad_to_record(out: &mut Vec<u8>) {
    let rem = out.len() % RECORD_LEN;
    if rem != 0 {
        out.resize(out.len() + (RECORD_LEN - rem), b' ');
    }
}

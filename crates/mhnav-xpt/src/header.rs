//! XPT header record parsing and building.
//!
//! An XPT file is a sequence of 80-byte records:
//!
//! 1. Library header, real header (SAS version, OS, created), second header
//! 2. Member header, DSCRPTR header
//! 3. Member data (dataset name), member second (label)
//! 4. NAMESTR header plus one 140-byte NAMESTR per variable, record-aligned
//! 5. Optional LABELV8/LABELV9 section carrying long names and labels
//! 6. OBS header followed by packed observation data
//!
//! V8 files use the same layout with `*V8` header prefixes, a 32-character
//! dataset-name field, a six-digit variable count, and the label section.

use crate::error::{Result, XptError};
use crate::types::{XptColumn, XptType, XptVersion};

/// Record length in bytes.
pub const RECORD_LEN: usize = 80;

/// NAMESTR record length.
pub const NAMESTR_LEN: usize = 140;

/// V5 library header prefix.
pub const LIBRARY_HEADER_PREFIX: &str = "HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!";
/// V8 library header prefix.
pub const LIBRARY_V8_HEADER_PREFIX: &str = "HEADER RECORD*******LIBV8   HEADER RECORD!!!!!!!";
/// V5 member header prefix.
pub const MEMBER_HEADER_PREFIX: &str = "HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!";
/// V8 member header prefix.
pub const MEMBER_V8_HEADER_PREFIX: &str = "HEADER RECORD*******MEMBV8  HEADER RECORD!!!!!!!";
/// V5 descriptor header prefix.
pub const DSCRPTR_HEADER_PREFIX: &str = "HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!";
/// V8 descriptor header prefix.
pub const DSCRPTR_V8_HEADER_PREFIX: &str = "HEADER RECORD*******DSCPTV8 HEADER RECORD!!!!!!!";
/// V5 NAMESTR header prefix.
pub const NAMESTR_HEADER_PREFIX: &str = "HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!";
/// V8 NAMESTR header prefix.
pub const NAMESTR_V8_HEADER_PREFIX: &str = "HEADER RECORD*******NAMSTV8 HEADER RECORD!!!!!!!";
/// V5 OBS header prefix.
pub const OBS_HEADER_PREFIX: &str = "HEADER RECORD*******OBS     HEADER RECORD!!!!!!!";
/// V8 OBS header prefix.
pub const OBS_V8_HEADER_PREFIX: &str = "HEADER RECORD*******OBSV8   HEADER RECORD!!!!!!!";
/// Long-name/label section prefix (V8).
pub const LABELV8_HEADER_PREFIX: &str = "HEADER RECORD*******LABELV8 HEADER RECORD!!!!!!!";
/// Long-name/label section prefix with formats (V9).
pub const LABELV9_HEADER_PREFIX: &str = "HEADER RECORD*******LABELV9 HEADER RECORD!!!!!!!";

/// Which long-label section variant a header record announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSection {
    /// Name and label per entry.
    V8,
    /// Name, label, format, and informat per entry.
    V9,
}

fn validate_prefixed(
    record: &[u8],
    v5_prefix: &str,
    v8_prefix: &str,
    expected: &'static str,
) -> Result<XptVersion> {
    if record.len() < RECORD_LEN {
        return Err(XptError::invalid_format("record too short"));
    }
    if record.starts_with(v5_prefix.as_bytes()) {
        Ok(XptVersion::V5)
    } else if record.starts_with(v8_prefix.as_bytes()) {
        Ok(XptVersion::V8)
    } else {
        Err(XptError::missing_header(expected))
    }
}

/// Validate the library header and detect the transport version.
pub fn validate_library_header(record: &[u8]) -> Result<XptVersion> {
    validate_prefixed(
        record,
        LIBRARY_HEADER_PREFIX,
        LIBRARY_V8_HEADER_PREFIX,
        "LIBRARY HEADER",
    )
}

/// Validate a member header record.
pub fn validate_member_header(record: &[u8]) -> Result<XptVersion> {
    validate_prefixed(
        record,
        MEMBER_HEADER_PREFIX,
        MEMBER_V8_HEADER_PREFIX,
        "MEMBER HEADER",
    )
}

/// Validate a DSCRPTR header record.
pub fn validate_dscrptr_header(record: &[u8]) -> Result<XptVersion> {
    validate_prefixed(
        record,
        DSCRPTR_HEADER_PREFIX,
        DSCRPTR_V8_HEADER_PREFIX,
        "DSCRPTR HEADER",
    )
}

/// Validate a NAMESTR header record.
pub fn validate_namestr_header(record: &[u8]) -> Result<XptVersion> {
    validate_prefixed(
        record,
        NAMESTR_HEADER_PREFIX,
        NAMESTR_V8_HEADER_PREFIX,
        "NAMESTR HEADER",
    )
}

/// Validate an OBS header record.
pub fn validate_obs_header(record: &[u8]) -> Result<XptVersion> {
    validate_prefixed(
        record,
        OBS_HEADER_PREFIX,
        OBS_V8_HEADER_PREFIX,
        "OBS HEADER",
    )
}

/// Detect a LABELV8/LABELV9 section header.
#[must_use]
pub fn is_label_header(record: &[u8]) -> Option<LabelSection> {
    if record.starts_with(LABELV8_HEADER_PREFIX.as_bytes()) {
        Some(LabelSection::V8)
    } else if record.starts_with(LABELV9_HEADER_PREFIX.as_bytes()) {
        Some(LabelSection::V9)
    } else {
        None
    }
}

/// Parse NAMESTR length from the member header (offset 74, four digits).
pub fn parse_namestr_len(record: &[u8]) -> Result<usize> {
    if record.len() < 78 {
        return Err(XptError::invalid_format("member header too short"));
    }
    read_string(record, 74, 4)
        .trim()
        .parse::<usize>()
        .map_err(|_| XptError::NumericParse {
            field: "NAMESTR length".to_string(),
        })
}

/// Parse the variable count from the NAMESTR header.
///
/// Four digits at offset 54 in V5, six digits in V8.
pub fn parse_variable_count(record: &[u8], version: XptVersion) -> Result<usize> {
    let digits = match version {
        XptVersion::V5 => 4,
        XptVersion::V8 => 6,
    };
    if record.len() < 54 + digits {
        return Err(XptError::invalid_format("namestr header too short"));
    }
    read_string(record, 54, digits)
        .trim()
        .parse::<usize>()
        .map_err(|_| XptError::NumericParse {
            field: "variable count".to_string(),
        })
}

/// Parse the entry count from a LABELV8/V9 header (offset 48, five digits).
pub fn parse_label_count(record: &[u8]) -> Result<usize> {
    if record.len() < 53 {
        return Err(XptError::invalid_format("label header too short"));
    }
    read_string(record, 48, 5)
        .trim()
        .parse::<usize>()
        .map_err(|_| XptError::NumericParse {
            field: "label entry count".to_string(),
        })
}

/// Parse the dataset name from the member data record.
///
/// Eight characters at offset 8 in V5; V8 widens the field to 32.
pub fn parse_dataset_name(record: &[u8], version: XptVersion) -> Result<String> {
    let width = version.dataset_name_limit();
    if record.len() < 8 + width {
        return Err(XptError::invalid_format("member data too short"));
    }
    let name = read_string(record, 8, width);
    if name.is_empty() {
        return Err(XptError::invalid_format("empty dataset name"));
    }
    Ok(name)
}

/// Parse the dataset label from the member second record (offset 32, 40 chars).
#[must_use]
pub fn parse_dataset_label(record: &[u8]) -> Option<String> {
    if record.len() < 72 {
        return None;
    }
    let label = read_string(record, 32, 40);
    if label.is_empty() { None } else { Some(label) }
}

/// Parse a single NAMESTR record into an [`XptColumn`].
///
/// Only the fields this pipeline consumes are kept: type, length, name, and
/// label. Format, informat, and justification bytes are skipped.
pub fn parse_namestr(data: &[u8], namestr_len: usize, index: usize) -> Result<XptColumn> {
    if data.len() < namestr_len.min(88) {
        return Err(XptError::InvalidNamestr {
            index,
            message: format!("data too short: {} bytes", data.len()),
        });
    }

    let ntype = read_i16(data, 0);
    let data_type = XptType::from_ntype(ntype).ok_or_else(|| XptError::InvalidNamestr {
        index,
        message: format!("invalid ntype: {ntype}"),
    })?;

    let length = read_i16(data, 4) as u16;
    if length == 0 {
        return Err(XptError::InvalidNamestr {
            index,
            message: "variable length is zero".to_string(),
        });
    }

    let name = read_string(data, 8, 8);
    if name.is_empty() {
        return Err(XptError::InvalidNamestr {
            index,
            message: "empty variable name".to_string(),
        });
    }

    let label = read_string(data, 16, 40);

    Ok(XptColumn {
        name,
        label: if label.is_empty() { None } else { Some(label) },
        data_type,
        length,
    })
}

/// Parse `var_count` consecutive NAMESTR records.
pub fn parse_namestr_records(
    data: &[u8],
    var_count: usize,
    namestr_len: usize,
) -> Result<Vec<XptColumn>> {
    let mut columns = Vec::with_capacity(var_count);
    for idx in 0..var_count {
        let offset = idx
            .checked_mul(namestr_len)
            .ok_or(XptError::ObservationOverflow)?;
        let record =
            data.get(offset..offset + namestr_len)
                .ok_or_else(|| XptError::InvalidNamestr {
                    index: idx,
                    message: "NAMESTR data out of bounds".to_string(),
                })?;
        columns.push(parse_namestr(record, namestr_len, idx)?);
    }
    Ok(columns)
}

/// Apply a LABELV8/V9 section to already-parsed columns.
///
/// Each entry restores the full variable name (NAMESTR truncates to eight
/// characters) and the full label. V9 entries additionally carry format and
/// informat text, which is skipped.
pub fn parse_label_data(
    data: &[u8],
    count: usize,
    section: LabelSection,
    columns: &mut [XptColumn],
) -> Result<()> {
    let mut pos = 0usize;
    for _ in 0..count {
        let header_len = match section {
            LabelSection::V8 => 6,
            LabelSection::V9 => 10,
        };
        let entry = data
            .get(pos..pos + header_len)
            .ok_or(XptError::RecordOutOfBounds { offset: pos })?;
        let varnum = read_i16(entry, 0) as usize;
        let name_len = read_i16(entry, 2) as usize;
        let label_len = read_i16(entry, 4) as usize;
        let (format_len, informat_len) = match section {
            LabelSection::V8 => (0, 0),
            LabelSection::V9 => (read_i16(entry, 6) as usize, read_i16(entry, 8) as usize),
        };
        pos += header_len;

        let text_len = name_len + label_len + format_len + informat_len;
        let text = data
            .get(pos..pos + text_len)
            .ok_or(XptError::RecordOutOfBounds { offset: pos })?;
        pos += text_len;

        if varnum == 0 || varnum > columns.len() {
            return Err(XptError::invalid_format(format!(
                "label entry references variable {varnum} of {}",
                columns.len()
            )));
        }
        let column = &mut columns[varnum - 1];
        let name = String::from_utf8_lossy(&text[..name_len]).trim_end().to_string();
        if !name.is_empty() {
            column.name = name;
        }
        let label = String::from_utf8_lossy(&text[name_len..name_len + label_len])
            .trim_end()
            .to_string();
        if !label.is_empty() {
            column.label = Some(label);
        }
    }
    Ok(())
}

/// Build the fixed library header record.
#[must_use]
pub fn build_library_header(version: XptVersion) -> [u8; RECORD_LEN] {
    match version {
        XptVersion::V5 => build_fixed_header(LIBRARY_HEADER_PREFIX),
        XptVersion::V8 => build_fixed_header(LIBRARY_V8_HEADER_PREFIX),
    }
}

/// Build the library real header (SAS symbols, version, OS, created).
#[must_use]
pub fn build_real_header(sas_version: &str, os_name: &str, created: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, "SAS", 8);
    write_string(&mut record, 8, "SAS", 8);
    write_string(&mut record, 16, "SASLIB", 8);
    write_string(&mut record, 24, sas_version, 8);
    write_string(&mut record, 32, os_name, 8);
    write_string(&mut record, 64, created, 16);
    record
}

/// Build the library second header (modified datetime).
#[must_use]
pub fn build_second_header(modified: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, modified, 16);
    record
}

/// Build the member header with the NAMESTR length field.
#[must_use]
pub fn build_member_header(version: XptVersion, namestr_len: usize) -> [u8; RECORD_LEN] {
    let mut record = match version {
        XptVersion::V5 => build_fixed_header(MEMBER_HEADER_PREFIX),
        XptVersion::V8 => build_fixed_header(MEMBER_V8_HEADER_PREFIX),
    };
    write_string(&mut record, 64, "0160", 4);
    let len_str = format!("{namestr_len:04}");
    write_string(&mut record, 74, &len_str, 4);
    record
}

/// Build the DSCRPTR header record.
#[must_use]
pub fn build_dscrptr_header(version: XptVersion) -> [u8; RECORD_LEN] {
    match version {
        XptVersion::V5 => build_fixed_header(DSCRPTR_HEADER_PREFIX),
        XptVersion::V8 => build_fixed_header(DSCRPTR_V8_HEADER_PREFIX),
    }
}

/// Build the member data record carrying the dataset name.
#[must_use]
pub fn build_member_data(
    version: XptVersion,
    dataset_name: &str,
    sas_version: &str,
    os_name: &str,
    created: &str,
) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, "SAS", 8);
    let name_width = version.dataset_name_limit();
    write_string(&mut record, 8, dataset_name, name_width);
    write_string(&mut record, 8 + name_width, "SASDATA", 8);
    write_string(&mut record, 16 + name_width, sas_version, 8);
    write_string(&mut record, 24 + name_width, os_name, 8);
    write_string(&mut record, 64, created, 16);
    record
}

/// Build the member second record (modified datetime plus label).
#[must_use]
pub fn build_member_second(label: Option<&str>, modified: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, modified, 16);
    write_string(&mut record, 32, label.unwrap_or(""), 40);
    record
}

/// Build the NAMESTR header with the variable count.
#[must_use]
pub fn build_namestr_header(version: XptVersion, var_count: usize) -> [u8; RECORD_LEN] {
    match version {
        XptVersion::V5 => {
            let mut record = build_fixed_header(NAMESTR_HEADER_PREFIX);
            let count = format!("{var_count:04}");
            write_string(&mut record, 54, &count, 4);
            record
        }
        XptVersion::V8 => {
            let mut record = build_fixed_header(NAMESTR_V8_HEADER_PREFIX);
            let count = format!("{var_count:06}");
            write_string(&mut record, 54, &count, 6);
            record
        }
    }
}

/// Build one 140-byte NAMESTR record.
///
/// The in-record name field holds at most eight characters; longer names are
/// truncated here and restored from the LABELV8 section on read.
#[must_use]
pub fn build_namestr(column: &XptColumn, varnum: u16, position: u32) -> [u8; NAMESTR_LEN] {
    let mut buf = [0u8; NAMESTR_LEN];
    write_i16(&mut buf, 0, column.data_type.to_ntype());
    write_i16(&mut buf, 2, 0);
    write_i16(&mut buf, 4, column.length as i16);
    write_i16(&mut buf, 6, varnum as i16);
    write_padded(&mut buf, 8, truncate_ascii(&column.name, 8), 8);
    let label = column.label.as_deref().unwrap_or("");
    write_padded(&mut buf, 16, truncate_ascii(label, 40), 40);
    // Format and informat fields (56..84) stay zeroed.
    write_i32(&mut buf, 84, position as i32);
    buf
}

/// Build the LABELV8 section header with its entry count.
#[must_use]
pub fn build_label_header(count: usize) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    let prefix = LABELV8_HEADER_PREFIX.as_bytes();
    record[..prefix.len()].copy_from_slice(prefix);
    let count_str = format!("{count:05}");
    write_string(&mut record, 48, &count_str, 5);
    record
}

/// Encode one LABELV8 entry (varnum, name, label).
#[must_use]
pub fn build_label_entry(varnum: u16, name: &str, label: &str) -> Vec<u8> {
    let name = truncate_ascii(name, 32);
    let label = truncate_ascii(label, 256);
    let mut entry = Vec::with_capacity(6 + name.len() + label.len());
    entry.extend_from_slice(&(varnum as i16).to_be_bytes());
    entry.extend_from_slice(&(name.len() as i16).to_be_bytes());
    entry.extend_from_slice(&(label.len() as i16).to_be_bytes());
    entry.extend_from_slice(name.as_bytes());
    entry.extend_from_slice(label.as_bytes());
    entry
}

/// Build the OBS header record.
#[must_use]
pub fn build_obs_header(version: XptVersion) -> [u8; RECORD_LEN] {
    match version {
        XptVersion::V5 => build_fixed_header(OBS_HEADER_PREFIX),
        XptVersion::V8 => build_fixed_header(OBS_V8_HEADER_PREFIX),
    }
}

/// Align a size up to the next 80-byte record boundary.
#[must_use]
pub fn align_to_record(size: usize) -> usize {
    if size % RECORD_LEN == 0 {
        size
    } else {
        size + (RECORD_LEN - (size % RECORD_LEN))
    }
}

fn build_fixed_header(prefix: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    let prefix_bytes = prefix.as_bytes();
    let copy_len = prefix_bytes.len().min(48);
    record[..copy_len].copy_from_slice(&prefix_bytes[..copy_len]);
    for slot in record.iter_mut().take(78).skip(48) {
        *slot = b'0';
    }
    record
}

fn read_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([data[offset], data[offset + 1]])
}

fn write_i16(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

fn read_string(data: &[u8], offset: usize, len: usize) -> String {
    data.get(offset..offset + len)
        .map(|slice| String::from_utf8_lossy(slice).trim_end().to_string())
        .unwrap_or_default()
}

fn write_string(buf: &mut [u8], offset: usize, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let copy_len = bytes.len().min(len);
    buf[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
}

/// Write into a zero-initialized buffer, space-padding the rest of the field.
fn write_padded(buf: &mut [u8], offset: usize, value: &str, len: usize) {
    write_string(buf, offset, value, len);
    for slot in buf
        .iter_mut()
        .skip(offset + value.len().min(len))
        .take(len.saturating_sub(value.len()))
    {
        *slot = b' ';
    }
}

fn truncate_ascii(value: &str, limit: usize) -> &str {
    if value.len() <= limit {
        value
    } else {
        let mut end = limit;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        &value[..end]
    }
}

//! XPT file reader.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, XptError};
use crate::float::{ibm_to_ieee, is_missing};
use crate::header::{
    RECORD_LEN, align_to_record, is_label_header, parse_dataset_label, parse_dataset_name,
    parse_label_count, parse_label_data, parse_namestr_len, parse_namestr_records,
    parse_variable_count, validate_dscrptr_header, validate_library_header,
    validate_member_header, validate_namestr_header, validate_obs_header,
};
use crate::types::{MissingValue, NumericValue, XptColumn, XptDataset, XptType, XptValue};

/// XPT file reader.
///
/// Reads SAS Transport V5 or V8 format files with auto-detection.
pub struct XptReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> XptReader<R> {
    /// Create a new XPT reader over any byte source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the entire XPT stream into memory and parse it.
    ///
    /// # Returns
    /// The first dataset in the file.
    pub fn read_dataset(mut self) -> Result<XptDataset> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data)?;
        parse_xpt_data(&data)
    }
}

impl XptReader<File> {
    /// Open an XPT file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                XptError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                XptError::Io(e)
            }
        })?;
        Ok(Self::new(file))
    }
}

/// Read an XPT file from a path.
pub fn read_xpt(path: &Path) -> Result<XptDataset> {
    XptReader::open(path)?.read_dataset()
}

/// Parse XPT data from bytes.
fn parse_xpt_data(data: &[u8]) -> Result<XptDataset> {
    if data.len() < RECORD_LEN * 8 {
        return Err(XptError::invalid_format("file too small"));
    }
    if !data.len().is_multiple_of(RECORD_LEN) {
        return Err(XptError::invalid_format(
            "file length is not a multiple of 80",
        ));
    }

    let mut offset = 0usize;

    // Library header determines the transport version for the whole file.
    let library_header = read_record(data, offset)?;
    let version = validate_library_header(library_header)?;
    offset += RECORD_LEN;

    // Skip library real header and modified header.
    offset += RECORD_LEN * 2;

    let member_header = read_record(data, offset)?;
    validate_member_header(member_header)?;
    let namestr_len = parse_namestr_len(member_header)?;
    offset += RECORD_LEN;

    let dscrptr_header = read_record(data, offset)?;
    validate_dscrptr_header(dscrptr_header)?;
    offset += RECORD_LEN;

    let member_data = read_record(data, offset)?;
    let dataset_name = parse_dataset_name(member_data, version)?;
    offset += RECORD_LEN;

    let member_second = read_record(data, offset)?;
    let dataset_label = parse_dataset_label(member_second);
    offset += RECORD_LEN;

    let namestr_header = read_record(data, offset)?;
    validate_namestr_header(namestr_header)?;
    let var_count = parse_variable_count(namestr_header, version)?;
    offset += RECORD_LEN;

    let namestr_total = var_count
        .checked_mul(namestr_len)
        .ok_or(XptError::ObservationOverflow)?;
    let namestr_data = read_block(data, offset, namestr_total)?;
    offset += namestr_total;
    offset = align_to_record(offset);

    let mut columns = parse_namestr_records(namestr_data, var_count, namestr_len)?;

    // Optional LABELV8/V9 section restores names longer than eight characters.
    let next_record = read_record(data, offset)?;
    if let Some(section) = is_label_header(next_record) {
        let count = parse_label_count(next_record)?;
        offset += RECORD_LEN;

        let mut label_end = offset;
        while label_end + RECORD_LEN <= data.len() {
            let check_record = read_record(data, label_end)?;
            if validate_obs_header(check_record).is_ok() {
                break;
            }
            label_end += RECORD_LEN;
        }
        parse_label_data(&data[offset..label_end], count, section, &mut columns)?;
        offset = label_end;
    }

    let obs_header = read_record(data, offset)?;
    validate_obs_header(obs_header)?;
    offset += RECORD_LEN;

    let obs_len = observation_length(&columns)?;
    let rows = parse_observations(data, offset, obs_len, &columns)?;

    Ok(XptDataset {
        name: dataset_name,
        label: dataset_label,
        columns,
        rows,
    })
}

/// Read a single 80-byte record.
fn read_record(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..offset + RECORD_LEN)
        .ok_or(XptError::RecordOutOfBounds { offset })
}

/// Read a block of bytes.
fn read_block(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.get(offset..offset + len)
        .ok_or(XptError::RecordOutOfBounds { offset })
}

/// Total observation record width across all columns.
fn observation_length(columns: &[XptColumn]) -> Result<usize> {
    let mut total = 0usize;
    for column in columns {
        total = total
            .checked_add(column.length as usize)
            .ok_or(XptError::ObservationOverflow)?;
    }
    Ok(total)
}

/// Parse observation data into rows.
///
/// The final partial record is space padding; trailing all-space rows are
/// trimmed the same way SAS readers do.
fn parse_observations(
    data: &[u8],
    offset: usize,
    obs_len: usize,
    columns: &[XptColumn],
) -> Result<Vec<Vec<XptValue>>> {
    if obs_len == 0 {
        return Ok(Vec::new());
    }
    if offset > data.len() {
        return Err(XptError::RecordOutOfBounds { offset });
    }

    let data_len = data.len().saturating_sub(offset);
    let mut rows_total = data_len / obs_len;
    let remainder = data_len % obs_len;

    if remainder != 0 {
        let start = offset + rows_total * obs_len;
        let rem_bytes = &data[start..offset + data_len];
        if rem_bytes.iter().any(|&b| b != b' ') {
            return Err(XptError::TrailingBytes);
        }
    }

    while rows_total > 0 {
        let start = offset + (rows_total - 1) * obs_len;
        let row_bytes = &data[start..start + obs_len];
        if row_bytes.iter().all(|&b| b == b' ') {
            rows_total -= 1;
        } else {
            break;
        }
    }

    let mut output = Vec::with_capacity(rows_total);
    for row_idx in 0..rows_total {
        let start = offset + row_idx * obs_len;
        let row_bytes = &data[start..start + obs_len];
        output.push(parse_row(row_bytes, columns));
    }
    Ok(output)
}

/// Parse a single row of observation data.
fn parse_row(row_bytes: &[u8], columns: &[XptColumn]) -> Vec<XptValue> {
    let mut values = Vec::with_capacity(columns.len());
    let mut pos = 0usize;
    for column in columns {
        let len = column.length as usize;
        let slice = &row_bytes[pos..pos + len];
        let value = match column.data_type {
            XptType::Char => XptValue::Char(decode_char(slice)),
            XptType::Num => XptValue::Num(decode_numeric(slice)),
        };
        values.push(value);
        pos += len;
    }
    values
}

/// Decode a character value, trimming the space padding.
fn decode_char(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

/// Decode a numeric value, checking missing markers before conversion.
fn decode_numeric(bytes: &[u8]) -> NumericValue {
    if bytes.is_empty() {
        return NumericValue::Missing(MissingValue::Standard);
    }
    if let Some(missing) = is_missing(bytes) {
        return NumericValue::Missing(missing);
    }
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    NumericValue::Value(ibm_to_ieee(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_char_trims_padding() {
        assert_eq!(decode_char(b"hello   "), "hello");
        assert_eq!(decode_char(b""), "");
    }

    #[test]
    fn test_decode_numeric_missing() {
        let missing_standard = [0x2e, 0, 0, 0, 0, 0, 0, 0];
        let result = decode_numeric(&missing_standard);
        assert!(result.is_missing());
        assert_eq!(result.missing_type(), Some(MissingValue::Standard));

        let missing_a = [0x41, 0, 0, 0, 0, 0, 0, 0];
        let result = decode_numeric(&missing_a);
        assert_eq!(result.missing_type(), Some(MissingValue::Special('A')));
    }

    #[test]
    fn test_decode_numeric_value() {
        let one = [0x41, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let result = decode_numeric(&one);
        assert!(result.is_present());
        assert_eq!(result.value(), Some(1.0));
    }

    #[test]
    fn test_observation_length() {
        let columns = vec![XptColumn::numeric("A"), XptColumn::character("B", 20)];
        assert_eq!(observation_length(&columns).unwrap(), 28);
    }

    #[test]
    fn test_rejects_tiny_files() {
        let err = parse_xpt_data(&[0u8; 80]).unwrap_err();
        assert!(matches!(err, XptError::InvalidFormat { .. }));
    }

    #[test]
    fn test_rejects_unaligned_files() {
        let err = parse_xpt_data(&[b' '; 80 * 8 + 1]).unwrap_err();
        assert!(matches!(err, XptError::InvalidFormat { .. }));
    }
}

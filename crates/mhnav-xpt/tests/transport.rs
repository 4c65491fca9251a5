use mhnav_xpt::{
    MissingValue, NumericValue, XptColumn, XptDataset, XptReader, XptValue, read_xpt, write_xpt,
    xpt_to_bytes,
};

fn note_extract() -> XptDataset {
    let mut ds = XptDataset::with_columns(
        "note_extract",
        vec![
            XptColumn::character("studyid", 8),
            XptColumn::character("pat_enc_csn_id", 12).with_label("Encounter CSN"),
            XptColumn::character("note_date", 10),
            XptColumn::character("note_text", 60),
            XptColumn::numeric("note_line"),
        ],
    );
    ds.push_row(vec![
        XptValue::character("9"),
        XptValue::character("1001"),
        XptValue::character("2020-01-10"),
        XptValue::character("patient reports suicidal thoughts"),
        XptValue::numeric(1.0),
    ])
    .unwrap();
    ds.push_row(vec![
        XptValue::character("9"),
        XptValue::character("1001"),
        XptValue::character("2020-01-10"),
        XptValue::character("denies current plan"),
        XptValue::numeric(2.0),
    ])
    .unwrap();
    ds
}

#[test]
fn roundtrip_through_memory() {
    let original = note_extract();
    let bytes = xpt_to_bytes(&original).unwrap();

    let parsed = XptReader::new(&bytes[..]).read_dataset().unwrap();
    assert_eq!(parsed.name, "note_extract");
    assert_eq!(parsed.num_rows(), 2);
    assert_eq!(
        parsed.column_names(),
        vec![
            "studyid",
            "pat_enc_csn_id",
            "note_date",
            "note_text",
            "note_line"
        ]
    );
    assert_eq!(
        parsed.columns[1].label.as_deref(),
        Some("Encounter CSN")
    );
    assert_eq!(
        parsed.rows[0][3],
        XptValue::character("patient reports suicidal thoughts")
    );
    assert_eq!(parsed.rows[1][4], XptValue::numeric(2.0));
}

#[test]
fn roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.xpt");

    write_xpt(&path, &note_extract()).unwrap();
    let parsed = read_xpt(&path).unwrap();

    assert_eq!(parsed.num_rows(), 2);
    assert_eq!(parsed.columns[1].name, "pat_enc_csn_id");
}

#[test]
fn missing_numerics_survive_roundtrip() {
    let mut ds = XptDataset::with_columns(
        "m",
        vec![XptColumn::character("id", 4), XptColumn::numeric("val")],
    );
    ds.push_row(vec![XptValue::character("a"), XptValue::numeric_missing()])
        .unwrap();
    ds.push_row(vec![
        XptValue::character("b"),
        XptValue::Num(NumericValue::Missing(MissingValue::Special('B'))),
    ])
    .unwrap();
    ds.push_row(vec![XptValue::character("c"), XptValue::numeric(-2.5)])
        .unwrap();

    let bytes = xpt_to_bytes(&ds).unwrap();
    let parsed = XptReader::new(&bytes[..]).read_dataset().unwrap();

    assert!(parsed.rows[0][1].is_missing());
    assert_eq!(
        parsed.rows[1][1],
        XptValue::Num(NumericValue::Missing(MissingValue::Special('B')))
    );
    assert_eq!(parsed.rows[2][1], XptValue::numeric(-2.5));
}

#[test]
fn empty_dataset_roundtrips_columns_only() {
    let ds = XptDataset::with_columns(
        "empty",
        vec![
            XptColumn::character("index_pat_enc_csn_id", 12),
            XptColumn::character("note_text", 40),
        ],
    );
    let bytes = xpt_to_bytes(&ds).unwrap();
    let parsed = XptReader::new(&bytes[..]).read_dataset().unwrap();

    assert_eq!(parsed.num_rows(), 0);
    assert_eq!(
        parsed.column_names(),
        vec!["index_pat_enc_csn_id", "note_text"]
    );
}

#[test]
fn wide_values_truncate_to_field_width() {
    let mut ds = XptDataset::with_columns("w", vec![XptColumn::character("t", 5)]);
    ds.push_row(vec![XptValue::character("truncated body")])
        .unwrap();

    let bytes = xpt_to_bytes(&ds).unwrap();
    let parsed = XptReader::new(&bytes[..]).read_dataset().unwrap();
    assert_eq!(parsed.rows[0][0], XptValue::character("trunc"));
}

#[test]
fn missing_file_reports_path() {
    let err = read_xpt(std::path::Path::new("/nonexistent/notes.xpt")).unwrap_err();
    assert!(format!("{err}").contains("/nonexistent/notes.xpt"));
}

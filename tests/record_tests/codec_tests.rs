//! Tests for the record codec and field model
//!
//! These tests verify:
//! - Fixed slot size and byte layout
//! - Encode/decode round trips
//! - Lossy name truncation and whitespace trimming
//! - Malformed slot detection
//! - Field name parsing and value matching

use slotdb::record::{
    decode, decode_slot, encode, normalize_name, Field, FieldValue, Record, SlotState, NAME_WIDTH,
    RECORD_SIZE,
};
use slotdb::DbError;

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_record_size_is_constant() {
    assert_eq!(RECORD_SIZE, 1 + 4 + NAME_WIDTH + 8 + 4);
    assert_eq!(RECORD_SIZE, 49);

    let short = encode(&Record::new(1, "A", 0.0, 0));
    let long = encode(&Record::new(2, &"B".repeat(100), 4.0, 2024));
    assert_eq!(short.len(), RECORD_SIZE);
    assert_eq!(long.len(), RECORD_SIZE);
}

#[test]
fn test_encode_byte_layout() {
    let bytes = encode(&Record::new(1, "Ann", 3.75, 2021));

    assert_eq!(bytes[0], SlotState::Live as u8);
    assert_eq!(&bytes[1..5], &1i32.to_be_bytes());
    assert_eq!(&bytes[5..8], b"Ann");
    assert!(bytes[8..5 + NAME_WIDTH].iter().all(|&b| b == b' '));
    assert_eq!(&bytes[37..45], &3.75f64.to_be_bytes());
    assert_eq!(&bytes[45..49], &2021i32.to_be_bytes());
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip() {
    let record = Record::new(1, "Ann", 3.75, 2021);
    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn test_round_trip_extreme_values() {
    let record = Record::new(i32::MIN, "Zoë Ångström", -0.5, i32::MAX);
    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn test_round_trip_name_exactly_full_width() {
    let name = "x".repeat(NAME_WIDTH);
    let record = Record::new(9, &name, 2.0, 2020);
    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded.name, name);
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    let record = Record::new(5, "Eve", 1.5, 2019);
    let mut bytes = encode(&record).to_vec();
    bytes.extend_from_slice(b"garbage after the slot");

    assert_eq!(decode(&bytes).unwrap(), record);
}

// =============================================================================
// Truncation / Trimming Tests
// =============================================================================

#[test]
fn test_oversized_name_is_truncated() {
    let record = Record {
        id: 1,
        name: "A".repeat(40),
        gpa: 3.0,
        year: 2020,
    };

    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded.name, "A".repeat(NAME_WIDTH));
}

#[test]
fn test_truncation_respects_char_boundaries() {
    // 'a' + 20 two-byte chars: byte 32 falls inside a char
    let name = format!("a{}", "é".repeat(20));
    let record = Record {
        id: 2,
        name,
        gpa: 3.0,
        year: 2020,
    };

    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded.name, format!("a{}", "é".repeat(15)));
    assert_eq!(decoded.name.len(), 31);
}

#[test]
fn test_whitespace_is_trimmed_on_read() {
    let record = Record {
        id: 3,
        name: "  Bob  ".to_string(),
        gpa: 2.5,
        year: 2018,
    };

    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded.name, "Bob");
}

#[test]
fn test_record_new_normalizes_name() {
    assert_eq!(Record::new(1, "  Bob ", 1.0, 1).name, "Bob");
    assert_eq!(Record::new(1, &"C".repeat(50), 1.0, 1).name, "C".repeat(NAME_WIDTH));
    assert_eq!(normalize_name(" x "), "x");
}

#[test]
fn test_empty_name() {
    let record = Record::new(4, "", 0.0, 0);
    let decoded = decode(&encode(&record)).unwrap();
    assert_eq!(decoded.name, "");
}

// =============================================================================
// Malformed Slot Tests
// =============================================================================

#[test]
fn test_decode_short_buffer_fails() {
    let bytes = encode(&Record::new(1, "Ann", 3.75, 2021));

    let result = decode(&bytes[..RECORD_SIZE - 1]);
    assert!(matches!(result, Err(DbError::MalformedRecord(_))));

    let result = decode(&[]);
    assert!(matches!(result, Err(DbError::MalformedRecord(_))));
}

#[test]
fn test_decode_slot_reports_tombstone() {
    let mut bytes = encode(&Record::new(1, "Ann", 3.75, 2021)).to_vec();
    bytes[0] = SlotState::Deleted as u8;

    let (state, record) = decode_slot(&bytes).unwrap();
    assert_eq!(state, SlotState::Deleted);
    assert_eq!(record.id, 1);
    assert_eq!(record.name, "Ann");
}

#[test]
fn test_decode_unknown_state_byte_fails() {
    let mut bytes = encode(&Record::new(1, "Ann", 3.75, 2021)).to_vec();
    bytes[0] = 0x7F;

    assert!(matches!(decode_slot(&bytes), Err(DbError::MalformedRecord(_))));
}

#[test]
fn test_decode_invalid_utf8_name_fails() {
    let mut bytes = encode(&Record::new(1, "Ann", 3.75, 2021)).to_vec();
    bytes[5] = 0xFF;

    assert!(matches!(decode(&bytes), Err(DbError::MalformedRecord(_))));
}

// =============================================================================
// Display Tests
// =============================================================================

#[test]
fn test_record_display() {
    let record = Record::new(1, "Ann", 3.75, 2021);
    assert_eq!(record.to_string(), "ID: 1, Name: Ann, GPA: 3.75, Year: 2021");
}

// =============================================================================
// Field Tests
// =============================================================================

#[test]
fn test_field_parse_known_names() {
    assert_eq!("name".parse::<Field>().unwrap(), Field::Name);
    assert_eq!("gpa".parse::<Field>().unwrap(), Field::Gpa);
    assert_eq!("year".parse::<Field>().unwrap(), Field::Year);
    assert_eq!("enrollmentYear".parse::<Field>().unwrap(), Field::Year);
}

#[test]
fn test_field_parse_unknown_name() {
    match "age".parse::<Field>() {
        Err(DbError::UnknownField(name)) => assert_eq!(name, "age"),
        other => panic!("Expected UnknownField, got {:?}", other),
    }
}

#[test]
fn test_field_value_parse() {
    assert_eq!(
        FieldValue::parse("name", "Ann").unwrap(),
        FieldValue::Name("Ann".to_string())
    );
    assert_eq!(FieldValue::parse("gpa", " 3.5 ").unwrap(), FieldValue::Gpa(3.5));
    assert_eq!(FieldValue::parse("year", "2021").unwrap(), FieldValue::Year(2021));
}

#[test]
fn test_field_value_parse_invalid_value() {
    assert!(matches!(
        FieldValue::parse("gpa", "abc"),
        Err(DbError::InvalidValue { .. })
    ));
    assert!(matches!(
        FieldValue::parse("year", "20.5"),
        Err(DbError::InvalidValue { .. })
    ));
    assert!(matches!(
        FieldValue::parse("height", "1"),
        Err(DbError::UnknownField(_))
    ));
}

#[test]
fn test_gpa_matches_with_epsilon() {
    let record = Record::new(1, "Ann", 3.75, 2021);

    assert!(FieldValue::Gpa(3.75).matches(&record));
    assert!(FieldValue::Gpa(3.750_000_000_1).matches(&record));
    assert!(!FieldValue::Gpa(3.76).matches(&record));
}

#[test]
fn test_name_matches_normalized_query() {
    let record = Record::new(1, "Ann", 3.75, 2021);

    assert!(FieldValue::Name(" Ann ".to_string()).matches(&record));
    assert!(!FieldValue::Name("ann".to_string()).matches(&record));
}

#[test]
fn test_value_of_each_field() {
    let record = Record::new(7, "Kim", 2.25, 2017);

    assert_eq!(record.value_of(Field::Name), FieldValue::Name("Kim".to_string()));
    assert_eq!(record.value_of(Field::Gpa), FieldValue::Gpa(2.25));
    assert_eq!(record.value_of(Field::Year), FieldValue::Year(2017));
    for field in Field::ALL {
        assert_eq!(record.value_of(field).field(), field);
    }
}

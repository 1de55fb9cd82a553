//! Edge-case tests for the wire primitives and the header layout.

use bytes::Bytes;
use logtail_core::header::{compose_lsn, lsn_to_string};
use logtail_core::{Error, ProtocolConfig, ProtocolReader, ProtocolWriter, TailRecordHeader};

// ---------------------------------------------------------------
// Header through writer/reader
// ---------------------------------------------------------------

#[test]
fn header_roundtrip_through_protocol() {
    let header = TailRecordHeader::new(
        77,
        compose_lsn(4, 9),
        -5,
        TailRecordHeader::HAS_PAYLOAD | TailRecordHeader::GAP,
        1 << 40,
    );

    let mut writer = ProtocolWriter::new();
    writer.write(&header);
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes.len(), TailRecordHeader::SIZE);

    let mut reader = ProtocolReader::new(bytes);
    let decoded: TailRecordHeader = reader.read().unwrap();
    reader.finish().unwrap();

    assert_eq!(decoded, header);
    assert_eq!(decoded.to_wire(), header.to_wire());
    assert_eq!(lsn_to_string(decoded.lsn), "e4n9");
}

#[test]
fn header_from_short_buffer_is_bad_msg() {
    for len in 0..TailRecordHeader::SIZE {
        let mut reader = ProtocolReader::new(vec![0xAAu8; len]);
        let err = reader.read::<TailRecordHeader>().unwrap_err();
        assert!(err.is_bad_msg(), "len {len}: {err}");
        assert_eq!(reader.bytes_read(), 0, "len {len}");
    }
}

#[test]
fn unknown_flag_bits_survive_roundtrip() {
    let header = TailRecordHeader::new(1, 2, 3, 0x8000_0000 | TailRecordHeader::HAS_PAYLOAD, 0);

    let mut writer = ProtocolWriter::new();
    writer.write(&header);
    let mut reader = ProtocolReader::new(writer.finish().unwrap());
    let decoded: TailRecordHeader = reader.read().unwrap();

    assert!(decoded.has_unknown_flags());
    assert_eq!(decoded.flags, header.flags);
}

// ---------------------------------------------------------------
// Writer modes
// ---------------------------------------------------------------

#[test]
fn linked_and_contiguous_output_match() {
    let payload = Bytes::from(vec![0x5Au8; 300]);

    let encode = |linked_output: bool| {
        let config = ProtocolConfig {
            linked_output,
            ..Default::default()
        };
        let mut writer = ProtocolWriter::with_config(&config);
        writer.write(&(payload.len() as u32));
        writer.write_without_copy(&payload);
        writer.write(&0xFFu8);
        writer.finish().unwrap()
    };

    assert_eq!(encode(true), encode(false));
}

#[test]
fn writer_error_suppresses_output() {
    let mut writer = ProtocolWriter::new();
    writer.set_error(Error::invalid_param("invalid record"));
    writer.write(&1u64);
    writer.write_without_copy(&Bytes::from_static(b"ignored"));

    assert_eq!(writer.bytes_written(), 0);
    assert!(matches!(writer.into_chunks(), Err(Error::InvalidParam(_))));
}

// ---------------------------------------------------------------
// Reader bounds
// ---------------------------------------------------------------

#[test]
fn oversized_length_does_not_panic() {
    let mut reader = ProtocolReader::new(vec![1u8, 2, 3, 4]);
    assert!(reader.read_bytes(usize::MAX / 2).unwrap_err().is_bad_msg());
    assert!(reader.copy_bytes(5).unwrap_err().is_bad_msg());
}

#[test]
fn reader_reports_configured_limit() {
    let config = ProtocolConfig {
        max_message_len: 1024,
        ..Default::default()
    };
    let reader = ProtocolReader::with_config(Bytes::new(), &config);
    assert_eq!(reader.max_message_len(), 1024);

    let writer = ProtocolWriter::with_config(&config);
    assert_eq!(writer.max_message_len(), 1024);
}

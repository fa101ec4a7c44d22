//! End-to-end file-format tests: exercise the public API the way a real
//! caller would, writing a file through [`scda::FileContext`] and reading
//! it back through a fresh context. Run against [`scda::NoMpiIo`] and
//! [`scda::SingleProcessCommunicator`], the only backend combination that
//! doesn't require a live MPI runtime.

use scda::{
    ArrayPayload, CompressionMode, ContextState, ErrorCode, FileContext, FuzzyConfig, NoMpiIo,
    ScdaError, SingleProcessCommunicator, HEADER_BYTES,
};

fn tmp_path(name: &str) -> std::path::PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::mem::forget(dir);
    path
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 1: empty file
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn empty_file_round_trips_user_string_and_has_no_sections() {
    let path = tmp_path("empty.scda");

    let ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"hello",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fclose().unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_BYTES as u64);

    let (ctx, user_string) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    assert_eq!(user_string, b"hello");
    ctx.fclose().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 2: single block section
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn single_block_section_round_trips() {
    let path = tmp_path("single_block.scda");

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_block(0, b"", b"Hello, world!", false).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (header, payload) = ctx.fread_block(0, false).unwrap();
    assert_eq!(header.dims.count, 13);
    assert_eq!(payload.unwrap(), b"Hello, world!");
    ctx.fclose().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 3: fixed array, identity integers
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn fixed_array_round_trips_identity_integers() {
    let path = tmp_path("array_identity.scda");

    let values: Vec<u32> = (0..7).collect();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    // With a single-process communicator every element belongs to rank 0;
    // the partition array still carries the full global count, matching
    // what a multi-rank caller would pass.
    ctx.fwrite_array(0, b"", &[7], 4, ArrayPayload::Direct(&bytes)).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (header, out) = ctx.fread_array(0, &[7]).unwrap();
    assert_eq!(header.dims.count, 7);
    assert_eq!(header.dims.elem_size, 4);
    let read_back: Vec<u32> = out
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(read_back, values);
    ctx.fclose().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 4: variable array with ragged element sizes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn variable_array_round_trips_ragged_elements() {
    let path = tmp_path("varray_ragged.scda");

    let elem_sizes = vec![1u64, 5, 2];
    let payload = b"ABCDEFGH".to_vec(); // "A" + "BCDEF" + "GH"

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_varray(
        0,
        b"",
        &[3],
        &[payload.len() as u64],
        &elem_sizes,
        &payload,
    )
    .unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (header, sizes) = ctx.fread_varray_sizes(0, &[3]).unwrap();
    assert_eq!(header.dims.count, 3);
    assert_eq!(sizes, elem_sizes);
    let data = ctx.fread_varray_data(0, &[payload.len() as u64]).unwrap();
    assert_eq!(data, payload);
    ctx.fclose().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 5: encoded block round trip
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn encoded_block_round_trips_with_decode_enabled() {
    let path = tmp_path("encoded_block.scda");
    let payload = vec![0u8; 1 << 20];

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_block(0, b"", &payload, true).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (header, out) = ctx.fread_block(0, true).unwrap();
    assert!(scda::SectionHeader::decode(&header.encode()).is_ok());
    assert_eq!(out.unwrap(), payload);
    ctx.fclose().unwrap();
}

#[test]
fn encoded_block_without_decode_exposes_the_armored_bytes() {
    let path = tmp_path("encoded_block_raw.scda");
    let payload = vec![b'x'; 4096];

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_block(0, b"", &payload, true).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (_header, out) = ctx.fread_block(0, false).unwrap();
    // Without decode, the raw bytes are the armored envelope, not the
    // original payload: they round-trip through the envelope decoder
    // directly instead of comparing equal to `payload`.
    let decoded = scda::decode(&out.unwrap(), payload.len()).unwrap();
    assert_eq!(decoded, payload);
    ctx.fclose().unwrap();
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 6: format error injection
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn corrupted_magic_byte_is_reported_as_format_error() {
    let path = tmp_path("corrupt_magic.scda");

    let ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fclose().unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] = b'x';
    std::fs::write(&path, &bytes).unwrap();

    let err = FileContext::<SingleProcessCommunicator, NoMpiIo>::open_read(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        FuzzyConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err, ErrorCode::from_scda(ScdaError::Format));
}

// ─────────────────────────────────────────────────────────────────────────
// Structural invariants
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn multiple_sections_in_one_file_read_back_in_order() {
    let path = tmp_path("multi_section.scda");

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_inline(0, b"first", &[1u8; scda::INLINE_PAYLOAD_BYTES])
        .unwrap();
    ctx.fwrite_block(0, b"second", b"abc", false).unwrap();
    ctx.fwrite_array(0, b"third", &[2], 2, ArrayPayload::Direct(&[1, 2, 3, 4]))
        .unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let h1 = ctx.fread_inline(0, None).unwrap();
    assert_eq!(h1.user_string, b"first");
    let (h2, out2) = ctx.fread_block(0, false).unwrap();
    assert_eq!(h2.user_string, b"second");
    assert_eq!(out2.unwrap(), b"abc");
    let (h3, out3) = ctx.fread_array(0, &[2]).unwrap();
    assert_eq!(h3.user_string, b"third");
    assert_eq!(out3, vec![1, 2, 3, 4]);
    ctx.fclose().unwrap();
}

#[test]
fn zero_length_array_is_legal_and_padded() {
    let path = tmp_path("zero_array.scda");

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_array(0, b"", &[0], 8, ArrayPayload::Direct(&[])).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (header, out) = ctx.fread_array(0, &[0]).unwrap();
    assert_eq!(header.dims.count, 0);
    assert!(out.is_empty());
    ctx.fclose().unwrap();
}

#[test]
fn reading_starts_in_the_reading_state_and_recovers_the_written_block() {
    let path = tmp_path("reopen_write.scda");

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_block(0, b"", b"first block", false).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    assert!(matches!(ctx.state, ContextState::Reading { .. }));
    let (_header, out) = ctx.fread_block(0, false).unwrap();
    assert_eq!(out.unwrap(), b"first block");
    ctx.fclose().unwrap();
}

#[test]
fn stored_mode_envelope_round_trips_through_a_block_section() {
    let path = tmp_path("stored_envelope.scda");
    let payload = b"not very compressible but still armored".to_vec();
    let armored = scda::encode(&payload, CompressionMode::Stored).unwrap();

    let mut ctx = FileContext::open_write(
        SingleProcessCommunicator,
        NoMpiIo,
        &path,
        b"",
        FuzzyConfig::default(),
    )
    .unwrap();
    ctx.fwrite_block(0, b"raw armored bytes", &armored, false).unwrap();
    ctx.fclose().unwrap();

    let (mut ctx, _) =
        FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
            .unwrap();
    let (_header, out) = ctx.fread_block(0, false).unwrap();
    let decoded = scda::decode(&out.unwrap(), payload.len()).unwrap();
    assert_eq!(decoded, payload);
    ctx.fclose().unwrap();
}

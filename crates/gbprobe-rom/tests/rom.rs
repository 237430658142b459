use gbprobe_rom::{
    disassemble, hex_dump, parse_hex_pattern, read_rom, read_window, search, RomError, MAX_WINDOW,
};
use std::fs;

fn buffer_with_pattern() -> Vec<u8> {
    let mut data: Vec<u8> = (0..32u8).map(|b| b.wrapping_mul(7) | 0x80).collect();
    data[10..12].copy_from_slice(&[0xCD, 0x96]);
    data[20..22].copy_from_slice(&[0xCD, 0x96]);
    data
}

#[test]
fn pattern_matches_in_ascending_order_with_context() {
    let data = buffer_with_pattern();
    let pattern = parse_hex_pattern("cd 96").expect("pattern");

    let results = search(&data, &pattern, 0, 50).expect("search");

    assert_eq!(results.offsets(), [10, 20]);
    assert!(!results.limited);
    let first = &results.hits[0];
    assert_eq!(first.context_start, 2);
    assert_eq!(first.context, data[2..20]);
    let second = &results.hits[1];
    assert_eq!(second.context_start, 12);
    assert_eq!(second.context, data[12..30]);
}

#[test]
fn context_is_clipped_at_buffer_edges() {
    let data = [0xAA, 0xBB, 0x00, 0x01, 0xAA, 0xBB];
    let results = search(&data, &[0xAA, 0xBB], 0, 50).expect("search");
    assert_eq!(results.offsets(), [0, 4]);
    assert_eq!(results.hits[0].context, data);
    assert_eq!(results.hits[1].context_start, 0);
    assert_eq!(results.hits[1].context, data);
}

#[test]
fn start_offset_and_limit() {
    let data = buffer_with_pattern();
    let pattern = [0xCD, 0x96];

    assert_eq!(search(&data, &pattern, 11, 50).expect("search").offsets(), [20]);
    assert!(search(&data, &pattern, 64, 50).expect("search").hits.is_empty());

    let limited = search(&data, &pattern, 0, 1).expect("search");
    assert_eq!(limited.offsets(), [10]);
    assert!(limited.limited);
}

#[test]
fn overlapping_matches_are_reported() {
    let results = search(&[0x11; 4], &[0x11, 0x11], 0, 50).expect("search");
    assert_eq!(results.offsets(), [0, 1, 2]);
}

#[test]
fn hex_patterns() {
    assert_eq!(parse_hex_pattern("CD9642").expect("pattern"), [0xCD, 0x96, 0x42]);
    assert_eq!(parse_hex_pattern(" cd\t96 4 2").expect("pattern"), [0xCD, 0x96, 0x42]);
    assert!(matches!(parse_hex_pattern("  "), Err(RomError::EmptyPattern)));
    assert!(matches!(
        parse_hex_pattern("CD9"),
        Err(RomError::InvalidPattern { .. })
    ));
    assert!(matches!(
        parse_hex_pattern("ZZ"),
        Err(RomError::InvalidPattern { .. })
    ));
    assert!(matches!(
        parse_hex_pattern("+F"),
        Err(RomError::InvalidPattern { .. })
    ));
    assert!(matches!(
        parse_hex_pattern("CD -1"),
        Err(RomError::InvalidPattern { .. })
    ));
    assert!(matches!(search(&[1, 2], &[], 0, 5), Err(RomError::EmptyPattern)));
}

#[test]
fn window_reads_are_capped() {
    let temp = tempfile::tempdir().expect("tempdir");
    let rom = temp.path().join("game.gb");
    let bytes: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
    fs::write(&rom, &bytes).expect("write rom");

    let window = read_window(&rom, 0x100, 16).expect("window");
    assert_eq!(window, bytes[0x100..0x110]);

    let capped = read_window(&rom, 0, 10_000).expect("window");
    assert_eq!(capped.len(), MAX_WINDOW);

    let tail = read_window(&rom, 8190, 256).expect("window");
    assert_eq!(tail, bytes[8190..]);

    assert!(read_window(&rom, 8192, 16).expect("window").is_empty());
    assert!(matches!(
        read_window(&rom, 9000, 16),
        Err(RomError::OffsetPastEnd { len: 8192, .. })
    ));
    assert_eq!(read_rom(&rom).expect("rom"), bytes);
}

#[test]
fn missing_rom_is_an_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = read_window(&temp.path().join("absent.gb"), 0, 16).unwrap_err();
    assert!(matches!(err, RomError::Io { .. }));
}

#[test]
fn dump_and_disassembly_cover_the_same_window() {
    let code = [0x31, 0xFE, 0xFF, 0xAF, 0x21, 0xFF, 0x9F, 0x32, 0xCB, 0x7C, 0x20, 0xFB];
    let dump = hex_dump(&code, 0x150);
    assert_eq!(dump.len(), 1);
    assert!(dump[0].starts_with("00000150: 31 FE FF AF"));

    let mnemonics: Vec<String> = disassemble(&code, 0x150)
        .into_iter()
        .map(|instruction| instruction.mnemonic)
        .collect();
    assert_eq!(
        mnemonics,
        [
            "LD SP,0xFFFE",
            "XOR A",
            "LD HL,0x9FFF",
            "LD [HL-],A",
            "BIT 7,H",
            "JR NZ,0x0157",
        ]
    );
}

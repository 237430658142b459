const BYTES_PER_LINE: usize = 16;

/// `xxd`-style lines: eight hex digit offset, sixteen bytes, printable ASCII.
pub fn hex_dump(data: &[u8], base: u64) -> Vec<String> {
    data.chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(line, chunk)| {
            let addr = base + (line * BYTES_PER_LINE) as u64;
            let hex = chunk
                .iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii: String = chunk
                .iter()
                .map(|&byte| {
                    if (32..127).contains(&byte) {
                        byte as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{addr:08X}: {hex:<48}  {ascii}")
        })
        .collect()
}

//! Text rendering of tool results.

use gbprobe_rom::{disassemble, hex_dump as dump_lines, SearchResults};
use gbprobe_scripts::{EntityTable, MemoryRange, MemoryReadout, SpriteTable};
use gbprobe_session::RunResult;

const RANGE_BYTES_PER_LINE: usize = 16;
const ENTITY_PREVIEW_BYTES: usize = 16;

pub fn memory_readout(readout: &MemoryReadout) -> String {
    let mut lines = vec!["Memory dump:".to_string()];
    for (address, value) in &readout.values {
        lines.push(format!("  0x{address:04X}: 0x{value:02X} ({value})"));
    }
    lines.join("\n")
}

pub fn memory_range(range: &MemoryRange) -> String {
    let mut lines = vec![format!(
        "Memory range 0x{:04X} - 0x{:04X}:",
        range.start,
        range.end()
    )];
    for (row, chunk) in range.data.chunks(RANGE_BYTES_PER_LINE).enumerate() {
        let address = usize::from(range.start) + row * RANGE_BYTES_PER_LINE;
        lines.push(format!("  {address:04X}: {}", hex_bytes(chunk)));
    }
    lines.join("\n")
}

/// Lists visible sprites only.
pub fn sprite_table(table: &SpriteTable) -> String {
    let mut lines = vec![
        format!("OAM Sprite Data ({} slots):", table.sprites.len()),
        "Slot  Y    X   Tile  Flags  Pal  Visible".to_string(),
        "-".repeat(45),
    ];
    for sprite in table.visible() {
        lines.push(format!(
            "{:3}  {:3}  {:3}  0x{:02X}   0x{:02X}    {}    *",
            sprite.slot,
            sprite.y,
            sprite.x,
            sprite.tile,
            sprite.flags,
            sprite.palette()
        ));
    }
    lines.join("\n")
}

/// Shows the flag byte and populated entities; all-zero slots are skipped.
pub fn entity_table(table: &EntityTable) -> String {
    let mut lines = vec![
        format!("Flag byte: 0x{:02X}", table.flag),
        String::new(),
        "Entity Data:".to_string(),
    ];
    let mut shown = 0;
    for entity in table.populated() {
        let preview = &entity.bytes[..entity.bytes.len().min(ENTITY_PREVIEW_BYTES)];
        let more = if entity.bytes.len() > ENTITY_PREVIEW_BYTES {
            "..."
        } else {
            ""
        };
        lines.push(format!(
            "  Entity {} (0x{:04X}): {}{more}",
            entity.index,
            entity.address,
            hex_bytes(preview)
        ));
        shown += 1;
    }
    if shown == 0 {
        lines.push(format!("  (all {} entities empty)", table.entities.len()));
    }
    lines.join("\n")
}

pub fn script_result(result: &RunResult) -> String {
    let mut lines = Vec::new();
    if result.success {
        lines.push("Script executed successfully".to_string());
        if let Some(data) = &result.data {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            lines.push(format!("Output data: {pretty}"));
        }
    } else {
        lines.push(format!(
            "Error: {}",
            result.error.as_deref().unwrap_or("session failed")
        ));
    }
    if let Some(stdout) = &result.stdout {
        lines.push(format!("Stdout: {stdout}"));
    }
    lines.join("\n")
}

pub fn hex_dump(name: &str, offset: u64, data: &[u8], disassemble_code: bool) -> String {
    let mut lines = vec![
        format!("Hex dump of {name} at 0x{offset:04X} ({} bytes):", data.len()),
        String::new(),
    ];
    if disassemble_code {
        lines.extend(disassemble(data, offset).iter().map(ToString::to_string));
    } else {
        lines.extend(dump_lines(data, offset));
    }
    lines.join("\n")
}

pub fn search(name: &str, results: &SearchResults, max_results: usize) -> String {
    let pattern: String = results
        .pattern
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect();
    let limit = if results.limited {
        format!(" (limited to {max_results})")
    } else {
        String::new()
    };
    let mut lines = vec![
        format!("Search for pattern '{pattern}' in {name}:"),
        format!("Found {} match(es){limit}", results.hits.len()),
        String::new(),
    ];
    for hit in &results.hits {
        lines.push(format!("  0x{:06X}: {}", hit.offset, hex_bytes(&hit.context)));
    }
    lines.join("\n")
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

//! Lua bodies for the canned operations.
//!
//! Each template is a pure function of its parameters. Every generated script
//! registers one frame callback that fires once, after `frames` frames, and
//! then writes structured output, the screenshot and finally the marker.

use gbprobe_session::protocol::{IMAGE_FILE, MARKER_FILE, OUTPUT_FILE};

pub const ADDRESS_SPACE: u32 = 0x1_0000;
pub const DEFAULT_FRAMES: u32 = 60;

pub const OAM_BASE: u16 = 0xFE00;
pub const OAM_SLOTS: usize = 40;
pub const OAM_ENTRY_SIZE: u16 = 4;
pub const VISIBLE_Y_LIMIT: u8 = 160;

pub const DEFAULT_ENTITY_BASE: u32 = 0xC200;
pub const DEFAULT_ENTITY_SIZE: u32 = 24;
pub const DEFAULT_ENTITY_COUNT: u32 = 10;
pub const DEFAULT_FLAG_ADDRESS: u32 = 0xFFBF;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("address 0x{0:X} is outside the 16-bit address space")]
    AddressOutOfRange(u32),
    #[error("no addresses to read")]
    NoAddresses,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{what} at 0x{start:04X} with {len} bytes runs past 0xFFFF")]
    Overflow {
        what: &'static str,
        start: u32,
        len: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLayout {
    pub base: u32,
    pub size: u32,
    pub count: u32,
    pub flag_address: u32,
}

impl Default for EntityLayout {
    fn default() -> Self {
        Self {
            base: DEFAULT_ENTITY_BASE,
            size: DEFAULT_ENTITY_SIZE,
            count: DEFAULT_ENTITY_COUNT,
            flag_address: DEFAULT_FLAG_ADDRESS,
        }
    }
}

impl EntityLayout {
    pub fn validate(&self) -> Result<(), ScriptError> {
        check_address(self.base)?;
        check_address(self.flag_address)?;
        if self.size == 0 {
            return Err(ScriptError::Zero("entity size"));
        }
        if self.count == 0 {
            return Err(ScriptError::Zero("entity count"));
        }
        check_span("entity table", self.base, u64::from(self.size) * u64::from(self.count))
    }
}

pub fn run_frames(frames: u32, capture_image: bool) -> String {
    frame_script(frames, capture_image, "")
}

/// Reads one byte per address into `{"0xADDR": value}`. Duplicate addresses
/// are read once; order of first appearance is kept.
pub fn read_memory(addresses: &[u32], frames: u32) -> Result<String, ScriptError> {
    if addresses.is_empty() {
        return Err(ScriptError::NoAddresses);
    }
    let mut unique: Vec<u32> = Vec::with_capacity(addresses.len());
    for &address in addresses {
        check_address(address)?;
        if !unique.contains(&address) {
            unique.push(address);
        }
    }
    let list = unique
        .iter()
        .map(|address| format!("0x{address:04X}"))
        .collect::<Vec<_>>()
        .join(", ");

    let body = format!(
        r#"    local addresses = {{ {list} }}
    local out = io.open("{OUTPUT_FILE}", "w")
    if out then
        out:write("{{")
        for i, addr in ipairs(addresses) do
            if i > 1 then out:write(",") end
            out:write(string.format('"0x%04X":%d', addr, emu:read8(addr)))
        end
        out:write("}}")
        out:close()
    end
"#
    );
    Ok(frame_script(frames, true, &body))
}

/// Reads `length` consecutive bytes into `{"start", "length", "data"}`.
pub fn read_range(start: u32, length: u32, frames: u32) -> Result<String, ScriptError> {
    check_address(start)?;
    if length == 0 {
        return Err(ScriptError::Zero("length"));
    }
    check_span("range", start, u64::from(length))?;
    let last = length - 1;

    let body = format!(
        r#"    local out = io.open("{OUTPUT_FILE}", "w")
    if out then
        out:write('{{"start":{start},"length":{length},"data":[')
        for i = 0, {last} do
            if i > 0 then out:write(",") end
            out:write(tostring(emu:read8({start} + i)))
        end
        out:write("]}}")
        out:close()
    end
"#
    );
    Ok(frame_script(frames, true, &body))
}

/// Dumps all 40 OAM entries as `{"oam": [...]}`.
pub fn sprite_table(frames: u32) -> String {
    let last_slot = OAM_SLOTS - 1;
    let body = format!(
        r#"    local out = io.open("{OUTPUT_FILE}", "w")
    if out then
        out:write('{{"oam":[')
        for slot = 0, {last_slot} do
            local addr = 0x{OAM_BASE:04X} + slot * {OAM_ENTRY_SIZE}
            local y = emu:read8(addr)
            local x = emu:read8(addr + 1)
            local tile = emu:read8(addr + 2)
            local flags = emu:read8(addr + 3)
            local visible = (y > 0 and y < {VISIBLE_Y_LIMIT}) and "true" or "false"
            if slot > 0 then out:write(",") end
            out:write(string.format(
                '{{"slot":%d,"y":%d,"x":%d,"tile":%d,"flags":%d,"palette":%d,"visible":%s}}',
                slot, y, x, tile, flags, flags % 8, visible))
        end
        out:write("]}}")
        out:close()
    end
"#
    );
    frame_script(frames, true, &body)
}

pub fn entity_table(layout: &EntityLayout, frames: u32) -> Result<String, ScriptError> {
    layout.validate()?;
    let EntityLayout {
        base,
        size,
        count,
        flag_address,
    } = *layout;
    let last_entity = count - 1;
    let last_byte = size - 1;

    let body = format!(
        r#"    local out = io.open("{OUTPUT_FILE}", "w")
    if out then
        out:write('{{"flag":' .. emu:read8(0x{flag_address:04X}) .. ',"entities":[')
        for ent = 0, {last_entity} do
            local base = {base} + ent * {size}
            if ent > 0 then out:write(",") end
            out:write('{{"index":' .. ent .. ',"address":' .. base .. ',"bytes":[')
            for i = 0, {last_byte} do
                if i > 0 then out:write(",") end
                out:write(tostring(emu:read8(base + i)))
            end
            out:write("]}}")
        end
        out:write("]}}")
        out:close()
    end
"#
    );
    Ok(frame_script(frames, true, &body))
}

fn frame_script(frames: u32, capture_image: bool, body: &str) -> String {
    // `finished` keeps later frames from rewriting artifacts while the
    // orchestrator is collecting them.
    let mut script = format!(
        r#"local frame = 0
local finished = false

callbacks:add("frame", function()
    if finished then return end
    frame = frame + 1
    if frame < {frames} then return end
    finished = true
"#
    );
    script.push_str(body);
    if capture_image {
        script.push_str(&format!("    emu:screenshot(\"{IMAGE_FILE}\")\n"));
    }
    script.push_str(&format!(
        r#"    local done = io.open("{MARKER_FILE}", "w")
    if done then done:close() end
end)
"#
    ));
    script
}

fn check_address(address: u32) -> Result<(), ScriptError> {
    if address < ADDRESS_SPACE {
        Ok(())
    } else {
        Err(ScriptError::AddressOutOfRange(address))
    }
}

fn check_span(what: &'static str, start: u32, len: u64) -> Result<(), ScriptError> {
    if u64::from(start) + len <= u64::from(ADDRESS_SPACE) {
        Ok(())
    } else {
        Err(ScriptError::Overflow { what, start, len })
    }
}

use clap::{ArgAction, Args, Subcommand};
use gbprobe_scripts::template::{
    DEFAULT_ENTITY_BASE, DEFAULT_ENTITY_COUNT, DEFAULT_ENTITY_SIZE, DEFAULT_FLAG_ADDRESS,
    DEFAULT_FRAMES,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::path::PathBuf;

pub const DEFAULT_HEX_LENGTH: usize = 256;
pub const DEFAULT_MAX_RESULTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOOLS: [ToolInfo; 8] = [
    ToolInfo {
        name: "run-for-frames",
        description: "Run a ROM for a number of frames and capture a screenshot",
    },
    ToolInfo {
        name: "read-memory-addresses",
        description: "Read bytes at specific addresses after running for some frames",
    },
    ToolInfo {
        name: "read-memory-range",
        description: "Read a contiguous range of memory",
    },
    ToolInfo {
        name: "dump-sprite-table",
        description: "Dump all 40 OAM sprite entries with position, tile, flags and palette",
    },
    ToolInfo {
        name: "dump-entity-table",
        description: "Dump entity records from work RAM plus a flag byte",
    },
    ToolInfo {
        name: "run-custom-script",
        description: "Run a custom Lua script; write output.json for structured data and DONE when finished",
    },
    ToolInfo {
        name: "hex-dump",
        description: "Hex dump or LR35902 disassembly of ROM file bytes",
    },
    ToolInfo {
        name: "search-byte-pattern",
        description: "Search a ROM file for a hex byte pattern",
    },
];

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),
    #[error("invalid arguments for {tool}: {source}")]
    Arguments {
        tool: String,
        source: serde_json::Error,
    },
}

/// One operation of the tool boundary. The same type backs the CLI
/// subcommands and the JSON `{"tool": .., "arguments": {..}}` form.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "kebab-case")]
pub enum ToolCall {
    /// Run a ROM for a number of frames and capture a screenshot
    RunForFrames(RunFramesArgs),
    /// Read bytes at specific addresses
    ReadMemoryAddresses(ReadMemoryArgs),
    /// Read a contiguous range of memory
    ReadMemoryRange(ReadRangeArgs),
    /// Dump the 40-entry OAM sprite table
    DumpSpriteTable(DumpSpritesArgs),
    /// Dump entity records from work RAM
    DumpEntityTable(DumpEntitiesArgs),
    /// Run a custom Lua script
    RunCustomScript(RunScriptArgs),
    /// Hex dump or disassemble ROM bytes
    HexDump(HexDumpArgs),
    /// Search a ROM for a byte pattern
    SearchBytePattern(SearchArgs),
}

impl ToolCall {
    pub fn from_parts(tool: &str, arguments: Value) -> Result<Self, ToolError> {
        if !TOOLS.iter().any(|info| info.name == tool) {
            return Err(ToolError::Unknown(tool.to_string()));
        }
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };
        serde_json::from_value(json!({ "tool": tool, "arguments": arguments })).map_err(
            |source| ToolError::Arguments {
                tool: tool.to_string(),
                source,
            },
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::RunForFrames(_) => "run-for-frames",
            ToolCall::ReadMemoryAddresses(_) => "read-memory-addresses",
            ToolCall::ReadMemoryRange(_) => "read-memory-range",
            ToolCall::DumpSpriteTable(_) => "dump-sprite-table",
            ToolCall::DumpEntityTable(_) => "dump-entity-table",
            ToolCall::RunCustomScript(_) => "run-custom-script",
            ToolCall::HexDump(_) => "hex-dump",
            ToolCall::SearchBytePattern(_) => "search-byte-pattern",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFramesArgs {
    /// Path to the ROM file (.gb, .gbc, .gba)
    #[arg(long)]
    pub rom_path: PathBuf,
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    #[serde(default = "default_frames", deserialize_with = "de_int")]
    pub frames: u32,
    #[arg(long)]
    #[serde(default)]
    pub savestate_path: Option<PathBuf>,
    /// Do not capture a screenshot
    #[arg(long = "no-image", action = ArgAction::SetFalse)]
    #[serde(default = "default_true")]
    pub capture_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadMemoryArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    /// Address to read (decimal or 0x-prefixed hex); repeatable
    #[arg(long = "address", required = true, value_parser = parse_int::<u32>)]
    #[serde(deserialize_with = "de_int_list")]
    pub addresses: Vec<u32>,
    #[arg(long)]
    #[serde(default)]
    pub savestate_path: Option<PathBuf>,
    /// Frames to run before reading
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    #[serde(default = "default_frames", deserialize_with = "de_int")]
    pub frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadRangeArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    #[arg(long, value_parser = parse_int::<u32>)]
    #[serde(deserialize_with = "de_int")]
    pub start_address: u32,
    #[arg(long, value_parser = parse_int::<u32>)]
    #[serde(deserialize_with = "de_int")]
    pub length: u32,
    #[arg(long)]
    #[serde(default)]
    pub savestate_path: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    #[serde(default = "default_frames", deserialize_with = "de_int")]
    pub frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpSpritesArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    #[arg(long)]
    #[serde(default)]
    pub savestate_path: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    #[serde(default = "default_frames", deserialize_with = "de_int")]
    pub frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpEntitiesArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    #[arg(long, default_value_t = DEFAULT_ENTITY_BASE, value_parser = parse_int::<u32>)]
    #[serde(default = "default_entity_base", deserialize_with = "de_int")]
    pub entity_base: u32,
    #[arg(long, default_value_t = DEFAULT_ENTITY_SIZE, value_parser = parse_int::<u32>)]
    #[serde(default = "default_entity_size", deserialize_with = "de_int")]
    pub entity_size: u32,
    #[arg(long, default_value_t = DEFAULT_ENTITY_COUNT, value_parser = parse_int::<u32>)]
    #[serde(default = "default_entity_count", deserialize_with = "de_int")]
    pub entity_count: u32,
    /// Address of the flag byte reported with the table
    #[arg(long, default_value_t = DEFAULT_FLAG_ADDRESS, value_parser = parse_int::<u32>)]
    #[serde(default = "default_flag_address", deserialize_with = "de_int")]
    pub flag_address: u32,
    #[arg(long)]
    #[serde(default)]
    pub savestate_path: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    #[serde(default = "default_frames", deserialize_with = "de_int")]
    pub frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunScriptArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    /// Lua source. Write output.json for structured data and DONE when finished.
    #[arg(long)]
    pub script: String,
    #[arg(long)]
    #[serde(default)]
    pub savestate_path: Option<PathBuf>,
    /// Timeout in seconds (defaults to the configured session timeout)
    #[arg(long)]
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HexDumpArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    #[arg(long, default_value_t = 0, value_parser = parse_int::<u64>)]
    #[serde(default, deserialize_with = "de_int")]
    pub offset: u64,
    /// Bytes to read (capped at 4096)
    #[arg(long, default_value_t = DEFAULT_HEX_LENGTH, value_parser = parse_int::<usize>)]
    #[serde(default = "default_hex_length", deserialize_with = "de_int")]
    pub length: usize,
    /// Disassemble as LR35902 instead of dumping hex
    #[arg(long)]
    #[serde(default)]
    pub disassemble: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    #[arg(long)]
    pub rom_path: PathBuf,
    /// Hex bytes, e.g. "CD 96 42" or "CD9642"
    #[arg(long)]
    pub pattern: String,
    #[arg(long, default_value_t = 0, value_parser = parse_int::<usize>)]
    #[serde(default, deserialize_with = "de_int")]
    pub start_offset: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS, value_parser = parse_int::<usize>)]
    #[serde(default = "default_max_results", deserialize_with = "de_int")]
    pub max_results: usize,
}

fn default_frames() -> u32 {
    DEFAULT_FRAMES
}

fn default_true() -> bool {
    true
}

fn default_entity_base() -> u32 {
    DEFAULT_ENTITY_BASE
}

fn default_entity_size() -> u32 {
    DEFAULT_ENTITY_SIZE
}

fn default_entity_count() -> u32 {
    DEFAULT_ENTITY_COUNT
}

fn default_flag_address() -> u32 {
    DEFAULT_FLAG_ADDRESS
}

fn default_hex_length() -> usize {
    DEFAULT_HEX_LENGTH
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// Accepts decimal or `0x`-prefixed hex.
pub fn parse_int<T: TryFrom<u64>>(text: &str) -> Result<T, String> {
    let text = text.trim();
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    }
    .map_err(|err| format!("invalid number {text:?}: {err}"))?;
    T::try_from(value).map_err(|_| format!("{text} is out of range"))
}

// JSON callers may send either numbers or hex strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(u64),
    Text(String),
}

impl IntOrText {
    fn resolve<T: TryFrom<u64>>(self) -> Result<T, String> {
        match self {
            IntOrText::Int(value) => {
                T::try_from(value).map_err(|_| format!("{value} is out of range"))
            }
            IntOrText::Text(text) => parse_int(&text),
        }
    }
}

fn de_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    IntOrText::deserialize(deserializer)?
        .resolve()
        .map_err(D::Error::custom)
}

fn de_int_list<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<IntOrText>::deserialize(deserializer)?
        .into_iter()
        .map(IntOrText::resolve)
        .collect::<Result<_, _>>()
        .map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_arguments_take_defaults() {
        let call = ToolCall::from_parts(
            "read-memory-addresses",
            json!({"rom_path": "game.gb", "addresses": [65471, "0xFE00"]}),
        )
        .expect("call");
        assert_eq!(
            call,
            ToolCall::ReadMemoryAddresses(ReadMemoryArgs {
                rom_path: PathBuf::from("game.gb"),
                addresses: vec![0xFFBF, 0xFE00],
                savestate_path: None,
                frames: 60,
            })
        );
    }

    #[test]
    fn hex_dump_and_entity_defaults() {
        let call = ToolCall::from_parts("hex-dump", json!({"rom_path": "game.gb"})).expect("call");
        let ToolCall::HexDump(args) = call else {
            panic!("wrong variant");
        };
        assert_eq!((args.offset, args.length, args.disassemble), (0, 256, false));

        let call =
            ToolCall::from_parts("dump-entity-table", json!({"rom_path": "game.gb"})).expect("call");
        let ToolCall::DumpEntityTable(args) = call else {
            panic!("wrong variant");
        };
        assert_eq!(args.entity_base, 0xC200);
        assert_eq!(args.entity_size, 24);
        assert_eq!(args.entity_count, 10);
        assert_eq!(args.flag_address, 0xFFBF);
    }

    #[test]
    fn every_listed_tool_parses() {
        for info in TOOLS {
            let arguments = match info.name {
                "read-memory-addresses" => json!({"rom_path": "game.gb", "addresses": [1]}),
                "read-memory-range" => {
                    json!({"rom_path": "game.gb", "start_address": 0, "length": 1})
                }
                "run-custom-script" => json!({"rom_path": "game.gb", "script": ""}),
                "search-byte-pattern" => json!({"rom_path": "game.gb", "pattern": "00"}),
                _ => json!({"rom_path": "game.gb"}),
            };
            let call = ToolCall::from_parts(info.name, arguments).expect(info.name);
            assert_eq!(call.name(), info.name);
        }
    }

    #[test]
    fn bad_calls_are_rejected() {
        assert!(matches!(
            ToolCall::from_parts("mgba_run", json!({})),
            Err(ToolError::Unknown(_))
        ));
        assert!(matches!(
            ToolCall::from_parts("hex-dump", json!({"rom_path": "a", "bogus": 1})),
            Err(ToolError::Arguments { .. })
        ));
        assert!(matches!(
            ToolCall::from_parts("read-memory-range", json!({"rom_path": "a"})),
            Err(ToolError::Arguments { .. })
        ));
    }

    #[test]
    fn integers_accept_hex() {
        assert_eq!(parse_int::<u32>("0xC200"), Ok(0xC200));
        assert_eq!(parse_int::<u32>("49664"), Ok(0xC200));
        assert!(parse_int::<u8>("0x100").is_err());
        assert!(parse_int::<u32>("C200").is_err());
    }
}

use crate::render;
use crate::tools::{
    DumpEntitiesArgs, DumpSpritesArgs, HexDumpArgs, ReadMemoryArgs, ReadRangeArgs, RunFramesArgs,
    RunScriptArgs, SearchArgs, ToolCall,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use gbprobe_scripts::{
    template, DecodeError, EntityLayout, EntityTable, MemoryRange, MemoryReadout, SpriteTable,
};
use gbprobe_session::{Launcher, Orchestrator, RunResult, SessionRequest};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const IMAGE_MIME_TYPE: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text(String),
    Image(Vec<u8>),
}

impl ContentItem {
    pub fn to_wire(&self) -> Value {
        match self {
            ContentItem::Text(text) => json!({ "type": "text", "text": text }),
            ContentItem::Image(bytes) => json!({
                "type": "image",
                "data": STANDARD.encode(bytes),
                "mime_type": IMAGE_MIME_TYPE,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: Vec<ContentItem>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text(text.into())],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text(text.into())],
            is_error: true,
        }
    }

    pub fn with_image(mut self, image: Option<Vec<u8>>) -> Self {
        if let Some(bytes) = image {
            self.content.push(ContentItem::Image(bytes));
        }
        self
    }

    #[cfg(test)]
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            ContentItem::Text(text) => Some(text.as_str()),
            ContentItem::Image(_) => None,
        })
    }
}

pub fn dispatch<L: Launcher>(orchestrator: &Orchestrator<L>, call: ToolCall) -> ToolOutput {
    tracing::debug!(tool = call.name(), "dispatching tool call");
    match call {
        ToolCall::RunForFrames(args) => run_for_frames(orchestrator, args),
        ToolCall::ReadMemoryAddresses(args) => read_memory_addresses(orchestrator, args),
        ToolCall::ReadMemoryRange(args) => read_memory_range(orchestrator, args),
        ToolCall::DumpSpriteTable(args) => dump_sprite_table(orchestrator, args),
        ToolCall::DumpEntityTable(args) => dump_entity_table(orchestrator, args),
        ToolCall::RunCustomScript(args) => run_custom_script(orchestrator, args),
        ToolCall::HexDump(args) => hex_dump(args),
        ToolCall::SearchBytePattern(args) => search_byte_pattern(args),
    }
}

fn run_for_frames<L: Launcher>(orchestrator: &Orchestrator<L>, args: RunFramesArgs) -> ToolOutput {
    let script = template::run_frames(args.frames, args.capture_image);
    let result = orchestrator.run(session(args.rom_path, args.savestate_path, script));
    if !result.success {
        return failed(&result);
    }
    ToolOutput::text("Emulator ran successfully").with_image(result.image)
}

fn read_memory_addresses<L: Launcher>(
    orchestrator: &Orchestrator<L>,
    args: ReadMemoryArgs,
) -> ToolOutput {
    let script = match template::read_memory(&args.addresses, args.frames) {
        Ok(script) => script,
        Err(err) => return ToolOutput::error(format!("Error: {err}")),
    };
    let result = orchestrator.run(session(args.rom_path, args.savestate_path, script));
    decoded(result, "memory readout", |data| {
        MemoryReadout::from_value(data).map(|readout| render::memory_readout(&readout))
    })
}

fn read_memory_range<L: Launcher>(
    orchestrator: &Orchestrator<L>,
    args: ReadRangeArgs,
) -> ToolOutput {
    let script = match template::read_range(args.start_address, args.length, args.frames) {
        Ok(script) => script,
        Err(err) => return ToolOutput::error(format!("Error: {err}")),
    };
    let result = orchestrator.run(session(args.rom_path, args.savestate_path, script));
    decoded(result, "memory range", |data| {
        MemoryRange::from_value(data).map(|range| render::memory_range(&range))
    })
}

fn dump_sprite_table<L: Launcher>(
    orchestrator: &Orchestrator<L>,
    args: DumpSpritesArgs,
) -> ToolOutput {
    let script = template::sprite_table(args.frames);
    let result = orchestrator.run(session(args.rom_path, args.savestate_path, script));
    decoded(result, "sprite table", |data| {
        SpriteTable::from_value(data).map(|table| render::sprite_table(&table))
    })
}

fn dump_entity_table<L: Launcher>(
    orchestrator: &Orchestrator<L>,
    args: DumpEntitiesArgs,
) -> ToolOutput {
    let layout = EntityLayout {
        base: args.entity_base,
        size: args.entity_size,
        count: args.entity_count,
        flag_address: args.flag_address,
    };
    let script = match template::entity_table(&layout, args.frames) {
        Ok(script) => script,
        Err(err) => return ToolOutput::error(format!("Error: {err}")),
    };
    let result = orchestrator.run(session(args.rom_path, args.savestate_path, script));
    decoded(result, "entity table", |data| {
        EntityTable::from_value(data).map(|table| render::entity_table(&table))
    })
}

fn run_custom_script<L: Launcher>(
    orchestrator: &Orchestrator<L>,
    args: RunScriptArgs,
) -> ToolOutput {
    let mut request = session(args.rom_path, args.savestate_path, args.script);
    if let Some(secs) = args.timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    let result = orchestrator.run(request);
    let output = ToolOutput {
        content: vec![ContentItem::Text(render::script_result(&result))],
        is_error: !result.success,
    };
    output.with_image(result.image)
}

fn hex_dump(args: HexDumpArgs) -> ToolOutput {
    match gbprobe_rom::read_window(&args.rom_path, args.offset, args.length) {
        Ok(data) => ToolOutput::text(render::hex_dump(
            &display_name(&args.rom_path),
            args.offset,
            &data,
            args.disassemble,
        )),
        Err(err) => ToolOutput::error(format!("Error: {err}")),
    }
}

fn search_byte_pattern(args: SearchArgs) -> ToolOutput {
    let found = gbprobe_rom::parse_hex_pattern(&args.pattern).and_then(|pattern| {
        let data = gbprobe_rom::read_rom(&args.rom_path)?;
        gbprobe_rom::search(&data, &pattern, args.start_offset, args.max_results)
    });
    match found {
        Ok(results) => ToolOutput::text(render::search(
            &display_name(&args.rom_path),
            &results,
            args.max_results,
        )),
        Err(err) => ToolOutput::error(format!("Error: {err}")),
    }
}

fn session(rom_path: PathBuf, savestate_path: Option<PathBuf>, script: String) -> SessionRequest {
    SessionRequest::new(rom_path, script).with_savestate(savestate_path)
}

fn failed(result: &RunResult) -> ToolOutput {
    ToolOutput::error(format!(
        "Error: {}",
        result.error.as_deref().unwrap_or("session failed")
    ))
}

fn decoded<F>(result: RunResult, what: &str, render: F) -> ToolOutput
where
    F: FnOnce(&Value) -> Result<String, DecodeError>,
{
    if !result.success {
        return failed(&result);
    }
    let Some(data) = result.data.as_ref() else {
        return ToolOutput::error(format!("Error: emulator produced no {what}"));
    };
    match render(data) {
        Ok(text) => ToolOutput::text(text).with_image(result.image),
        Err(err) => ToolOutput::error(format!("Error: malformed {what}: {err}")),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DEFAULT_HEX_LENGTH, DEFAULT_MAX_RESULTS};
    use gbprobe_session::{
        ArtifactSlot, LaunchError, LaunchRequest, OrchestratorConfig, SessionProcess, Workspace,
    };
    use std::fs;

    // Stands in for the emulator: writes the script's artifacts on launch and
    // exits at once.
    struct Scripted {
        output: Option<Value>,
    }

    struct Exited;

    impl SessionProcess for Exited {
        fn has_exited(&mut self) -> bool {
            true
        }

        fn terminate(&mut self) {}
    }

    impl Launcher for Scripted {
        type Process = Exited;

        fn launch(
            &self,
            _request: &LaunchRequest,
            workspace: &Workspace,
        ) -> Result<Exited, LaunchError> {
            if let Some(output) = &self.output {
                fs::write(workspace.slot_path(ArtifactSlot::Output), output.to_string())
                    .expect("write output");
                fs::write(workspace.slot_path(ArtifactSlot::Marker), b"").expect("write marker");
            }
            Ok(Exited)
        }
    }

    fn scripted(output: Option<Value>) -> Orchestrator<Scripted> {
        let config = OrchestratorConfig {
            poll_interval_ms: 5,
            settle_delay_ms: 1,
            recheck_delay_ms: 1,
            ..OrchestratorConfig::default()
        };
        Orchestrator::with_launcher(Scripted { output }, &config)
    }

    fn rom(dir: &Path, bytes: &[u8]) -> PathBuf {
        let path = dir.join("game.gb");
        fs::write(&path, bytes).expect("write rom");
        path
    }

    #[test]
    fn memory_readout_is_rendered() {
        let temp = tempfile::tempdir().expect("tempdir");
        let orchestrator = scripted(Some(json!({"0xFFBF": 0, "0xFE00": 80})));
        let output = dispatch(
            &orchestrator,
            ToolCall::ReadMemoryAddresses(ReadMemoryArgs {
                rom_path: rom(temp.path(), &[0; 16]),
                addresses: vec![0xFFBF, 0xFE00],
                savestate_path: None,
                frames: 1,
            }),
        );
        assert!(!output.is_error);
        assert_eq!(
            output.first_text(),
            Some("Memory dump:\n  0xFFBF: 0x00 (0)\n  0xFE00: 0x50 (80)")
        );
    }

    #[test]
    fn sprite_dump_lists_visible_slots() {
        let temp = tempfile::tempdir().expect("tempdir");
        let oam: Vec<Value> = (0..40)
            .map(|slot| {
                let y = if slot == 0 { 50 } else { 0 };
                json!({"slot": slot, "y": y, "x": 80, "tile": 3, "flags": 0})
            })
            .collect();
        let orchestrator = scripted(Some(json!({ "oam": oam })));
        let output = dispatch(
            &orchestrator,
            ToolCall::DumpSpriteTable(DumpSpritesArgs {
                rom_path: rom(temp.path(), &[0; 16]),
                savestate_path: None,
                frames: 1,
            }),
        );
        let text = output.first_text().expect("text");
        let rows: Vec<&str> = text.lines().skip(3).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("  0   50   80"));
    }

    #[test]
    fn exit_without_output_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = dispatch(
            &scripted(None),
            ToolCall::RunForFrames(RunFramesArgs {
                rom_path: rom(temp.path(), &[0; 16]),
                frames: 1,
                savestate_path: None,
                capture_image: true,
            }),
        );
        assert!(output.is_error);
        let text = output.first_text().expect("text");
        assert!(text.starts_with("Error: emulator timed out after 30s"), "{text}");
    }

    #[test]
    fn invalid_template_parameters_skip_the_session() {
        let output = dispatch(
            &scripted(None),
            ToolCall::ReadMemoryRange(ReadRangeArgs {
                rom_path: PathBuf::from("unused.gb"),
                start_address: 0xFFFF,
                length: 2,
                savestate_path: None,
                frames: 1,
            }),
        );
        assert!(output.is_error);
        assert!(output.first_text().expect("text").contains("runs past 0xFFFF"));
    }

    #[test]
    fn missing_emulator_fails_cleanly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = OrchestratorConfig {
            emulator: "gbprobe-no-such-emulator".to_string(),
            display_wrapper: Vec::new(),
            ..OrchestratorConfig::default()
        };
        let output = dispatch(
            &Orchestrator::from_config(&config),
            ToolCall::RunCustomScript(RunScriptArgs {
                rom_path: rom(temp.path(), &[0; 16]),
                script: "-- nothing".to_string(),
                savestate_path: None,
                timeout: Some(1),
            }),
        );
        assert!(output.is_error);
        let text = output.first_text().expect("text");
        assert!(text.contains("program not found: gbprobe-no-such-emulator"), "{text}");
    }

    #[test]
    fn rom_tools_read_the_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut bytes = vec![0u8; 64];
        bytes[0x20..0x23].copy_from_slice(&[0xCD, 0x96, 0x42]);
        let path = rom(temp.path(), &bytes);

        let dump = dispatch(
            &scripted(None),
            ToolCall::HexDump(HexDumpArgs {
                rom_path: path.clone(),
                offset: 0x20,
                length: DEFAULT_HEX_LENGTH,
                disassemble: true,
            }),
        );
        let text = dump.first_text().expect("text");
        assert!(text.starts_with("Hex dump of game.gb at 0x0020 (32 bytes):"));
        assert!(text.contains("0020: CD 96 42     CALL 0x4296"));

        let found = dispatch(
            &scripted(None),
            ToolCall::SearchBytePattern(SearchArgs {
                rom_path: path,
                pattern: "cd 96 42".to_string(),
                start_offset: 0,
                max_results: DEFAULT_MAX_RESULTS,
            }),
        );
        let text = found.first_text().expect("text");
        assert!(text.contains("Found 1 match(es)"));
        assert!(text.contains("  0x000020: "));
    }

    #[test]
    fn images_are_base64_on_the_wire() {
        let wire = ContentItem::Image(vec![0x89, b'P', b'N', b'G']).to_wire();
        assert_eq!(
            wire,
            json!({"type": "image", "data": "iVBORw==", "mime_type": "image/png"})
        );
    }
}

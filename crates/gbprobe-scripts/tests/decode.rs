use gbprobe_scripts::{EntityTable, SpriteTable};
use gbprobe_session::{collect, ArtifactSlot, CompletionReason, Workspace};
use serde_json::{json, Value};
use std::fs;
use std::time::Duration;

// Writes `output` the way a finished script would and reads it back through
// the collector.
fn collected(output: &Value) -> Value {
    let workspace = Workspace::create().expect("workspace");
    workspace.prepare("").expect("prepare");
    fs::write(
        workspace.slot_path(ArtifactSlot::Output),
        serde_json::to_vec(output).expect("encode"),
    )
    .expect("write output");
    fs::write(workspace.slot_path(ArtifactSlot::Marker), b"").expect("write marker");

    let result = collect(
        &workspace,
        CompletionReason::MarkerObserved,
        Duration::from_secs(30),
    );
    assert!(result.success);
    result.data.expect("structured output")
}

#[test]
fn sprite_visibility_follows_the_y_bounds() {
    let oam: Vec<Value> = (0..40)
        .map(|slot| match slot {
            0 => json!({"slot": 0, "y": 50, "x": 80, "tile": 3, "flags": 0, "palette": 0, "visible": true}),
            _ => json!({"slot": slot, "y": 0, "x": 0, "tile": 0, "flags": 0, "palette": 0, "visible": false}),
        })
        .collect();
    let data = collected(&json!({ "oam": oam }));

    let table = SpriteTable::from_value(&data).expect("decode");
    assert_eq!(table.sprites.len(), 40);

    let first = table.sprites[0];
    assert_eq!((first.y, first.x, first.tile), (50, 80, 3));
    assert_eq!(first.palette(), 0);
    assert!(first.is_visible());
    assert!(!table.sprites[1].is_visible());

    let visible: Vec<u8> = table.visible().map(|sprite| sprite.slot).collect();
    assert_eq!(visible, [0]);
}

#[test]
fn sprite_table_needs_every_slot() {
    let data = json!({"oam": [{"slot": 0, "y": 1, "x": 1, "tile": 0, "flags": 0}]});
    assert!(SpriteTable::from_value(&data).is_err());
}

#[test]
fn entity_dump_keeps_empty_entities() {
    let mut populated = vec![0u8; 24];
    populated[0] = 0x11;
    let data = collected(&json!({
        "flag": 0,
        "entities": [
            {"index": 0, "address": 0xC200, "bytes": vec![0u8; 24]},
            {"index": 1, "address": 0xC218, "bytes": populated},
        ],
    }));

    let table = EntityTable::from_value(&data).expect("decode");
    assert_eq!(table.flag, 0);
    assert_eq!(table.entities.len(), 2);
    assert!(table.entities.iter().all(|entity| entity.bytes.len() == 24));
    assert!(!table.entities[0].is_populated());
    assert!(table.entities[1].is_populated());

    let shown: Vec<u32> = table.populated().map(|entity| entity.index).collect();
    assert_eq!(shown, [1]);
}

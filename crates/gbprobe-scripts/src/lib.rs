pub mod decode;
pub mod template;

pub use crate::decode::{
    DecodeError, EntityRecord, EntityTable, MemoryRange, MemoryReadout, Sprite, SpriteTable,
};
pub use crate::template::{
    entity_table, read_memory, read_range, run_frames, sprite_table, EntityLayout, ScriptError,
};

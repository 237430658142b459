//! Typed views over the structured output written by the canned templates.

use crate::template::{OAM_SLOTS, VISIBLE_Y_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("invalid address key {0:?}")]
    AddressKey(String),
    #[error("value for {key} is not a byte: {value}")]
    NotAByte { key: String, value: Value },
    #[error("expected {expected} {what}, found {found}")]
    Count {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("malformed output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryReadout {
    pub values: Vec<(u16, u8)>,
}

impl MemoryReadout {
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let map = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let mut values = Vec::with_capacity(map.len());
        for (key, raw) in map {
            let address = parse_address(key)?;
            let byte = raw
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| DecodeError::NotAByte {
                    key: key.clone(),
                    value: raw.clone(),
                })?;
            values.push((address, byte));
        }
        Ok(Self { values })
    }

    pub fn get(&self, address: u16) -> Option<u8> {
        self.values
            .iter()
            .find(|(addr, _)| *addr == address)
            .map(|(_, value)| *value)
    }
}

fn parse_address(key: &str) -> Result<u16, DecodeError> {
    let digits = key
        .strip_prefix("0x")
        .or_else(|| key.strip_prefix("0X"))
        .ok_or_else(|| DecodeError::AddressKey(key.to_string()))?;
    u16::from_str_radix(digits, 16).map_err(|_| DecodeError::AddressKey(key.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRange {
    pub start: u16,
    pub length: usize,
    pub data: Vec<u8>,
}

impl MemoryRange {
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let range: MemoryRange = serde_json::from_value(value.clone())?;
        if range.data.len() != range.length {
            return Err(DecodeError::Count {
                what: "bytes",
                expected: range.length,
                found: range.data.len(),
            });
        }
        Ok(range)
    }

    pub fn end(&self) -> u16 {
        let span = self.data.len().saturating_sub(1);
        u16::try_from(usize::from(self.start) + span).unwrap_or(u16::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub slot: u8,
    pub y: u8,
    pub x: u8,
    pub tile: u8,
    pub flags: u8,
}

impl Sprite {
    pub fn palette(&self) -> u8 {
        self.flags % 8
    }

    pub fn is_visible(&self) -> bool {
        self.y > 0 && self.y < VISIBLE_Y_LIMIT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteTable {
    pub sprites: Vec<Sprite>,
}

#[derive(Deserialize)]
struct RawSpriteTable {
    oam: Vec<Sprite>,
}

impl SpriteTable {
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let raw: RawSpriteTable = serde_json::from_value(value.clone())?;
        if raw.oam.len() != OAM_SLOTS {
            return Err(DecodeError::Count {
                what: "sprite slots",
                expected: OAM_SLOTS,
                found: raw.oam.len(),
            });
        }
        Ok(Self { sprites: raw.oam })
    }

    pub fn visible(&self) -> impl Iterator<Item = &Sprite> {
        self.sprites.iter().filter(|sprite| sprite.is_visible())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub index: u32,
    pub address: u16,
    pub bytes: Vec<u8>,
}

impl EntityRecord {
    pub fn is_populated(&self) -> bool {
        self.bytes.iter().any(|byte| *byte != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTable {
    pub flag: u8,
    pub entities: Vec<EntityRecord>,
}

impl EntityTable {
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn populated(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.iter().filter(|entity| entity.is_populated())
    }
}

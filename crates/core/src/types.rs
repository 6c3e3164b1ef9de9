//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity ID (32-bit unsigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0 as u64
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Kind of world object, used to filter event broadcasts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IoFlags: u32 {
        const NPC = 1 << 0;
        const FIX = 1 << 1;
        const ITEM = 1 << 2;
        const CAMERA = 1 << 3;
        const MARKER = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Item classification tested by the `istype` operator
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemType: u32 {
        const WEAPON = 1 << 0;
        const DAGGER = 1 << 1;
        const ONE_HANDED = 1 << 2;
        const TWO_HANDED = 1 << 3;
        const BOW = 1 << 4;
        const SHIELD = 1 << 5;
        const FOOD = 1 << 6;
        const GOLD = 1 << 7;
        const ARMOR = 1 << 8;
        const HELMET = 1 << 9;
        const LEGGINGS = 1 << 10;
    }
}

impl ItemType {
    /// Look up a type flag by its script name
    pub fn from_script_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "weapon" => Some(Self::WEAPON),
            "dagger" => Some(Self::DAGGER),
            "1h" => Some(Self::ONE_HANDED),
            "2h" => Some(Self::TWO_HANDED),
            "bow" => Some(Self::BOW),
            "shield" => Some(Self::SHIELD),
            "food" => Some(Self::FOOD),
            "gold" => Some(Self::GOLD),
            "armor" => Some(Self::ARMOR),
            "helmet" => Some(Self::HELMET),
            "leggings" => Some(Self::LEGGINGS),
            _ => None,
        }
    }
}

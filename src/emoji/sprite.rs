//! Bundled sprite sheet index.

use std::path::Path;

use serde::Deserialize;

use crate::errors::AppResult;
use crate::models::emoji_name;

/// Edge length in pixels of one emoji cell in the sprite sheet.
pub const SPRITE_CELL_SIZE: u32 = 64;

/// Position of a standard emoji in the sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpriteDescriptor {
    pub short_name: String,
    pub sheet_x: u32,
    pub sheet_y: u32,
}

/// Pixel rectangle to cut out of the sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteCell {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SpriteDescriptor {
    pub fn cell(&self) -> SpriteCell {
        SpriteCell {
            x: self.sheet_x * SPRITE_CELL_SIZE,
            y: self.sheet_y * SPRITE_CELL_SIZE,
            width: SPRITE_CELL_SIZE,
            height: SPRITE_CELL_SIZE,
        }
    }
}

/// All sprite descriptors, in file order.
#[derive(Debug, Clone, Default)]
pub struct SpriteIndex {
    sprites: Vec<SpriteDescriptor>,
}

impl SpriteIndex {
    pub fn from_slice(data: &[u8]) -> AppResult<Self> {
        let sprites: Vec<SpriteDescriptor> = serde_json::from_slice(data)?;
        Ok(Self { sprites })
    }

    pub async fn load(path: &Path) -> AppResult<Self> {
        let data = tokio::fs::read(path).await?;
        let index = Self::from_slice(&data)?;
        tracing::debug!("Loaded {} sprites from {:?}", index.len(), path);
        Ok(index)
    }

    /// Look up a sprite; `:name:` references are accepted.
    pub fn find(&self, reference: &str) -> Option<&SpriteDescriptor> {
        let name = emoji_name(reference);
        self.sprites.iter().find(|s| s.short_name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sprites.iter().map(|s| s.short_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

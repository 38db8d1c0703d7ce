//! Emoji images on disk.
//!
//! Standard emoji come from the bundled sprite sheet; the command layer slices
//! the cell this store reports into `<dir>/<name>.png`. Custom emoji are
//! downloaded once with [`SlackApi::fetch_binary`] and reused afterwards.

mod sprite;

pub use sprite::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::api::SlackApi;
use crate::cache::Snapshot;
use crate::errors::{AppError, AppResult};
use crate::models::emoji_name;

/// Where an emoji image can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiImage {
    /// The image file exists on disk.
    File(PathBuf),
    /// Not yet sliced: cut `cell` out of the sprite sheet and write it to `path`.
    Sprite { path: PathBuf, cell: SpriteCell },
}

impl EmojiImage {
    pub fn path(&self) -> &Path {
        match self {
            EmojiImage::File(path) => path,
            EmojiImage::Sprite { path, .. } => path,
        }
    }
}

pub struct EmojiStore {
    dir: PathBuf,
    sprite_index_path: PathBuf,
    sprites: OnceCell<SpriteIndex>,
    api: Arc<dyn SlackApi>,
}

impl EmojiStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        sprite_index_path: impl Into<PathBuf>,
        api: Arc<dyn SlackApi>,
    ) -> Self {
        Self {
            dir: dir.into(),
            sprite_index_path: sprite_index_path.into(),
            sprites: OnceCell::new(),
            api,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The sprite index, read from disk on first use and kept for the lifetime
    /// of the store.
    pub async fn sprites(&self) -> AppResult<&SpriteIndex> {
        self.sprites
            .get_or_try_init(|| SpriteIndex::load(&self.sprite_index_path))
            .await
    }

    /// Resolve a standard emoji against the sprite index.
    pub async fn sprite_image(&self, reference: &str) -> AppResult<EmojiImage> {
        let name = emoji_name(reference);
        let path = self.dir.join(format!("{name}.png"));
        if file_exists(&path).await {
            return Ok(EmojiImage::File(path));
        }

        let descriptor = self
            .sprites()
            .await?
            .find(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown sprite name \"{name}\"")))?;

        Ok(EmojiImage::Sprite {
            path,
            cell: descriptor.cell(),
        })
    }

    /// Path of a custom emoji image, downloading it on first request.
    pub async fn custom_image(&self, snapshot: &Snapshot, reference: &str) -> AppResult<PathBuf> {
        let name = emoji_name(reference);
        let emoji = snapshot
            .find_emoji(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown emoji \"{name}\"")))?;

        let path = self.dir.join(emoji.filename());
        if file_exists(&path).await {
            return Ok(path);
        }

        let data = self.api.fetch_binary(&emoji.url).await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &data).await?;
        tracing::debug!("Saved emoji {} to {:?}", name, path);
        Ok(path)
    }

    /// Standard emoji first, then the workspace's custom emoji.
    pub async fn resolve(&self, snapshot: &Snapshot, reference: &str) -> AppResult<EmojiImage> {
        match self.sprite_image(reference).await {
            Ok(image) => Ok(image),
            Err(e) => {
                tracing::debug!("No sprite for {}: {}", reference, e);
                self.custom_image(snapshot, reference)
                    .await
                    .map(EmojiImage::File)
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

//! Debug-only persistence of captured frames.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reolink_common::CanonicalImage;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::device::CapturedFrame;

#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn persist(&self, raw: &CapturedFrame, converted: &CanonicalImage, captured_at: DateTime<Utc>) -> Result<()>;
}

/// Writes the raw frame and its JPEG conversion side by side into a scratch
/// directory, named after the capture time.
pub struct ScratchDirSink {
    base_path: PathBuf,
}

impl ScratchDirSink {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn save_file(&self, content: &[u8], filename: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_path).await?;

        let file_path = self.base_path.join(filename);
        fs::write(&file_path, content).await?;

        Ok(file_path)
    }
}

impl Default for ScratchDirSink {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[async_trait]
impl FrameSink for ScratchDirSink {
    async fn persist(&self, raw: &CapturedFrame, converted: &CanonicalImage, captured_at: DateTime<Utc>) -> Result<()> {
        let stamp = captured_at.format("%Y%m%dT%H%M%S%.3fZ");

        let raw_path = self
            .save_file(&raw.raw, &format!("reolink_raw_{}.{}", stamp, raw.extension()))
            .await?;
        let jpeg_path = self
            .save_file(&converted.data, &format!("reolink_jpeg_{}.jpg", stamp))
            .await?;

        tracing::warn!("Saved debug frames to {} and {}", raw_path.display(), jpeg_path.display());
        Ok(())
    }
}

use async_trait::async_trait;
use chrono::Utc;
use reolink_common::utils::format_elapsed;
use reolink_common::{CanonicalImage, NamedImage, ResponseMetadata};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::{convert, Camera};
use crate::command::{CameraCommand, CommandOutcome, CommandResults, NON_MAP_ARGUMENT};
use crate::config::ReolinkConfig;
use crate::device::{DeviceConnector, HttpConnector, ReolinkApi};
use crate::diagnostics::{FrameSink, ScratchDirSink};
use crate::error::{CameraError, Result};

pub const MODEL: &str = "viam:camera:reolink";
pub const MAIN_IMAGE: &str = "main";
pub const DEFAULT_PRESET_SETTLE: Duration = Duration::from_secs(3);

struct Session {
    api: Arc<dyn ReolinkApi>,
    config: ReolinkConfig,
}

/// Camera resource backed by one Reolink PTZ camera.
///
/// The session sits behind a single `RwLock`: `reconfigure` and `close` take
/// it exclusively, image and command calls share it for as long as they talk
/// to the device.
pub struct ReolinkCamera {
    name: String,
    connector: Arc<dyn DeviceConnector>,
    frame_sink: Arc<dyn FrameSink>,
    preset_settle: Duration,
    session: RwLock<Option<Session>>,
}

impl fmt::Debug for ReolinkCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReolinkCamera")
            .field("name", &self.name)
            .field("preset_settle", &self.preset_settle)
            .finish_non_exhaustive()
    }
}

impl ReolinkCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_connector(name, Arc::new(HttpConnector))
    }

    pub fn with_connector(name: impl Into<String>, connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            name: name.into(),
            connector,
            frame_sink: Arc::new(ScratchDirSink::default()),
            preset_settle: DEFAULT_PRESET_SETTLE,
            session: RwLock::new(None),
        }
    }

    pub fn with_frame_sink(mut self, frame_sink: Arc<dyn FrameSink>) -> Self {
        self.frame_sink = frame_sink;
        self
    }

    pub fn with_preset_settle(mut self, preset_settle: Duration) -> Self {
        self.preset_settle = preset_settle;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_configured(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn config(&self) -> Option<ReolinkConfig> {
        self.session.read().await.as_ref().map(|s| s.config.clone())
    }
}

#[async_trait]
impl Camera for ReolinkCamera {
    fn validate_config(attributes: &Map<String, Value>) -> Result<Vec<String>> {
        ReolinkConfig::from_attributes(attributes)?;
        Ok(Vec::new())
    }

    #[instrument(skip(self, attributes), fields(name = %self.name))]
    async fn reconfigure(&self, attributes: &Map<String, Value>) -> Result<&Self> {
        let mut session = self.session.write().await;

        if let Some(previous) = session.take() {
            if let Err(e) = previous.api.logout().await {
                warn!("Logout from {} failed, dropping session anyway: {}", previous.config.host, e);
            }
        }

        let config = ReolinkConfig::from_attributes(attributes)?;

        let api = self.connector.connect(&config).map_err(|e| {
            error!("Failed to create Reolink client for {}: {}", config.host, e);
            CameraError::DeviceInit(e)
        })?;

        if let Err(e) = api.login().await {
            error!("Failed to connect to Reolink camera at {}: {}", config.host, e);
            return Err(CameraError::DeviceInit(e));
        }

        info!(
            "Connected to Reolink camera at {}://{} (debug: {})",
            config.scheme(),
            config.host,
            config.debug
        );
        *session = Some(Session { api, config });

        Ok(self)
    }

    #[instrument(skip(self), fields(name = %self.name))]
    async fn get_image(&self, mime_type: &str) -> Result<CanonicalImage> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(CameraError::NotConfigured)?;
        let debug = session.config.debug;

        if !mime_type.is_empty() && mime_type != mime::IMAGE_JPEG.as_ref() {
            debug!("Requested {} but this camera only serves {}", mime_type, mime::IMAGE_JPEG);
        }

        let start = Instant::now();
        let frame = session.api.snapshot().await.map_err(CameraError::ImageFetch)?;

        if debug {
            warn!("snapshot took {}", format_elapsed(start.elapsed()));
            warn!(
                "Received image format: {:?}, color: {:?}, data size: {} bytes",
                frame.format,
                frame.image.color(),
                frame.raw.len()
            );
        }

        let start = Instant::now();
        let image = convert::to_canonical_jpeg(&frame)?;

        if debug {
            warn!("JPEG conversion took {}", format_elapsed(start.elapsed()));
            warn!("Converted image size: {} bytes", image.len());

            if let Err(e) = self.frame_sink.persist(&frame, &image, Utc::now()).await {
                warn!("Failed to save debug frames: {}", e);
            }
        }

        Ok(image)
    }

    async fn get_images(&self) -> Result<(Vec<NamedImage>, ResponseMetadata)> {
        let image = self.get_image("").await?;
        Ok((vec![NamedImage::from_image(MAIN_IMAGE, image)], ResponseMetadata::default()))
    }

    #[instrument(skip(self, command), fields(name = %self.name, count = command.len()))]
    async fn do_command(&self, command: &Map<String, Value>) -> Result<CommandResults> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(CameraError::NotConfigured)?;

        let empty = Map::new();
        let mut results = CommandResults::new();

        for (name, args) in command {
            debug!("command: {}, args: {}", name, args);

            let args = match args {
                Value::Object(args) => args,
                Value::Null => &empty,
                _ => {
                    warn!("Ignoring {}: {}", name, NON_MAP_ARGUMENT);
                    results.push(name.as_str(), CommandOutcome::Failure(NON_MAP_ARGUMENT.to_string()));
                    continue;
                }
            };

            let outcome = match CameraCommand::parse(name, args) {
                Ok(parsed) => match parsed.execute(session.api.as_ref(), self.preset_settle).await {
                    Ok(value) => CommandOutcome::Success(value),
                    Err(e) => {
                        warn!("Command {} failed: {}", name, e);
                        CommandOutcome::Failure(e.to_string())
                    }
                },
                Err(e) => {
                    warn!("Rejected command {}: {}", name, e);
                    CommandOutcome::Failure(e.to_string())
                }
            };

            results.push(name.as_str(), outcome);
        }

        Ok(results)
    }

    async fn close(&self) -> Result<()> {
        let mut session = self.session.write().await;

        if let Some(previous) = session.take() {
            if let Err(e) = previous.api.logout().await {
                warn!("Logout from {} failed during close: {}", previous.config.host, e);
            }
            info!("Closed Reolink camera {}", self.name);
        }

        Ok(())
    }
}

//! Client side of the Reolink CGI API.
//!
//! The adapter only talks to a camera through [`ReolinkApi`]; the HTTP
//! implementation lives in [`http`] and the JSON envelopes in [`protocol`].

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ReolinkConfig;

pub mod http;
pub mod protocol;

pub use http::{HttpConnector, HttpReolinkClient};

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("camera rejected {cmd} (code {code}): {detail}")]
    Api { cmd: String, code: i64, detail: String },

    #[error("not logged in")]
    NotLoggedIn,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// `op` values accepted by the `PtzCtrl` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtzOp {
    Left,
    Right,
    Up,
    Down,
    LeftUp,
    LeftDown,
    RightUp,
    RightDown,
    Stop,
    Auto,
    ZoomInc,
    ZoomDec,
    FocusInc,
    FocusDec,
    ToPos,
}

impl PtzOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PtzOp::Left => "Left",
            PtzOp::Right => "Right",
            PtzOp::Up => "Up",
            PtzOp::Down => "Down",
            PtzOp::LeftUp => "LeftUp",
            PtzOp::LeftDown => "LeftDown",
            PtzOp::RightUp => "RightUp",
            PtzOp::RightDown => "RightDown",
            PtzOp::Stop => "Stop",
            PtzOp::Auto => "Auto",
            PtzOp::ZoomInc => "ZoomInc",
            PtzOp::ZoomDec => "ZoomDec",
            PtzOp::FocusInc => "FocusInc",
            PtzOp::FocusDec => "FocusDec",
            PtzOp::ToPos => "ToPos",
        }
    }
}

/// `op` values accepted by the `StartZoomFocus` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomFocusOp {
    ZoomPos,
    FocusPos,
}

impl ZoomFocusOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomFocusOp::ZoomPos => "ZoomPos",
            ZoomFocusOp::FocusPos => "FocusPos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtzPreset {
    pub id: i64,
    pub name: String,
    pub enable: bool,
}

/// A still frame as delivered by the camera.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
    pub raw: Vec<u8>,
}

impl CapturedFrame {
    pub fn decode(raw: Vec<u8>) -> DeviceResult<Self> {
        let format = image::guess_format(&raw).ok();
        let image = image::load_from_memory(&raw)?;

        Ok(Self { image, format, raw })
    }

    pub fn extension(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Jpeg) => "jpg",
            Some(ImageFormat::Png) => "png",
            Some(ImageFormat::Bmp) => "bmp",
            Some(ImageFormat::Gif) => "gif",
            Some(ImageFormat::WebP) => "webp",
            _ => "bin",
        }
    }
}

#[async_trait]
pub trait ReolinkApi: Send + Sync {
    async fn login(&self) -> DeviceResult<()>;
    async fn logout(&self) -> DeviceResult<()>;
    async fn snapshot(&self) -> DeviceResult<CapturedFrame>;

    async fn ptz_ctrl(&self, op: PtzOp, speed: Option<u32>, preset_id: Option<i64>) -> DeviceResult<Value>;
    async fn set_ptz_preset(&self, preset: PtzPreset) -> DeviceResult<Value>;
    async fn get_ptz_presets(&self) -> DeviceResult<Value>;
    async fn get_ptz_check_state(&self) -> DeviceResult<Value>;
    async fn ptz_check(&self) -> DeviceResult<Value>;

    async fn start_zoom_focus(&self, op: ZoomFocusOp, position: i64) -> DeviceResult<Value>;
    async fn get_auto_focus(&self) -> DeviceResult<Value>;
    async fn set_auto_focus(&self, disable: bool) -> DeviceResult<Value>;
}

/// Builds (but does not log in) a client for a validated configuration.
pub trait DeviceConnector: Send + Sync {
    fn connect(&self, config: &ReolinkConfig) -> DeviceResult<Arc<dyn ReolinkApi>>;
}

use async_trait::async_trait;
use reolink_common::{CanonicalImage, NamedImage, ResponseMetadata};
use serde_json::{Map, Value};

use crate::command::CommandResults;
use crate::error::{CameraError, Result};

pub mod convert;
pub mod reolink;

pub use reolink::ReolinkCamera;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraProperties {
    pub supports_pcd: bool,
    pub mime_types: Vec<String>,
}

/// Lifecycle and data calls a camera resource answers for the host framework.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Checks an attribute bag without touching the device. Returns warnings.
    fn validate_config(attributes: &Map<String, Value>) -> Result<Vec<String>>
    where
        Self: Sized;

    async fn reconfigure(&self, attributes: &Map<String, Value>) -> Result<&Self>
    where
        Self: Sized;

    /// Returns a still image. A MIME type can be requested but the returned
    /// image is not necessarily of that type.
    async fn get_image(&self, mime_type: &str) -> Result<CanonicalImage>;

    async fn get_images(&self) -> Result<(Vec<NamedImage>, ResponseMetadata)>;

    async fn do_command(&self, command: &Map<String, Value>) -> Result<CommandResults>;

    async fn get_point_cloud(&self) -> Result<(Vec<u8>, String)> {
        Err(CameraError::NotImplemented("get_point_cloud"))
    }

    async fn get_properties(&self) -> Result<CameraProperties> {
        Err(CameraError::NotImplemented("get_properties"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

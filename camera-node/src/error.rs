use thiserror::Error;

use crate::device::DeviceError;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize Reolink camera: {0}")]
    DeviceInit(#[source] DeviceError),

    #[error("Failed to fetch image: {0}")]
    ImageFetch(#[source] DeviceError),

    #[error("Image conversion error: {0}")]
    ImageConversion(String),

    #[error("Camera is not configured")]
    NotConfigured,

    #[error("Method {0} is not implemented")]
    NotImplemented(&'static str),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for CameraError {
    fn from(error: validator::ValidationErrors) -> Self {
        CameraError::InvalidConfig(error.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(error: image::ImageError) -> Self {
        CameraError::ImageConversion(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CameraError>;

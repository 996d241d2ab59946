use serde::{Deserialize, Serialize};

/// An encoded image tagged with its MIME type, the shape every camera
/// resource hands back to the framework.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl CanonicalImage {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn jpeg(data: Vec<u8>) -> Self {
        Self::new(data, mime::IMAGE_JPEG.as_ref())
    }

    pub fn is_jpeg(&self) -> bool {
        self.mime_type == mime::IMAGE_JPEG.as_ref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedImage {
    pub name: String,
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl NamedImage {
    pub fn from_image(name: impl Into<String>, image: CanonicalImage) -> Self {
        Self {
            name: name.into(),
            data: image.data,
            mime_type: image.mime_type,
        }
    }
}

// Returned alongside multi-image responses. The camera reports nothing
// beyond the frame itself, so this serializes as an empty object.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ResponseMetadata {}

//! Capture record: a base image plus its ordered annotation layers

use crate::annotation::Annotation;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// A stored capture. Owns its decoded base image and annotation list.
///
/// The base image and dimensions are immutable after creation; the
/// annotation list is append-only for the life of the process.
#[derive(Debug)]
pub struct Capture {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub base_image: RgbaImage,
    pub created_at: DateTime<Utc>,
    pub annotations: Vec<Annotation>,
}

impl Capture {
    /// Wrap a decoded image in a new capture record.
    pub fn new(id: String, base_image: RgbaImage) -> Self {
        let (width, height) = base_image.dimensions();
        Self {
            id,
            width,
            height,
            base_image,
            created_at: Utc::now(),
            annotations: Vec::new(),
        }
    }

    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            annotation_count: self.annotations.len(),
            created_at: self.created_at,
        }
    }

    pub fn metadata(&self) -> CaptureMetadata {
        CaptureMetadata {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            annotation_count: self.annotations.len(),
            created_at: self.created_at,
            annotations: self.annotations.clone(),
        }
    }
}

/// Lightweight listing entry for a capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub annotation_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Full capture metadata including the annotation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub annotation_count: usize,
    pub created_at: DateTime<Utc>,
    pub annotations: Vec<Annotation>,
}

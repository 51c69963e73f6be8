//! In-memory capture registry
//!
//! The store is created once at process start and injected into request
//! handlers; it is never a module-level global. Captures are keyed by a
//! generated UUID and listed in creation order, so "latest" is always the
//! last element.

use crate::annotation::Annotation;
use crate::capture::{Capture, CaptureMetadata, CaptureSummary};
use crate::error::CaptureError;
use crate::geometry::Region;
use image::imageops::FilterType;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Options supplied by the caller when creating a capture.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Crop the decoded image to this region (CSS pixels).
    pub region: Option<Region>,
    /// Device pixel ratio of the client that rendered the image.
    /// Absent means 1.0.
    pub pixel_ratio: Option<f64>,
    /// Scroll offsets of the viewport at selection time.
    pub scroll_x: u32,
    pub scroll_y: u32,
}

/// Registry of captures with interior synchronization.
///
/// Locking model: the outer lock guards only map membership and ordering.
/// Each capture carries its own lock, so appends to the same capture
/// serialize on that capture's write lock while appends to different
/// captures proceed independently. Image decode and encode never run under
/// the outer lock.
pub struct CaptureStore {
    inner: RwLock<StoreInner>,
}

struct StoreInner {
    captures: HashMap<String, Arc<RwLock<Capture>>>,
    /// Capture ids in creation order, oldest first.
    order: Vec<String>,
}

impl CaptureStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                captures: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Decode image bytes, apply an optional region crop, and store the
    /// result as a new capture.
    pub fn create_capture(
        &self,
        image_bytes: &[u8],
        options: &CaptureOptions,
    ) -> Result<CaptureSummary, CaptureError> {
        // Decode and crop before touching any lock.
        let decoded = image::load_from_memory(image_bytes)
            .map_err(|e| CaptureError::Decode(e.to_string()))?
            .to_rgba8();

        let base_image = match options.region {
            Some(region) => crop_to_region(&decoded, region, options)?,
            None => decoded,
        };

        let id = uuid::Uuid::new_v4().to_string();
        let capture = Capture::new(id.clone(), base_image);
        let summary = capture.summary();

        let mut inner = self.inner.write().expect("capture store lock poisoned");
        inner
            .captures
            .insert(id.clone(), Arc::new(RwLock::new(capture)));
        inner.order.push(id.clone());
        info!(
            id = %id,
            width = summary.width,
            height = summary.height,
            "Capture created"
        );
        Ok(summary)
    }

    /// Full metadata for one capture.
    pub fn get(&self, id: &str) -> Result<CaptureMetadata, CaptureError> {
        let capture = self.cell(id)?;
        let capture = capture.read().expect("capture lock poisoned");
        Ok(capture.metadata())
    }

    /// Summaries for all captures, oldest first.
    pub fn list(&self) -> Vec<CaptureSummary> {
        let inner = self.inner.read().expect("capture store lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|id| inner.captures.get(id))
            .map(|cell| cell.read().expect("capture lock poisoned").summary())
            .collect()
    }

    /// Validate an annotation and append it to a capture.
    ///
    /// Returns the new annotation count. The append is atomic: readers see
    /// either the list before the append or after it, never a torn state.
    pub fn append_annotation(
        &self,
        id: &str,
        annotation: Annotation,
    ) -> Result<usize, CaptureError> {
        annotation.validate()?;
        let cell = self.cell(id)?;
        let mut capture = cell.write().expect("capture lock poisoned");
        capture.annotations.push(annotation);
        debug!(id = %id, count = capture.annotations.len(), "Annotation appended");
        Ok(capture.annotations.len())
    }

    /// Consistent copy of a capture's base image and annotation list,
    /// for rendering outside any lock.
    pub fn snapshot(&self, id: &str) -> Result<(RgbaImage, Vec<Annotation>), CaptureError> {
        let cell = self.cell(id)?;
        let capture = cell.read().expect("capture lock poisoned");
        Ok((capture.base_image.clone(), capture.annotations.clone()))
    }

    /// Remove a capture entirely.
    pub fn remove(&self, id: &str) -> Result<(), CaptureError> {
        let mut inner = self.inner.write().expect("capture store lock poisoned");
        if inner.captures.remove(id).is_none() {
            return Err(CaptureError::NotFound(id.to_string()));
        }
        inner.order.retain(|existing| existing != id);
        info!(id = %id, "Capture removed");
        Ok(())
    }

    /// Number of stored captures.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("capture store lock poisoned")
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, id: &str) -> Result<Arc<RwLock<Capture>>, CaptureError> {
        let inner = self.inner.read().expect("capture store lock poisoned");
        inner
            .captures
            .get(id)
            .cloned()
            .ok_or_else(|| CaptureError::NotFound(id.to_string()))
    }
}

impl Default for CaptureStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Crop a decoded image to a region, scaling coordinates by the device
/// pixel ratio and resizing the result back to the region's dimensions.
fn crop_to_region(
    decoded: &RgbaImage,
    region: Region,
    options: &CaptureOptions,
) -> Result<RgbaImage, CaptureError> {
    region.validate()?;
    let ratio = options.pixel_ratio.unwrap_or(1.0);
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(CaptureError::InvalidRegion(format!(
            "pixel ratio must be positive, got {ratio}"
        )));
    }

    let rect = region.source_rect(options.scroll_x, options.scroll_y, ratio);
    rect.check_bounds(decoded.width(), decoded.height())?;

    let cropped =
        image::imageops::crop_imm(decoded, rect.x, rect.y, rect.width, rect.height).to_image();

    // At ratio 1 the crop already has the region's dimensions.
    if (cropped.width(), cropped.height()) == (region.width, region.height) {
        return Ok(cropped);
    }
    Ok(image::imageops::resize(
        &cropped,
        region.width,
        region.height,
        FilterType::Triangle,
    ))
}

//! Capture Service Library
//!
//! Stores webpage screenshots uploaded by a browser overlay, accepts
//! ordered box/text annotations against them, and renders composited
//! images on demand over a small HTTP API.

pub mod annotation;
pub mod capture;
pub mod compositor;
pub mod error;
pub mod font;
pub mod geometry;
pub mod server;
pub mod store;

pub use annotation::Annotation;
pub use capture::Capture;
pub use error::CaptureError;
pub use geometry::Region;
pub use store::CaptureStore;

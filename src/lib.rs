//! InstaEdit — a deterministic pixel-level photo editing and compositing
//! engine.
//!
//! The engine consumes a decoded RGBA buffer plus a parameter snapshot (ten
//! tone filters, rotation, a crop rectangle, text overlay properties) and
//! re-renders the working buffer from the immutable original on every change.
//! An externally supplied binary segmentation mask drives the one-shot
//! "place text behind subject" composite.
//!
//! Image acquisition, the segmentation service, and presentation are external
//! collaborators: everything here is synchronous pixel math over
//! [`image::RgbaImage`] buffers.

pub mod cli;
pub mod io;
pub mod logger;
pub mod mask;
pub mod ops;
pub mod params;
pub mod session;

pub use mask::Mask;
pub use params::{CropRect, FilterParams, FontWeight, TextProperties, preset};
pub use session::{EditSession, SessionState};

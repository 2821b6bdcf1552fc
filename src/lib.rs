//! # tone-calibration
//!
//! Colour and lighting calibration of face photos, and body proportions from
//! pose landmarks.
//!
//! This crate provides:
//! - **Landmark validation**: topology and visibility checks over candidates
//!   from any external detector, with best-face selection
//! - **White balance**: gray-world and skin-aware (von Kries) gains, bounded
//!   and validated
//! - **Lighting analysis**: McCamy CCT, per-zone uniformity and shadow checks
//! - **Personal colour**: sRGB to CIE L*a*b* and 12-season nearest-centroid
//!   classification
//! - **Body ratios**: shoulder/hip, waist/hip, leg/torso, symmetry and body type
//!   from 33 pose landmarks
//!
//! ## Failure policy
//!
//! An imperfect photo never blocks a run. Each stage that fails recoverably is
//! replaced by a deterministic fallback marked `is_fallback = true`, and the
//! [`OverallConfidence`] of the run reflects it. Only a malformed image buffer
//! is returned as an error.
//!
//! ## Quick Start
//!
//! ```rust
//! use tone_calibration::{CalibrationPipeline, ImageBuffer, Landmark};
//!
//! // Pixels from your camera or decoder
//! let image = ImageBuffer::from_fn(64, 64, |x, y| {
//!     if (x + y) % 5 < 2 { [205, 155, 130] } else { [150, 165, 190] }
//! }).unwrap();
//!
//! // Candidates from your landmark detector (none here)
//! let candidates: Vec<Vec<Landmark>> = Vec::new();
//!
//! let pipeline = CalibrationPipeline::default();
//! let analysis = pipeline.analyze_face(&image, &candidates).unwrap();
//!
//! assert!(analysis.face.is_fallback);
//! assert!(analysis.overall.sample_result);
//! println!("{:?} ({:.2})", analysis.tone.season, analysis.tone.confidence);
//! ```
//!
//! ## Custom Image Types
//!
//! The skin detector reads pixels through [`ImageAccess`]:
//!
//! ```rust
//! use tone_calibration::{ImageAccess, SkinConfig, SkinDetector};
//!
//! struct Flat([u8; 3]);
//!
//! impl ImageAccess for Flat {
//!     fn rgb(&self, _x: u32, _y: u32) -> [u8; 3] { self.0 }
//!     fn width(&self) -> u32 { 8 }
//!     fn height(&self) -> u32 { 8 }
//! }
//!
//! let mask = SkinDetector::new(SkinConfig::default()).detect(&Flat([205, 155, 130]));
//! assert_eq!(mask.coverage_percent, 100.0);
//! ```

pub mod body;
pub mod buffer;
pub mod classifier;
pub mod color;
pub mod confidence;
pub mod config;
mod error;
pub mod fallback;
pub mod landmarks;
pub mod lighting;
pub mod pipeline;
pub mod region;
pub mod skin;
mod types;
pub mod white_balance;

pub use body::{BodyRatioCalculator, BodyRatios, BodyType};
pub use buffer::{luminance, ImageAccess, ImageBuffer, PixelFormat};
pub use classifier::{Depth, PersonalColorClassifier, Season, SeasonScore, Tone, ToneClassification};
pub use color::LabColor;
pub use confidence::{propagate, ConfidenceGrade, OverallConfidence, Stage, StageReport};
pub use config::{
    BodyConfig, CalibrationConfig, ClassifierConfig, LightingConfig, RegionConfig, SkinConfig,
    ValidationConfig, WhiteBalanceConfig, WhiteBalancePolicy,
};
pub use error::{Error, Result};
pub use fallback::{recover, FallbackProducer, Fallbacks};
pub use landmarks::{DetectedFace, LandmarkProvider, LandmarkValidator, Topology};
pub use lighting::{LightingAnalysis, LightingAnalyzer, LightingIssue, LightingType, Zone};
pub use pipeline::{BodyAnalysis, CalibrationPipeline, FaceAnalysis, FaceJob};
pub use region::{extract_region, RegionCrop};
pub use skin::{SkinDetector, SkinMask};
pub use types::{BoundingBox, Landmark, Point};
pub use white_balance::{CorrectionGains, WhiteBalanceCorrector, WhiteBalanceMethod, WhiteBalanceResult};

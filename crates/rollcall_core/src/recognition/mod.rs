//! Face recognition boundary.
//!
//! # Responsibility
//! - Define the narrow contract the attendance reconciler consumes.
//! - Host provider implementations (currently only the simulated one).
//!
//! # Invariants
//! - `confidence` values are within `[0, 1]`.
//! - Providers may return identities outside the supplied roster; callers
//!   must intersect against the roster before trusting a match.

mod simulated;

pub use simulated::SimulatedRecognizer;

use crate::model::student::Student;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type RecognitionResult<T> = Result<T, RecognitionError>;

/// Bounding box of a detected face as `(top, right, bottom, left)` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation(pub i32, pub i32, pub i32, pub i32);

/// A detected face matched to a known student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedStudent {
    pub student_id: String,
    pub name: String,
    pub confidence: f64,
    /// Position of the face among all detections in the image.
    pub face_index: usize,
    pub location: FaceLocation,
}

/// A detected face that matched nobody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrecognizedFace {
    pub face_index: usize,
    pub confidence: f64,
    pub location: FaceLocation,
}

/// Provider output for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub recognized: Vec<RecognizedStudent>,
    pub unrecognized: Vec<UnrecognizedFace>,
}

/// Failure reported by a recognition provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// The image reference does not point at a readable file.
    ImageMissing(PathBuf),
    /// The image exists but cannot be interpreted.
    InvalidImage { path: PathBuf, reason: String },
    /// Provider-internal failure.
    Provider { provider: String, message: String },
}

impl Display for RecognitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImageMissing(path) => write!(f, "image not found: {}", path.display()),
            Self::InvalidImage { path, reason } => {
                write!(f, "invalid image {}: {reason}", path.display())
            }
            Self::Provider { provider, message } => {
                write!(f, "recognition provider `{provider}` failed: {message}")
            }
        }
    }
}

impl Error for RecognitionError {}

/// Pluggable face recognition capability.
///
/// Implementations receive the roster of the class being photographed so they
/// can restrict matching, but the reconciler does not rely on that.
pub trait RecognitionProvider {
    /// Stable identifier used in logs and errors.
    fn provider_id(&self) -> &str;

    /// Detects and identifies faces in `image`.
    fn recognize(&self, image: &Path, roster: &[Student]) -> RecognitionResult<RecognitionOutcome>;
}

//! Placeholder recognizer that picks students at random.
//!
//! Performs no image analysis. It recognizes a random 60%-80% (at least one)
//! of the roster and adds up to two unmatched detections, which is enough to
//! drive the attendance flow end to end until a real engine is plugged in.

use super::{
    FaceLocation, RecognitionError, RecognitionOutcome, RecognitionProvider, RecognitionResult,
    RecognizedStudent, UnrecognizedFace,
};
use crate::model::student::Student;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Mutex;

const PROVIDER_ID: &str = "simulated";
const MAX_UNRECOGNIZED: usize = 2;

/// Random-sampling stand-in for a face recognition engine.
pub struct SimulatedRecognizer {
    rng: Mutex<StdRng>,
}

impl SimulatedRecognizer {
    /// Creates a recognizer seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a recognizer whose picks are reproducible for the same seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SimulatedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionProvider for SimulatedRecognizer {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn recognize(&self, image: &Path, roster: &[Student]) -> RecognitionResult<RecognitionOutcome> {
        if !image.is_file() {
            return Err(RecognitionError::ImageMissing(image.to_path_buf()));
        }

        let mut rng = self.rng.lock().map_err(|_| RecognitionError::Provider {
            provider: PROVIDER_ID.to_string(),
            message: "rng lock poisoned".to_string(),
        })?;

        let mut outcome = RecognitionOutcome::default();
        if roster.is_empty() {
            info!("event=recognize module=recognition status=ok provider={PROVIDER_ID} recognized=0 unrecognized=0");
            return Ok(outcome);
        }

        let (low, high) = sample_bounds(roster.len());
        let count = rng.gen_range(low..=high);
        for (face_index, student) in roster.choose_multiple(&mut *rng, count).enumerate() {
            let confidence = round_confidence(rng.gen_range(0.65..=0.95));
            debug!(
                "event=recognize_match module=recognition student_id={} confidence={confidence:.2}",
                student.student_id
            );
            outcome.recognized.push(RecognizedStudent {
                student_id: student.student_id.clone(),
                name: student.name.clone(),
                confidence,
                face_index,
                location: matched_location(face_index),
            });
        }

        let extra = rng.gen_range(0..=MAX_UNRECOGNIZED);
        for offset in 0..extra {
            outcome.unrecognized.push(UnrecognizedFace {
                face_index: outcome.recognized.len() + offset,
                confidence: round_confidence(rng.gen_range(0.20..=0.55)),
                location: FaceLocation(200, 200, 250, 150),
            });
        }

        info!(
            "event=recognize module=recognition status=ok provider={PROVIDER_ID} recognized={} unrecognized={}",
            outcome.recognized.len(),
            outcome.unrecognized.len()
        );
        Ok(outcome)
    }
}

/// Inclusive bounds on how many of `roster_len` students get recognized.
fn sample_bounds(roster_len: usize) -> (usize, usize) {
    let low = (roster_len * 3 / 5).max(1);
    let high = (roster_len * 4 / 5).max(1).min(roster_len);
    (low.min(high), high)
}

fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn matched_location(face_index: usize) -> FaceLocation {
    let step = i32::try_from(face_index).unwrap_or(i32::MAX / 64);
    FaceLocation(50 + step * 30, 100 + step * 20, 150 + step * 30, 100 + step * 20)
}

#[cfg(test)]
mod tests {
    use super::{sample_bounds, SimulatedRecognizer};
    use crate::model::student::Student;
    use crate::recognition::{RecognitionError, RecognitionProvider};
    use std::collections::HashSet;
    use std::path::Path;

    fn roster(size: usize) -> Vec<Student> {
        (0..size)
            .map(|i| Student::new(format!("S{i}"), format!("Student {i}"), "C1", ""))
            .collect()
    }

    #[test]
    fn sample_bounds_recognizes_at_least_one() {
        assert_eq!(sample_bounds(1), (1, 1));
        assert_eq!(sample_bounds(2), (1, 1));
        assert_eq!(sample_bounds(10), (6, 8));
    }

    #[test]
    fn missing_image_is_reported() {
        let recognizer = SimulatedRecognizer::with_seed(7);
        let err = recognizer
            .recognize(Path::new("/definitely/not/here.jpg"), &roster(3))
            .expect_err("missing image should fail");
        assert!(matches!(err, RecognitionError::ImageMissing(_)));
    }

    #[test]
    fn recognizes_a_distinct_subset_of_the_roster() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("class.jpg");
        std::fs::write(&image, b"jpeg").unwrap();
        let roster = roster(10);

        let outcome = SimulatedRecognizer::with_seed(42)
            .recognize(&image, &roster)
            .unwrap();

        assert!((6..=8).contains(&outcome.recognized.len()));
        assert!(outcome.unrecognized.len() <= 2);
        let ids = outcome
            .recognized
            .iter()
            .map(|m| m.student_id.as_str())
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), outcome.recognized.len());
        for matched in &outcome.recognized {
            assert!((0.65..=0.95).contains(&matched.confidence));
        }
        for face in &outcome.unrecognized {
            assert!((0.20..=0.55).contains(&face.confidence));
        }
    }

    #[test]
    fn same_seed_gives_same_picks() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("class.jpg");
        std::fs::write(&image, b"jpeg").unwrap();
        let roster = roster(5);

        let first = SimulatedRecognizer::with_seed(9)
            .recognize(&image, &roster)
            .unwrap();
        let second = SimulatedRecognizer::with_seed(9)
            .recognize(&image, &roster)
            .unwrap();
        assert_eq!(first, second);
    }
}

use actix_web::web;
use image::{ImageReader, RgbImage};
use shared::ClassificationResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::inference::{InferenceError, ZeroShotModel};

/// Candidate descriptions, in the order the model scores them.
pub const CANDIDATE_DESCRIPTIONS: [&str; 2] = [
    "a photo of a healthy outdoor insulator",
    "a photo of a damaged or broken outdoor insulator",
];

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("Expected {expected} probabilities, model returned {actual}")]
    UnexpectedOutput { expected: usize, actual: usize },
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),
    #[error("Blocking task failed: {0}")]
    Blocking(String),
}

#[derive(Clone)]
pub struct ClassificationService {
    model: Arc<dyn ZeroShotModel>,
    timeout: Duration,
}

impl ClassificationService {
    pub fn new(model: Arc<dyn ZeroShotModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn load_image(image_path: &Path) -> Result<RgbImage, ClassifyError> {
        let img = ImageReader::open(image_path)
            .map_err(|e| ClassifyError::InvalidImage(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| ClassifyError::InvalidImage(e.to_string()))?
            .decode()
            .map_err(|e| ClassifyError::InvalidImage(e.to_string()))?;
        Ok(img.to_rgb8())
    }

    pub fn calculate_result(probabilities: &[f32]) -> Result<ClassificationResult, ClassifyError> {
        match probabilities {
            [healthy, damaged] => Ok(ClassificationResult::new(*healthy, *damaged)),
            _ => Err(ClassifyError::UnexpectedOutput {
                expected: CANDIDATE_DESCRIPTIONS.len(),
                actual: probabilities.len(),
            }),
        }
    }

    pub async fn classify(&self, image_path: &Path) -> Result<ClassificationResult, ClassifyError> {
        let model = Arc::clone(&self.model);
        let image_path: PathBuf = image_path.to_path_buf();

        let task = web::block(move || {
            let image = Self::load_image(&image_path)?;
            model
                .class_probabilities(&image, &CANDIDATE_DESCRIPTIONS)
                .map_err(ClassifyError::from)
        });

        let probabilities = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| ClassifyError::Timeout(self.timeout))?
            .map_err(|e| ClassifyError::Blocking(e.to_string()))??;

        let result = Self::calculate_result(&probabilities)?;
        log::info!(
            "Classified as {} (healthy={:.4}, damaged={:.4})",
            result.verdict,
            result.healthy_probability,
            result.damaged_probability
        );
        Ok(result)
    }
}

pub mod clip;
pub mod preprocess;

use image::RgbImage;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
    #[error("Model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("Unexpected model output: {0}")]
    Output(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Failed to load TorchScript module: {0}")]
    Torch(#[from] tch::TchError),
    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(String),
}

/// A pretrained image/text model that scores candidate descriptions.
///
/// Returns one probability per candidate, in candidate order, summing to 1.
pub trait ZeroShotModel: Send + Sync {
    fn class_probabilities(
        &self,
        image: &RgbImage,
        candidates: &[&str],
    ) -> Result<Vec<f32>, InferenceError>;
}

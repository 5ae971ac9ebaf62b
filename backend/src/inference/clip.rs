use image::RgbImage;
use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, IValue, Kind, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};

use crate::inference::preprocess::{preprocess, IMAGE_SIZE};
use crate::inference::{InferenceError, ModelLoadError, ZeroShotModel};

pub const MODEL_FILE: &str = "model.pt";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
const PAD_TOKEN: &str = "<|endoftext|>";

/// CLIP exported as a TorchScript trace of `CLIPModel` taking
/// `(input_ids, pixel_values, attention_mask)` and returning
/// `logits_per_image` as its first output.
pub struct ClipModel {
    module: Mutex<CModule>,
    tokenizer: Tokenizer,
    device: Device,
}

impl ClipModel {
    /// Loads `<cache_dir>/<model_name>/model.pt` and `tokenizer.json`.
    pub fn load(cache_dir: &Path, model_name: &str) -> Result<Self, ModelLoadError> {
        let model_dir = cache_dir.join(model_name);
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        for path in [&model_path, &tokenizer_path] {
            if !path.is_file() {
                return Err(ModelLoadError::Missing(path.clone()));
            }
        }

        let device = Device::cuda_if_available();
        log::info!("Loading TorchScript module from {} on {:?}", model_path.display(), device);
        let mut module = CModule::load_on_device(&model_path, device)?;
        module.set_eval();

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;
        let pad_id = tokenizer
            .token_to_id(PAD_TOKEN)
            .ok_or_else(|| ModelLoadError::Tokenizer(format!("missing {} token", PAD_TOKEN)))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }));

        Ok(Self {
            module: Mutex::new(module),
            tokenizer,
            device,
        })
    }

    fn tokenize(&self, candidates: &[&str]) -> Result<(Tensor, Tensor), InferenceError> {
        let encodings = self
            .tokenizer
            .encode_batch(candidates.to_vec(), true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut ids = Vec::with_capacity(candidates.len() * seq_len);
        let mut mask = Vec::with_capacity(candidates.len() * seq_len);
        for encoding in &encodings {
            ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = [candidates.len() as i64, seq_len as i64];
        Ok((
            Tensor::from_slice(&ids).view(shape).to_device(self.device),
            Tensor::from_slice(&mask).view(shape).to_device(self.device),
        ))
    }

    fn logits_per_image(output: IValue) -> Result<Tensor, InferenceError> {
        match output {
            IValue::Tensor(tensor) => Ok(tensor),
            IValue::Tuple(mut values) | IValue::GenericList(mut values) if !values.is_empty() => {
                match values.swap_remove(0) {
                    IValue::Tensor(tensor) => Ok(tensor),
                    other => Err(InferenceError::Output(format!(
                        "expected logits tensor, got {:?}",
                        other
                    ))),
                }
            }
            other => Err(InferenceError::Output(format!(
                "expected tensor or tuple, got {:?}",
                other
            ))),
        }
    }
}

impl ZeroShotModel for ClipModel {
    fn class_probabilities(
        &self,
        image: &RgbImage,
        candidates: &[&str],
    ) -> Result<Vec<f32>, InferenceError> {
        let (input_ids, attention_mask) = self.tokenize(candidates)?;
        let size = IMAGE_SIZE as i64;
        let pixel_values = Tensor::from_slice(&preprocess(image))
            .view([1, 3, size, size])
            .to_device(self.device);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| InferenceError::Output("model lock poisoned".to_string()))?;
            tch::no_grad(|| {
                module.forward_is(&[
                    IValue::Tensor(input_ids),
                    IValue::Tensor(pixel_values),
                    IValue::Tensor(attention_mask),
                ])
            })?
        };

        let probs = Self::logits_per_image(output)?
            .softmax(-1, Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = probs.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        probs.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }
}

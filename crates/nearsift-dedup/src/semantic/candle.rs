//! Sentence-transformer embeddings via Candle (`candle` feature).
//!
//! Loads a BERT-family model from the HuggingFace hub, mean-pools token
//! embeddings under the attention mask and L2-normalizes the result.
//!
//! ```no_run
//! use nearsift_dedup::semantic::{CandleBackend, EmbeddingBackend};
//!
//! let backend = CandleBackend::new("sentence-transformers/all-MiniLM-L6-v2").unwrap();
//! let embeddings = backend.embed_batch(&["the cat sat", "the dog sat"]).unwrap();
//! ```

use super::EmbeddingBackend;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::fmt::Display;
use std::path::PathBuf;
use tokenizers::Tokenizer;

fn ctx<E: Display>(what: &'static str) -> impl Fn(E) -> String {
    move |e| format!("{what}: {e}")
}

/// Candle-based embedding backend for sentence-transformers models.
pub struct CandleBackend {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    embedding_dim: usize,
    model_id: String,
}

impl CandleBackend {
    /// Load `model_id` from the HuggingFace hub onto the CPU.
    pub fn new(model_id: &str) -> Result<Self, String> {
        Self::with_device(model_id, Device::Cpu)
    }

    /// Load `model_id` onto a specific device.
    pub fn with_device(model_id: &str, device: Device) -> Result<Self, String> {
        let api = Api::new().map_err(ctx("failed to create HF API"))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json").map_err(ctx("missing config.json"))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(ctx("missing tokenizer.json"))?;
        let weights_path = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(ctx("missing model weights"))?;

        let mut backend = Self::from_files(config_path, tokenizer_path, weights_path, device)?;
        backend.model_id = model_id.to_string();
        Ok(backend)
    }

    /// Load a model from local files.
    pub fn from_files(
        config_path: PathBuf,
        tokenizer_path: PathBuf,
        weights_path: PathBuf,
        device: Device,
    ) -> Result<Self, String> {
        let config_str = std::fs::read_to_string(&config_path).map_err(ctx("read config"))?;
        let config: BertConfig = serde_json::from_str(&config_str).map_err(ctx("parse config"))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(ctx("load tokenizer"))?;

        let is_safetensors = weights_path
            .extension()
            .is_some_and(|ext| ext == "safetensors");
        let vb = if is_safetensors {
            // SAFETY: the weights file is not modified while mapped.
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DTYPE, &device)
                    .map_err(ctx("load safetensors"))?
            }
        } else {
            VarBuilder::from_pth(&weights_path, DTYPE, &device).map_err(ctx("load weights"))?
        };

        let model = BertModel::load(vb, &config).map_err(ctx("build BERT model"))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            embedding_dim: config.hidden_size,
            model_id: weights_path.display().to_string(),
        })
    }

    fn tensor(&self, data: Vec<u32>, rows: usize, cols: usize) -> Result<Tensor, String> {
        Tensor::from_vec(data, (rows, cols), &self.device).map_err(ctx("build input tensor"))
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, String> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(ctx("tokenize"))?;
        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch = texts.len();

        let mut ids = Vec::with_capacity(batch * max_len);
        let mut mask = Vec::with_capacity(batch * max_len);
        let mut type_ids = Vec::with_capacity(batch * max_len);
        for enc in &encodings {
            let pad = max_len - enc.get_ids().len();
            ids.extend(enc.get_ids().iter().copied().chain(std::iter::repeat(0).take(pad)));
            mask.extend(
                enc.get_attention_mask()
                    .iter()
                    .copied()
                    .chain(std::iter::repeat(0).take(pad)),
            );
            type_ids.extend(enc.get_type_ids().iter().copied().chain(std::iter::repeat(0).take(pad)));
        }

        let input_ids = self.tensor(ids, batch, max_len)?;
        let attention_mask = self.tensor(mask, batch, max_len)?;
        let token_type_ids = self.tensor(type_ids, batch, max_len)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(ctx("forward pass"))?;

        // Masked mean pooling.
        let mask_f = attention_mask
            .unsqueeze(2)
            .and_then(|m| m.to_dtype(DType::F32))
            .map_err(ctx("expand mask"))?;
        let summed = hidden
            .broadcast_mul(&mask_f)
            .and_then(|t| t.sum(1))
            .map_err(ctx("sum embeddings"))?;
        let counts = mask_f
            .sum(1)
            .and_then(|t| t.clamp(1e-9, f64::MAX))
            .map_err(ctx("sum mask"))?;
        let pooled = summed.broadcast_div(&counts).map_err(ctx("mean pool"))?;

        let norms = pooled
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .and_then(|t| t.clamp(1e-12, f64::MAX))
            .map_err(ctx("compute norms"))?;
        let normalized = pooled.broadcast_div(&norms).map_err(ctx("normalize"))?;

        normalized.to_vec2::<f32>().map_err(ctx("read embeddings"))
    }
}

impl EmbeddingBackend for CandleBackend {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, String> {
        self.encode(texts)
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::cosine_similarity;

    // Run with: cargo test --features candle -- --ignored

    #[test]
    #[ignore = "Requires model download"]
    fn test_candle_embed_batch() {
        let backend = CandleBackend::new("sentence-transformers/all-MiniLM-L6-v2").unwrap();
        let embeddings = backend
            .embed_batch(&["hello world", "goodbye world", "how are you"])
            .unwrap();

        assert_eq!(embeddings.len(), 3);
        for emb in &embeddings {
            assert_eq!(emb.len(), backend.embedding_dim());
            let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    #[ignore = "Requires model download"]
    fn test_candle_similar_texts() {
        let backend = CandleBackend::new("sentence-transformers/all-MiniLM-L6-v2").unwrap();
        let e = backend
            .embed_batch(&[
                "the cat sat on the mat",
                "a cat was sitting on the mat",
                "machine learning is transforming ai",
            ])
            .unwrap();
        assert!(cosine_similarity(&e[0], &e[1]) > cosine_similarity(&e[0], &e[2]));
    }
}

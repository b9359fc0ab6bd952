//! Local sentence-transformer embeddings with Candle
//!
//! The provider is an explicit resource handle: [`LocalEmbeddingProvider::load`]
//! downloads (or reuses cached) weights and builds the model once, and the
//! model lives exactly as long as the handle. Callers share it through an
//! `Arc` and drop it when finished; there is no process-wide model cache.
//!
//! Pipeline per batch:
//! ```text
//! texts → tokenizer (pad to longest, truncate) → BERT → masked mean pooling → L2 normalize
//! ```

use crate::embedding::traits::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use candle_core::{D, DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use gist_config::EmbeddingConfig;
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

fn inference_err(context: &'static str) -> impl FnOnce(candle_core::Error) -> EmbeddingError {
    move |e| EmbeddingError::Inference(format!("{context}: {e}"))
}

fn select_device(use_gpu: bool) -> Device {
    if use_gpu {
        if candle_core::utils::cuda_is_available()
            && let Ok(device) = Device::new_cuda(0)
        {
            return device;
        }
        if candle_core::utils::metal_is_available()
            && let Ok(device) = Device::new_metal(0)
        {
            return device;
        }
    }
    Device::Cpu
}

/// BERT-family embedding model running on-device
pub struct LocalEmbeddingProvider {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    max_tokens: usize,
}

impl LocalEmbeddingProvider {
    /// Download (or reuse cached) weights and build the model
    ///
    /// # Errors
    /// Returns `EmbeddingError::Network` if files cannot be fetched,
    /// `EmbeddingError::Config` if the model disagrees with the configured
    /// dimensions or token limit, and `EmbeddingError::ModelLoad` otherwise.
    pub async fn load(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let model_id = config.model.id.clone();
        tracing::info!(
            "Loading embedding model: {model_id} (revision {})",
            config.model.revision
        );

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = config.cache_dir() {
            builder = builder.with_cache_dir(dir);
        }
        let api = builder
            .build()
            .map_err(|e| EmbeddingError::Network(format!("Failed to create HF API: {e}")))?;
        let repo = api.repo(Repo::with_revision(
            model_id.clone(),
            RepoType::Model,
            config.model.revision.clone(),
        ));

        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| EmbeddingError::Network(format!("Failed to download config: {e}")))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| EmbeddingError::Network(format!("Failed to download tokenizer: {e}")))?;
        let weights_path = match repo.get("model.safetensors").await {
            Ok(path) => path,
            Err(_) => repo.get("pytorch_model.bin").await.map_err(|e| {
                EmbeddingError::Network(format!("Failed to download model weights: {e}"))
            })?,
        };

        let config_str = tokio::fs::read_to_string(&config_path).await?;
        let config_json: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::model_load_error(&format!("Invalid config.json: {e}")))?;

        let hidden_size = config_json
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| EmbeddingError::model_load_error("config.json missing hidden_size"))?;
        if hidden_size != config.model.dimensions {
            return Err(EmbeddingError::Config(format!(
                "Model {model_id} produces {hidden_size}-dimensional vectors but {} are configured",
                config.model.dimensions
            )));
        }

        if let Some(max_positions) = config_json
            .get("max_position_embeddings")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
            && config.model.max_tokens > max_positions
        {
            return Err(EmbeddingError::Config(format!(
                "Configured max_tokens ({}) exceeds model's max_position_embeddings ({max_positions})",
                config.model.max_tokens
            )));
        }

        let bert_config: BertConfig = serde_json::from_str(&config_str).map_err(|e| {
            EmbeddingError::model_load_error(&format!("Failed to parse BERT config: {e}"))
        })?;

        let device = select_device(config.performance.use_gpu);
        let vb = if weights_path.to_string_lossy().ends_with(".safetensors") {
            // SAFETY: the weights file is not modified while mapped
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device).map_err(
                    |e| EmbeddingError::model_load_error(&format!("Failed to load safetensors: {e}")),
                )?
            }
        } else {
            VarBuilder::from_pth(&weights_path, DType::F32, &device).map_err(|e| {
                EmbeddingError::model_load_error(&format!("Failed to load pytorch weights: {e}"))
            })?
        };
        let model = BertModel::load(vb, &bert_config).map_err(|e| {
            EmbeddingError::model_load_error(&format!("Failed to initialize BERT model: {e}"))
        })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::Tokenization(format!("Failed to load tokenizer: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.model.max_tokens,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Tokenization(format!("Failed to set truncation: {e}")))?;

        tracing::info!("Embedding model {model_id} ready on {device:?} ({hidden_size} dims)");

        Ok(Self {
            model_id,
            model,
            tokenizer,
            device,
            dimension: hidden_size,
            max_tokens: config.model.max_tokens,
        })
    }

    fn embed_sync(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map_or(0, tokenizers::Encoding::len);

        let truncated = encodings
            .iter()
            .filter(|e| !e.get_overflowing().is_empty())
            .count();
        if truncated > 0 {
            tracing::debug!(
                "{truncated} of {batch_size} texts truncated at {} tokens",
                self.max_tokens
            );
        }

        // Padding is BatchLongest, so every encoding has `seq_len` entries
        let ids: Vec<i64> = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().map(|&id| i64::from(id)))
            .collect();
        let mask: Vec<f32> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().iter().map(|&m| m as f32))
            .collect();

        let input_ids = Tensor::from_vec(ids, (batch_size, seq_len), &self.device)
            .map_err(inference_err("Failed to create input tensor"))?;
        let attention_mask = Tensor::from_vec(mask, (batch_size, seq_len), &self.device)
            .map_err(inference_err("Failed to create attention mask"))?;
        let token_type_ids = input_ids
            .zeros_like()
            .map_err(inference_err("Failed to create token type ids"))?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference_err("BERT forward pass failed"))?;

        // Masked mean pooling over the sequence dimension
        let mask_expanded = attention_mask
            .unsqueeze(2)
            .and_then(|m| m.broadcast_as(output.shape()))
            .and_then(|m| m.to_dtype(output.dtype()))
            .map_err(inference_err("Failed to expand mask"))?;
        let summed = output
            .broadcast_mul(&mask_expanded)
            .and_then(|t| t.sum(1))
            .map_err(inference_err("Failed to sum embeddings"))?;
        let counts = mask_expanded
            .sum(1)
            .and_then(|t| t.clamp(1e-9f32, f32::INFINITY))
            .map_err(inference_err("Failed to count tokens"))?;
        let pooled = summed
            .broadcast_div(&counts)
            .map_err(inference_err("Failed to average embeddings"))?;

        // L2 normalize so cosine similarity is a dot product
        let norms = pooled
            .sqr()
            .and_then(|x| x.sum_keepdim(D::Minus1))
            .and_then(|x| x.sqrt())
            .and_then(|x| x.clamp(1e-12f32, f32::INFINITY))
            .map_err(inference_err("Failed to compute norms"))?;
        let normalized = pooled
            .broadcast_div(&norms)
            .map_err(inference_err("Failed to normalize embeddings"))?;

        normalized
            .to_dtype(DType::F32)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(inference_err("Failed to read embeddings"))
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.embed_sync(texts)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }

    async fn is_ready(&self) -> bool {
        // Weights are loaded eagerly in `load`
        true
    }

    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        Ok(())
    }
}

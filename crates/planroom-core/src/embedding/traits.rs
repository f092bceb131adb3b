//! Traits for provider operations.
//!
//! Providers sit across an external boundary (HTTP APIs, local model
//! servers), so every operation is async and returns an ordinary
//! `Result`; slow or failing providers are not special-cased.

use crate::error::EmbeddingError;
use async_trait::async_trait;
use tracing::warn;

/// Description stored for an image whose captioning failed.
pub const DESCRIPTION_PLACEHOLDER: &str = "[Image description unavailable]";

/// Text embedding provider.
///
/// # Examples
///
/// ```ignore
/// let embedder: Arc<dyn TextEmbedder> = Arc::new(OpenAiEmbedder::new(config)?);
/// let v = embedder.embed_text("fire-rated door hardware").await?;
/// assert_eq!(v.len(), embedder.dimension());
/// ```
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Output dimension, fixed for the lifetime of the provider.
    fn dimension(&self) -> usize;

    /// Embeds a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds several texts, preserving input order.
    ///
    /// The default implementation calls [`embed_text`](Self::embed_text)
    /// sequentially; HTTP providers override it with a single request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(embeddings)
    }
}

/// Image embedding provider.
///
/// Its dimension may differ from the text embedder's. Image vectors are
/// only indexed alongside text vectors when both share one space (equal
/// dimension, e.g. a CLIP-style model serving both modalities).
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>, EmbeddingError>;
}

/// Image captioning provider.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    /// Produces a description or reports why it could not.
    async fn try_describe(&self, image: &[u8], context_hint: &str)
        -> Result<String, EmbeddingError>;

    /// Best-effort description; never fails.
    ///
    /// Errors and blank descriptions are logged and replaced with
    /// [`DESCRIPTION_PLACEHOLDER`] so captioning never blocks ingestion.
    async fn describe_image(&self, image: &[u8], context_hint: &str) -> String {
        match self.try_describe(image, context_hint).await {
            Ok(description) if !description.trim().is_empty() => description.trim().to_string(),
            Ok(_) => {
                warn!("Image describer returned an empty description");
                DESCRIPTION_PLACEHOLDER.to_string()
            }
            Err(e) => {
                warn!("Image description failed: {}", e);
                DESCRIPTION_PLACEHOLDER.to_string()
            }
        }
    }
}

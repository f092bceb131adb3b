//! Embedding and captioning provider abstractions.
//!
//! The retrieval engine never runs a model itself. It talks to providers
//! through three traits so hosted APIs, local servers and test doubles can
//! be swapped without touching the index or the retriever.
//!
//! ## Core Traits
//!
//! - [`TextEmbedder`] - `embed_text(text) -> [f32; D]`
//! - [`ImageEmbedder`] - `embed_image(bytes) -> [f32; D2]`
//! - [`ImageDescriber`] - best-effort `describe_image(bytes, hint) -> text`
//!
//! ## Implementations
//!
//! - `OpenAiEmbedder` / `OpenAiImageDescriber` (feature `openai`) for
//!   OpenAI-compatible HTTP endpoints

mod traits;
mod vector;

#[cfg(feature = "openai")]
mod openai;

pub use traits::{ImageDescriber, ImageEmbedder, TextEmbedder, DESCRIPTION_PLACEHOLDER};
pub use vector::{dot, is_zero_vector, l2_normalize};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiEmbedder, OpenAiImageDescriber};

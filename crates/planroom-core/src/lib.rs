//! # Planroom Core
//!
//! Retrieval engine for multimodal document question answering.
//!
//! This crate turns multi-page documents (construction plan sets, specs,
//! schedules) into retrievable chunks and serves hybrid-ranked context to a
//! downstream answer generator. Frontends (the `planroom` CLI, a web layer)
//! construct one [`search::VectorIndex`] at startup and share it by handle.
//!
//! ## Modules
//!
//! - [`chunking`] - Page-scoped overlapping text windows and image extraction
//! - [`search`] - Vector index, keyword scan, weighted fusion, persistence
//! - [`retrieval`] - Query keyword extraction, re-ranking, citations
//! - [`processing`] - Ingestion pipeline (chunk, caption, embed, index, save)
//! - [`embedding`] - Provider traits and OpenAI-compatible HTTP providers
//! - [`storage`] - Key-value persistence backends for index artifacts
//! - [`config`] - Production configuration constants
//! - [`error`] - Error types for chunking, embedding, ingestion, retrieval

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod processing;
pub mod retrieval;
pub mod search;
pub mod storage;

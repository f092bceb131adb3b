//! Persisted index artifacts.
//!
//! The index is saved as three independent blobs:
//!
//! | Key | Format | Content |
//! |-----|--------|---------|
//! | [`VECTORS_KEY`] | binary | normalized rows in row-id order |
//! | [`METADATA_KEY`] | JSON | `Vec<ChunkRecord>`, index-aligned with rows |
//! | [`DOCUMENT_MAP_KEY`] | JSON | active document id -> owned row ids |
//!
//! # Vector artifact layout
//!
//! All integers and floats are little-endian.
//!
//! ```text
//! magic   [u8; 4]  b"PRVX"
//! version u32      1
//! dim     u32
//! count   u64
//! rows    [f32; dim * count]
//! ```
//!
//! Decoding validates every cross-artifact invariant before anything is
//! handed to the index, so a partial or inconsistent set never yields a
//! half-populated index.

use super::types::{validate_dimension, ChunkRecord, DocumentId, RowId, SearchError};
use std::collections::BTreeMap;

pub const VECTORS_KEY: &str = "index.vectors";
pub const METADATA_KEY: &str = "metadata.json";
pub const DOCUMENT_MAP_KEY: &str = "docmap.json";

/// All artifact keys, in save order.
pub const ARTIFACT_KEYS: [&str; 3] = [VECTORS_KEY, METADATA_KEY, DOCUMENT_MAP_KEY];

const MAGIC: &[u8; 4] = b"PRVX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Tolerance on the stored row norm (rows must be unit length or zero).
const NORM_TOLERANCE: f32 = 1e-3;

pub type DocumentMap = BTreeMap<DocumentId, Vec<RowId>>;

/// Decoded and validated contents of the three artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedIndex {
    pub dimension: usize,
    pub rows: Vec<Vec<f32>>,
    pub metadata: Vec<ChunkRecord>,
    pub document_map: DocumentMap,
}

fn corrupt(msg: impl Into<String>) -> SearchError {
    SearchError::PersistenceCorrupt(msg.into())
}

/// Encodes rows into the binary vector artifact.
pub fn encode_vectors<'a, I>(dimension: usize, count: usize, rows: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut bytes = Vec::with_capacity(HEADER_LEN + dimension * count * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(dimension as u32).to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for row in rows {
        for value in row {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

/// Decodes the binary vector artifact, returning `(dimension, rows)`.
pub fn decode_vectors(bytes: &[u8]) -> Result<(usize, Vec<Vec<f32>>), SearchError> {
    if bytes.len() < HEADER_LEN {
        return Err(corrupt(format!(
            "vector artifact truncated: {} bytes, header needs {}",
            bytes.len(),
            HEADER_LEN
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("vector artifact has wrong magic"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported vector artifact version {}",
            version
        )));
    }
    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected = dimension
        .checked_mul(count)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("vector artifact header overflows"))?;
    if body.len() != expected {
        return Err(corrupt(format!(
            "vector artifact body is {} bytes, header declares {} rows of dimension {}",
            body.len(),
            count,
            dimension
        )));
    }
    if dimension == 0 && count > 0 {
        return Err(corrupt("vector artifact declares zero dimension"));
    }

    let rows = if dimension == 0 {
        Vec::new()
    } else {
        body.chunks_exact(dimension * 4)
            .map(|row| {
                row.chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect()
            })
            .collect()
    };
    Ok((dimension, rows))
}

pub fn encode_metadata(metadata: &[ChunkRecord]) -> Result<Vec<u8>, SearchError> {
    serde_json::to_vec(metadata)
        .map_err(|e| SearchError::StorageError(format!("Failed to serialize metadata: {}", e)))
}

pub fn decode_metadata(bytes: &[u8]) -> Result<Vec<ChunkRecord>, SearchError> {
    serde_json::from_slice(bytes).map_err(|e| corrupt(format!("metadata artifact: {}", e)))
}

pub fn encode_document_map(map: &DocumentMap) -> Result<Vec<u8>, SearchError> {
    serde_json::to_vec(map).map_err(|e| {
        SearchError::StorageError(format!("Failed to serialize document map: {}", e))
    })
}

pub fn decode_document_map(bytes: &[u8]) -> Result<DocumentMap, SearchError> {
    serde_json::from_slice(bytes).map_err(|e| corrupt(format!("document map artifact: {}", e)))
}

/// Decodes all three artifacts and checks they describe one consistent index.
///
/// # Errors
///
/// - `DimensionMismatch` if the stored dimension differs from `dimension`
///   (a non-empty store only)
/// - `PersistenceCorrupt` for malformed bytes, misaligned counts, row ids
///   out of order, non-normalized rows, or dangling document map entries
pub fn decode_index(
    dimension: usize,
    vectors: &[u8],
    metadata: &[u8],
    document_map: &[u8],
) -> Result<PersistedIndex, SearchError> {
    let (stored_dimension, rows) = decode_vectors(vectors)?;
    let metadata = decode_metadata(metadata)?;
    let document_map = decode_document_map(document_map)?;

    if !rows.is_empty() {
        validate_dimension(dimension, stored_dimension)?;
    }

    if rows.len() != metadata.len() {
        return Err(corrupt(format!(
            "{} vectors but {} metadata records",
            rows.len(),
            metadata.len()
        )));
    }

    for (position, record) in metadata.iter().enumerate() {
        if record.row_id.as_index() != position {
            return Err(corrupt(format!(
                "metadata record {} carries row id {}",
                position, record.row_id
            )));
        }
    }

    for (position, row) in rows.iter().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(corrupt(format!("row {} contains non-finite values", position)));
        }
        let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm != 0.0 && (norm - 1.0).abs() > NORM_TOLERANCE {
            return Err(corrupt(format!(
                "row {} is not normalized (norm {})",
                position, norm
            )));
        }
    }

    for (document_id, row_ids) in &document_map {
        for row_id in row_ids {
            let record = metadata.get(row_id.as_index()).ok_or_else(|| {
                corrupt(format!(
                    "document {} references missing row {}",
                    document_id, row_id
                ))
            })?;
            if record.chunk.document_id != *document_id {
                return Err(corrupt(format!(
                    "document {} claims row {} owned by {}",
                    document_id, row_id, record.chunk.document_id
                )));
            }
        }
    }

    Ok(PersistedIndex {
        dimension,
        rows,
        metadata,
        document_map,
    })
}

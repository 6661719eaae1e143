// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] mc_core::CheckpointError),
    #[error("no record found for id {0}")]
    NotFound(String),
    #[error("id collision on {id}: new content hashed to an existing id for a different record")]
    Collision { id: String },
}

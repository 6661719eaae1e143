// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic, content-derived identifiers.
//!
//! Unlike [`crate::id::define_id!`]'s randomly generated IDs, task and
//! checkpoint identity must be reproducible from content so that creating the
//! same logical task twice dedups instead of inserting a duplicate row.

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashIdError {
    #[error("id collision: {id} already refers to different content")]
    Collision { id: String },
}

/// Derive `"<prefix>-<10 lowercase hex>"` from the NUL-joined field values.
///
/// Field order is significant: `short_id("mc", &["a", "b"])` and
/// `short_id("mc", &["b", "a"])` are different identities.
pub fn short_id(prefix: &str, fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(field.as_bytes());
    }
    let digest = hasher.finalize();
    let hex = hex_prefix(&digest, 5);
    format!("{prefix}-{hex}")
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n).map(|b| format!("{b:02x}")).collect()
}

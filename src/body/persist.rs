//! Body snapshots
//!
//! A body is written as versioned JSON. Loading validates the arena so a
//! hand-edited or truncated save cannot produce dangling links.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Body, BodyError};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("body snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported body snapshot version {found}")]
    Version { found: u32 },
    #[error(transparent)]
    Invalid(#[from] BodyError),
}

#[derive(Serialize, Deserialize)]
struct BodySnapshot {
    version: u32,
    body: Body,
}

/// Serialize a body, including its severed parts
pub fn save_body(body: &Body) -> Result<String, PersistError> {
    let snapshot = BodySnapshot {
        version: SAVE_VERSION,
        body: body.clone(),
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Restore a body saved by `save_body`
pub fn load_body(json: &str) -> Result<Body, PersistError> {
    let snapshot: BodySnapshot = serde_json::from_str(json)?;
    if snapshot.version != SAVE_VERSION {
        return Err(PersistError::Version {
            found: snapshot.version,
        });
    }
    snapshot.body.validate()?;
    Ok(snapshot.body)
}

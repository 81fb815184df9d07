//! Configuration file path resolution (spec §6 "Path lookup: the file
//! resolver checks `./super.json`, then `./superface/super.json`,
//! optionally ascending up to a configured number of parent directories").

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{MapRuntimeError, Result, UnexpectedError};
use crate::value::{EnvSource, StdEnv};

use super::normalize::{normalize, NormalizedSuperDocument, NormalizeWarning};
use super::raw::RawSuperDocument;

const CANDIDATE_NAMES: [&str; 2] = ["super.json", "superface/super.json"];

/// Search `start_dir` and, if `max_ascend > 0`, its ancestors for a
/// super-document (spec §6). Returns the resolved path, or `None` if not
/// found within the bound.
pub async fn resolve_config_path(start_dir: &Path, max_ascend: u32) -> Option<PathBuf> {
    let mut dir = Some(start_dir.to_path_buf());
    let mut remaining = max_ascend;

    loop {
        let Some(current) = dir.as_ref() else { break };
        for name in CANDIDATE_NAMES {
            let candidate = current.join(name);
            if fs::metadata(&candidate).await.is_ok() {
                return Some(candidate);
            }
        }
        if remaining == 0 {
            break;
        }
        remaining -= 1;
        dir = current.parent().map(|p| p.to_path_buf());
    }
    None
}

/// Load, parse, and normalize the super-document found at `path` (spec §4.7,
/// §6). `env` defaults to the process environment.
pub async fn load_and_normalize(
    path: &Path,
    env: &dyn EnvSource,
) -> Result<(NormalizedSuperDocument, Vec<NormalizeWarning>)> {
    let content = fs::read_to_string(path).await?;
    let raw: RawSuperDocument = serde_json::from_str(&content)?;
    Ok(normalize(&raw, env))
}

/// Convenience: resolve the config path from `start_dir` and load it,
/// failing with a typed config error if none is found.
pub async fn load_from(start_dir: &Path, max_ascend: u32) -> Result<(NormalizedSuperDocument, Vec<NormalizeWarning>)> {
    let path = resolve_config_path(start_dir, max_ascend)
        .await
        .ok_or_else(|| {
            MapRuntimeError::Unexpected(UnexpectedError::Config(format!(
                "no super.json found under {} (searched up to {} parent directories)",
                start_dir.display(),
                max_ascend
            )))
        })?;
    load_and_normalize(&path, &StdEnv).await
}

//! Artifact extraction and location normalization.

use reqwest::Url;

use super::types::GenerationError;
use crate::remote::{MediaKind, RemoteArtifact, RemoteJobResult};

/// Make an artifact location absolute against the factory that produced it.
///
/// - `/path` is prefixed with the origin of `base_url`
/// - `//host/path` takes the scheme of `base_url`
/// - anything else is already absolute and is returned unchanged, query included
pub fn resolve_location(location: &str, base_url: &str) -> String {
    if !location.starts_with('/') {
        return location.to_string();
    }

    let Ok(base) = Url::parse(base_url) else {
        return location.to_string();
    };

    if location.starts_with("//") {
        format!("{}:{}", base.scheme(), location)
    } else {
        format!("{}{}", base.origin().ascii_serialization(), location)
    }
}

/// Find the artifact of `kind` in a completed job.
///
/// An `artifacts` entry whose type or mime type matches wins; otherwise the
/// first `output` entry is used.
pub fn extract_artifact(
    result: &RemoteJobResult,
    kind: MediaKind,
    base_url: &str,
) -> Result<String, GenerationError> {
    let location = result
        .artifacts()
        .iter()
        .find(|artifact| artifact.matches(kind))
        .and_then(RemoteArtifact::location)
        .or_else(|| result.output().first().and_then(RemoteArtifact::location))
        .ok_or(GenerationError::ArtifactNotFound { kind })?;

    Ok(resolve_location(location, base_url))
}

//! Manifest files on disk

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::{ManifestFormat, RawManifest};

/// Reads and parses a manifest, choosing TOML or YAML by extension
///
/// Parse failures keep their [`crate::domain::ResolveError`] in the error
/// chain so callers can report the structured kind.
pub fn load_manifest(path: &Path) -> Result<RawManifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    let format = ManifestFormat::from_path(path);
    debug!(path = %path.display(), ?format, "parsing manifest");

    RawManifest::parse(&content, format)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResolveError;
    use tempfile::TempDir;

    #[test]
    fn load_toml_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depplan.toml");
        fs::write(
            &path,
            "settings = [\"os\", \"compiler\", \"build_type\", \"arch\"]\n\
             requires = [\"qt/6.0.2\"]\n\
             generators = \"json\"\n",
        )
        .unwrap();

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.requirements.len(), 1);
        assert!(manifest.generators.contains("json"));
    }

    #[test]
    fn load_yaml_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depplan.yml");
        fs::write(
            &path,
            "settings: [os, compiler, build_type, arch]\nrequires:\n  - boost/1.74.0\n",
        )
        .unwrap();

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.requirements[0].spec().name, "boost");
    }

    #[test]
    fn malformed_manifest_keeps_kind_in_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depplan.toml");
        fs::write(
            &path,
            "settings = [\"os\", \"compiler\", \"build_type\", \"arch\"]\nrequires = [\"qt\"]\n",
        )
        .unwrap();

        let err = load_manifest(&path).unwrap_err();
        let kind = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ResolveError>())
            .map(ResolveError::kind);
        assert_eq!(kind, Some("malformed_manifest"));
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_manifest(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }
}

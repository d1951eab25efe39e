//! Candidate file discovery.
//!
//! Walks the configured source roots, keeps files with a supported
//! extension and prunes everything matching the exclusion pattern before
//! any work unit is created.

use std::path::PathBuf;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Result;
use crate::include::InclusionSpec;

/// Collect all candidate source files, sorted for deterministic dispatch
/// order.
pub fn collect_files(config: &Config, spec: &InclusionSpec) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for source_dir in &config.source_dirs {
        let source_dir = config.project_root.join(source_dir);
        if !source_dir.exists() {
            warn!(?source_dir, "Source directory does not exist, skipping");
            continue;
        }

        for entry in WalkDir::new(&source_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !spec.is_excluded(e.path()))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file()
                && let Some(ext) = path.extension().and_then(|e| e.to_str())
                && config.is_supported(ext)
            {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!(count = files.len(), "Collected candidate files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_for(root: &std::path::Path) -> Config {
        Config {
            project_root: root.to_path_buf(),
            source_dirs: vec![PathBuf::from("src")],
            ..Config::default()
        }
    }

    #[test]
    fn test_collects_supported_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/A.kt"), "val a = 1\n").unwrap();
        fs::write(dir.path().join("src/B.kts"), "val b = 2\n").unwrap();
        fs::write(dir.path().join("src/readme.md"), "nope\n").unwrap();

        let config = config_for(dir.path());
        let spec = InclusionSpec::default();
        let files = collect_files(&config, &spec).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| {
            let ext = f.extension().unwrap().to_str().unwrap();
            ext == "kt" || ext == "kts"
        }));
    }

    #[test]
    fn test_prunes_excluded_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/build/generated")).unwrap();
        fs::write(dir.path().join("src/A.kt"), "val a = 1\n").unwrap();
        fs::write(dir.path().join("src/build/generated/Gen.kt"), "val g = 1\n").unwrap();

        let config = config_for(dir.path());
        let spec = InclusionSpec::new("", Some(config.exclusion_regex().unwrap()));
        let files = collect_files(&config, &spec).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/A.kt"));
    }

    #[test]
    fn test_missing_source_dir_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let spec = InclusionSpec::default();
        assert!(collect_files(&config, &spec).unwrap().is_empty());
    }
}

//! Phase 1: Overlay
//!
//! Exports every segment path of a host into one directory, in overlay
//! order, so that more specific segments overwrite files of more general
//! ones. Segment paths that do not exist at the revision contribute nothing.
//!
//! Each segment may carry `RPM_REQUIRES` and `RPM_PROVIDES` at its root or
//! in its `VARIABLES/` directory. Both are folded into the host's
//! [`DependencyBuckets`] right after the segment is exported and removed
//! from the merged tree, so that a general segment's list never shadows or
//! leaks into a specific one.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::BuildContext;
use crate::defaults::VARIABLES_DIR;
use crate::dependency::{DependencyBuckets, DependencySet};
use crate::error::Result;
use crate::overlay::overlay_segment_paths;

pub const REQUIRES_FILE: &str = "RPM_REQUIRES";
pub const PROVIDES_FILE: &str = "RPM_PROVIDES";

/// Output of the overlay phase.
#[derive(Debug, Clone, Default)]
pub struct MergedTree {
    pub dependencies: DependencyBuckets,
    /// Segment paths that existed and were exported, in order.
    pub overlaying: Vec<String>,
}

/// Execute Phase 1: export all segment paths of `hostname` into `root`.
pub fn execute(
    hostname: &str,
    revision: &str,
    ctx: &BuildContext,
    root: &Path,
) -> Result<MergedTree> {
    let mut merged = MergedTree::default();
    let segment_settings = ctx.settings.segment_settings();

    for (segment, path) in overlay_segment_paths(hostname, &segment_settings) {
        match ctx.exporter.export(&path, root, revision) {
            Ok(files) => {
                debug!(
                    "{}: exported {} files from {} ({})",
                    hostname,
                    files.len(),
                    path,
                    segment
                );
                merged.overlaying.push(path);
            }
            Err(e) if e.is_path_not_found() => {
                debug!("{}: {} does not exist at {}", hostname, path, revision);
                continue;
            }
            Err(e) => return Err(e),
        }

        take_dependency_files(root, &mut merged.dependencies)?;
    }

    info!(
        "{}: merged {} of {} segment paths",
        hostname,
        merged.overlaying.len(),
        overlay_segment_paths(hostname, &segment_settings).len()
    );
    Ok(merged)
}

/// Consume the dependency files a segment left in `root`, root level first.
fn take_dependency_files(root: &Path, buckets: &mut DependencyBuckets) -> Result<()> {
    let variables = root.join(VARIABLES_DIR);
    for dir in [root, variables.as_path()] {
        take_dependency_file(&dir.join(REQUIRES_FILE), &mut buckets.requires)?;
        take_dependency_file(&dir.join(PROVIDES_FILE), &mut buckets.provides)?;
    }
    Ok(())
}

/// Fold a dependency file into `set` and remove it.
fn take_dependency_file(path: &Path, set: &mut DependencySet) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    for line in fs::read_to_string(path)?.lines() {
        set.add(line);
    }
    fs::remove_file(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::error::Error;
    use crate::export::{ExportedFile, TreeExporter};
    use crate::host::StaticLookup;
    use crate::phases::test_support::context as source_context;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records export calls and serves dependency files for some paths.
    struct MockExporter {
        calls: Mutex<Vec<String>>,
        existing: Vec<(&'static str, &'static str, &'static str)>,
        fail_on: Option<&'static str>,
    }

    impl TreeExporter for MockExporter {
        fn export(
            &self,
            source_path: &str,
            destination: &Path,
            revision: &str,
        ) -> Result<Vec<ExportedFile>> {
            self.calls.lock().unwrap().push(source_path.to_string());
            if self.fail_on == Some(source_path) {
                return Err(Error::Export {
                    command: "svn export".to_string(),
                    path: source_path.to_string(),
                    stderr: "authorization failed".to_string(),
                });
            }
            let files: Vec<_> = self
                .existing
                .iter()
                .filter(|(path, _, _)| *path == source_path)
                .collect();
            if files.is_empty() {
                return Err(Error::PathNotFound {
                    path: source_path.to_string(),
                    revision: revision.to_string(),
                });
            }
            let mut exported = Vec::new();
            for (_, name, content) in files {
                fs::write(destination.join(name), content)?;
                exported.push(ExportedFile {
                    source_path: format!("{}/{}", source_path, name),
                    relative_path: PathBuf::from(name),
                });
            }
            Ok(exported)
        }
    }

    fn context(exporter: Arc<MockExporter>, settings: Settings) -> BuildContext {
        BuildContext::new(
            settings,
            exporter,
            Arc::new(StaticLookup::new()),
            "work",
            "out",
        )
    }

    fn mock(
        existing: Vec<(&'static str, &'static str, &'static str)>,
        fail_on: Option<&'static str>,
    ) -> Arc<MockExporter> {
        Arc::new(MockExporter {
            calls: Mutex::new(Vec::new()),
            existing,
            fail_on,
        })
    }

    #[test]
    fn test_overlay_calls_exporter_in_order() {
        let dir = TempDir::new().unwrap();
        let exporter = mock(vec![("all", "motd", "x"), ("loc/ber", "ntp.conf", "y")], None);
        let settings = Settings {
            production_locations: vec!["ber".to_string()],
            ..Settings::default()
        };
        let ctx = context(exporter.clone(), settings);

        let merged = execute("berweb01", "7", &ctx, dir.path()).unwrap();
        assert_eq!(merged.overlaying, vec!["all", "loc/ber"]);
        assert_eq!(
            *exporter.calls.lock().unwrap(),
            vec![
                "all",
                "typ/web",
                "loc/pro",
                "loc/ber",
                "loctyp/proweb",
                "loctyp/berweb",
                "host/berweb01"
            ]
        );
    }

    #[test]
    fn test_overlay_accumulates_requires_and_collapses_provides() {
        let dir = TempDir::new().unwrap();
        let exporter = mock(
            vec![
                ("all", REQUIRES_FILE, "httpd\nbash"),
                ("all", PROVIDES_FILE, "config = 1"),
                ("typ/web", REQUIRES_FILE, "httpd > 4, bash"),
                ("host/berweb01", PROVIDES_FILE, "config = 2"),
            ],
            None,
        );
        let ctx = context(exporter, Settings::default());

        let merged = execute("berweb01", "HEAD", &ctx, dir.path()).unwrap();
        let deps = &merged.dependencies;
        assert_eq!(deps.requires.get("httpd").as_deref(), Some("httpd, httpd > 4"));
        assert_eq!(deps.requires.get("bash").as_deref(), Some("bash"));
        assert_eq!(deps.provides.get("config").as_deref(), Some("config = 2"));
        assert!(!dir.path().join(REQUIRES_FILE).exists());
        assert!(!dir.path().join(PROVIDES_FILE).exists());
    }

    #[test]
    fn test_overlay_consumes_dependency_files_in_variables() {
        let source = TempDir::new().unwrap();
        let files: &[(&str, &str)] = &[
            ("all/VARIABLES/RPM_REQUIRES", "bash\n"),
            ("all/VARIABLES/DOMAIN", "example.com\n"),
            ("typ/web/VARIABLES/RPM_REQUIRES", "httpd\n"),
            ("typ/web/VARIABLES/RPM_PROVIDES", "webserver\n"),
        ];
        for (path, content) in files {
            let full = source.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let work = TempDir::new().unwrap();
        let ctx = source_context(source.path(), work.path(), Settings::default());
        let root = work.path().join("tree");
        fs::create_dir_all(&root).unwrap();

        let merged = execute("berweb01", "HEAD", &ctx, &root).unwrap();
        let deps = &merged.dependencies;
        assert_eq!(deps.requires.render(), "bash, httpd");
        assert_eq!(deps.provides.render(), "webserver");
        assert!(!root.join(VARIABLES_DIR).join(REQUIRES_FILE).exists());
        assert!(!root.join(VARIABLES_DIR).join(PROVIDES_FILE).exists());
        assert!(root.join(VARIABLES_DIR).join("DOMAIN").exists());
    }

    #[test]
    fn test_build_host_tree_writes_requires_from_variables() {
        let source = TempDir::new().unwrap();
        for (path, content) in [
            ("all/VARIABLES/RPM_REQUIRES", "bash\n"),
            ("typ/web/VARIABLES/RPM_REQUIRES", "httpd\n"),
        ] {
            let full = source.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let work = TempDir::new().unwrap();
        let ctx = source_context(source.path(), work.path(), Settings::default());

        let tree = crate::phases::build_host_tree("berweb01", "HEAD", &ctx).unwrap();
        assert_eq!(tree.dependencies.requires.render(), "bash, httpd");
        assert_eq!(
            fs::read_to_string(tree.variables_dir.join(REQUIRES_FILE)).unwrap(),
            "bash, httpd\n"
        );
    }

    #[test]
    fn test_overlay_propagates_export_failures() {
        let dir = TempDir::new().unwrap();
        let exporter = mock(vec![("all", "motd", "x")], Some("typ/web"));
        let ctx = context(exporter, Settings::default());

        let err = execute("berweb01", "HEAD", &ctx, dir.path()).unwrap_err();
        assert!(matches!(err, Error::Export { .. }));
    }
}

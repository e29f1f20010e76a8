//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a source tree fixture with a matching settings file,
//! so tests can build hosts without a Subversion server.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_standard_source();
//!     fixture.command().arg("build").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::sources;
    pub use super::TestFixture;
}

/// Source tree snippets, as `(path, content)` pairs below the source root.
#[allow(dead_code)]
pub mod sources {
    /// A small source tree touching every overlay segment.
    pub const STANDARD: &[(&str, &str)] = &[
        ("all/etc/motd", "Welcome\n"),
        ("all/etc/resolv.conf", "search @@@DOMAIN@@@\n"),
        ("all/VARIABLES/DOMAIN", "example.com\n"),
        ("all/RPM_REQUIRES", "bash\ncoreutils\n"),
        ("typ/web/etc/httpd/httpd.conf", "ServerName @@@HOST@@@.@@@DOMAIN@@@\n"),
        ("typ/web/RPM_REQUIRES", "httpd >= 2.4\n"),
        ("loc/ber/etc/ntp.conf", "server ntp.@@@LOC@@@.@@@DOMAIN@@@\n"),
        ("loctyp/proweb/etc/app.conf", "env=production\n"),
        ("host/berweb01/etc/motd", "Host @@@HOST@@@ (@@@TYP@@@ #@@@SHORT_HOSTNR@@@)\n"),
    ];

    /// A tree whose `fraweb01` host references an undefined token.
    pub const BROKEN_FRA: &[(&str, &str)] = &[
        ("all/etc/motd", "@@@HOST@@@\n"),
        ("loc/fra/etc/broken.conf", "@@@UNDEFINED@@@\n"),
    ];
}

/// A test fixture that provides a temporary directory holding a source tree
/// below `source/` and a `hostconf.yaml` settings file pointing at it.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_source(sources::STANDARD)
///     .with_settings(&["berweb01"], "production_locations: [ber]\n");
///
/// fixture.command().arg("build").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add source files below `source/`.
    pub fn with_source(self, files: &[(&str, &str)]) -> Self {
        for (path, content) in files {
            self.temp_dir
                .child("source")
                .child(path)
                .write_str(content)
                .expect("Failed to write source file");
        }
        self
    }

    /// Add the standard source tree with settings for `berweb01` and
    /// `fraweb01`, where `ber` is a production location.
    pub fn with_standard_source(self) -> Self {
        self.with_source(sources::STANDARD).with_settings(
            &["berweb01", "fraweb01"],
            "production_locations: [ber]\nrepo_packages: \"^httpd\"\n",
        )
    }

    /// Write `hostconf.yaml` with a local source, the given hosts and any
    /// extra YAML lines.
    pub fn with_settings(self, hosts: &[&str], extra: &str) -> Self {
        let content = format!(
            "source:\n  local: {}\nhosts: [{}]\nthreads: 2\n{}",
            self.source_path().display(),
            hosts.join(", "),
            extra
        );
        self.with_file("hostconf.yaml", &content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a binary file with the given path and content.
    pub fn with_binary_file(self, path: &str, content: &[u8]) -> Self {
        self.temp_dir
            .child(path)
            .write_binary(content)
            .expect("Failed to write binary file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the source tree.
    pub fn source_path(&self) -> PathBuf {
        self.temp_dir.path().join("source")
    }

    /// Get the path to the output directory used by [`TestFixture::command`].
    pub fn output_path(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file of the built tree of `host`.
    pub fn read_output(&self, host: &str, tree: &str, path: &str) -> String {
        std::fs::read_to_string(self.output_path().join(host).join(tree).join(path))
            .expect("Failed to read output file")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command running in this fixture's directory, with the work
    /// directory kept inside the fixture and colors disabled.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hostconf");
        cmd.current_dir(self.path())
            .env("HOSTCONF_WORK_DIR", self.path().join("work"))
            .env_remove("HOSTCONF_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_writes_source_and_settings() {
        let fixture = TestFixture::new().with_standard_source();
        assert!(fixture.source_path().join("all/etc/motd").exists());
        assert!(fixture.path().join("hostconf.yaml").exists());
    }

    #[test]
    fn test_settings_are_valid() {
        let fixture = TestFixture::new().with_standard_source();
        let settings = hostconf::config::from_file(fixture.path().join("hostconf.yaml"))
            .expect("Settings should parse");
        assert_eq!(settings.hosts, vec!["berweb01", "fraweb01"]);
    }
}

//! Shared test utilities for accmerge tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use accmerge::config::MergeConfig;

/// Test environment with source, destination and output directories.
pub struct TestEnv {
    /// Temporary directory (kept alive for the lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Source database directory
    pub source: PathBuf,
    /// Destination database directory
    pub dest: PathBuf,
    /// Output directory (not created up front; the writer creates it)
    pub output: PathBuf,
}

impl TestEnv {
    /// Create a new test environment.
    ///
    /// Pins the destination's id ranges to the stock 1000..=60000 via its
    /// own login.defs, so tests never depend on the host's /etc/login.defs.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let source = base.join("source");
        let dest = base.join("dest");
        let output = base.join("output");

        fs::create_dir_all(&source).expect("Failed to create source dir");
        fs::create_dir_all(&dest).expect("Failed to create dest dir");
        fs::write(
            dest.join("login.defs"),
            "UID_MIN 1000\nUID_MAX 60000\nGID_MIN 1000\nGID_MAX 60000\n",
        )
        .expect("Failed to write login.defs");

        Self {
            _temp_dir: temp_dir,
            source,
            dest,
            output,
        }
    }

    /// A config merging source into dest with every option at its default.
    pub fn config(&self) -> MergeConfig {
        MergeConfig {
            source_dir: self.source.clone(),
            dest_dir: self.dest.clone(),
            output_dir: self.output.clone(),
            source_users: String::new(),
            source_groups: String::new(),
            dest_users: String::new(),
            dest_groups: String::new(),
            restricted: false,
            relay_password: None,
            quiet: true,
            read_shadow: true,
            defs: None,
            report: None,
        }
    }
}

/// Write all four database files into a directory.
pub fn write_db(dir: &Path, passwd: &str, group: &str, shadow: &str, gshadow: &str) {
    fs::write(dir.join("passwd"), passwd).expect("Failed to write passwd");
    fs::write(dir.join("group"), group).expect("Failed to write group");
    fs::write(dir.join("shadow"), shadow).expect("Failed to write shadow");
    fs::write(dir.join("gshadow"), gshadow).expect("Failed to write gshadow");
}

/// Read one file from the output directory.
pub fn read_output(env: &TestEnv, name: &str) -> String {
    let path = env.output.join(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Assert that a file contains an exact line.
pub fn assert_has_line(content: &str, expected: &str) {
    assert!(
        content.lines().any(|l| l == expected),
        "Expected line not found.\nExpected: {}\nContent:\n{}",
        expected,
        content
    );
}

/// Assert that no line of a file mentions a name.
pub fn assert_no_line_with(content: &str, needle: &str) {
    assert!(
        !content.lines().any(|l| l.contains(needle)),
        "Found unexpected '{}' in:\n{}",
        needle,
        content
    );
}

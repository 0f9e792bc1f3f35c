//! Shared process-level test harness for the `forge` binary.

use std::path::PathBuf;

use assert_cmd::assert::Assert;
use assert_cmd::Command;

pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join(".forge")
    }

    /// A fresh `forge` invocation rooted at this project's own data dir.
    pub fn forge(&self) -> Command {
        let mut cmd = Command::cargo_bin("forge").expect("forge binary");
        cmd.current_dir(self.dir.path());
        cmd
    }
}

/// A bare `forge` invocation with no project context, for `--help`/`--version`.
pub fn cli() -> Command {
    Command::cargo_bin("forge").expect("forge binary")
}

pub trait AssertExt {
    fn stdout_has(self, needle: &str) -> Assert;
}

impl AssertExt for Assert {
    fn stdout_has(self, needle: &str) -> Assert {
        let output = self.get_output().stdout.clone();
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains(needle), "expected stdout to contain {needle:?}, got:\n{text}");
        self
    }
}

pub trait CommandExt {
    fn passes(&mut self) -> Assert;
    fn fails(&mut self) -> Assert;
}

impl CommandExt for Command {
    fn passes(&mut self) -> Assert {
        self.assert().success()
    }

    fn fails(&mut self) -> Assert {
        self.assert().failure()
    }
}

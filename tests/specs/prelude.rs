//! Shared helpers for black-box specs

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch project directory
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent dirs
    pub fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("vigil.toml")
    }

    /// `vigild` running in the project dir with database env cleared
    pub fn vigild(&self) -> Cli {
        let mut cmd = Command::cargo_bin("vigild").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("DATABASE_URL")
            .env_remove("DB_HOST")
            .env("RUST_LOG", "warn");
        Cli { cmd }
    }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> Run {
        Run {
            assert: self.cmd.assert().success(),
        }
    }

    pub fn fails(mut self) -> Run {
        Run {
            assert: self.cmd.assert().failure(),
        }
    }
}

pub struct Run {
    assert: assert_cmd::assert::Assert,
}

impl Run {
    pub fn stdout_has(self, needle: &str) -> Self {
        Self {
            assert: self.assert.stdout(predicate::str::contains(needle)),
        }
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        Self {
            assert: self.assert.stderr(predicate::str::contains(needle)),
        }
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.assert.get_output().stdout).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).unwrap()
    }
}

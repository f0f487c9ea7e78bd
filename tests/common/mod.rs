#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch workspace with `results.jsonl`, `labels/` and `images/`.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("labels")).unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::create_dir(dir.path().join("home")).unwrap();
        Self { dir }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn label(&self, name: &str, content: &str) -> PathBuf {
        self.write(&format!("labels/{name}"), content)
    }

    pub fn predictions<S: AsRef<str>>(&self, lines: &[S]) -> PathBuf {
        let lines: Vec<&str> = lines.iter().map(AsRef::as_ref).collect();
        self.write("results.jsonl", &lines.join("\n"))
    }

    pub fn read_json(&self, rel: &str) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(self.path(rel)).unwrap()).unwrap()
    }

    /// The binary, isolated from the user's config, color and log settings.
    pub fn podorders(&self) -> Command {
        let home = self.path("home");
        let mut cmd = Command::cargo_bin("podorders").unwrap();
        cmd.current_dir(self.dir.path())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("PODORDERS_CONFIG")
            .env_remove("PODORDERS_LOG")
            .env_remove("NO_COLOR");
        cmd
    }

    /// `podorders orders` with every required path pointing into the workspace.
    pub fn orders(&self) -> Command {
        let mut cmd = self.podorders();
        cmd.arg("orders")
            .arg("--predictions")
            .arg(self.path("results.jsonl"))
            .arg("--labels-dir")
            .arg(self.path("labels"))
            .arg("--output")
            .arg(self.path("site/data_orders.json"));
        cmd
    }
}

pub fn all_pass(name: &str) -> String {
    format!(
        r#"{{"image_name": "{name}", "parsed": {{"step1_valid_pod": 1, "step2_has_package": 1, "step3_not_in_mailbox": 1, "step4_valid_location": 1}}}}"#
    )
}

pub fn mailbox(name: &str) -> String {
    format!(
        r#"{{"image_name": "{name}", "parsed": {{"step1_valid_pod": 1, "step2_has_package": 1, "step3_not_in_mailbox": 0, "step4_valid_location": 1}}}}"#
    )
}

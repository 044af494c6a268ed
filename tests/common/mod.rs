#![allow(dead_code)]

pub mod backend;
pub mod server;

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn leadboard_binary() -> &'static str {
    env!("CARGO_BIN_EXE_leadboard")
}

/// Helper struct to run leadboard commands in an isolated temp directory
pub struct LeadboardTest {
    pub temp_dir: TempDir,
    envs: Vec<(String, String)>,
}

impl LeadboardTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        LeadboardTest {
            temp_dir,
            envs: Vec::new(),
        }
    }

    /// Set an extra environment variable for every command run.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(".leadboard").join("config.yaml")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        let mut command = Command::new(leadboard_binary());
        command
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("LEADBOARD_CONFIG", self.config_path())
            .env_remove("LEADBOARD_ROOT")
            .env_remove("LEADBOARD_BASE_URL")
            .env_remove("LEADBOARD_TOKEN")
            .env_remove("LEADBOARD_LOG")
            .env("NO_PROXY", "127.0.0.1,localhost")
            .env("NO_COLOR", "1");
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command.output().expect("Failed to execute leadboard command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn write_config(&self, content: &str) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().expect("config path has a parent"))
            .expect("Failed to create .leadboard directory");
        fs::write(path, content).expect("Failed to write config file");
    }

    pub fn read_config(&self) -> Option<String> {
        fs::read_to_string(self.config_path()).ok()
    }
}

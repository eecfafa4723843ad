use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone)]
pub struct TestContext {
    pub bin_path: PathBuf,
    pub tmp_root: PathBuf,
}

/// An isolated HOME plus an empty repository directory
pub struct TestEnv {
    pub repo: PathBuf,
    pub home: PathBuf,
    pub xdg_config: PathBuf,
}

pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestContext {
    pub fn new() -> Result<Self, String> {
        let bin_path = match std::env::var_os("CARGO_BIN_EXE_day0guard") {
            Some(path) => PathBuf::from(path),
            None => built_binary()?,
        };

        let tmp_root = std::env::temp_dir().join("day0guard-e2e");
        fs::create_dir_all(&tmp_root).map_err(|e| format!("Failed to create temp root: {}", e))?;

        Ok(Self { bin_path, tmp_root })
    }

    pub fn create_env(&self, name: &str) -> Result<TestEnv, String> {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_nanos();
        let dir = self.tmp_root.join(format!("{}-{}-{}", name, nanos, counter));

        let env = TestEnv {
            repo: dir.join("repo"),
            home: dir.join("home"),
            xdg_config: dir.join("home").join(".config"),
        };
        for path in [&env.repo, &env.xdg_config] {
            fs::create_dir_all(path)
                .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        }
        Ok(env)
    }

    /// Run the binary with the environment's HOME and no ambient credentials
    pub fn run_day0guard(
        &self,
        env: &TestEnv,
        args: &[&str],
        cwd: &Path,
    ) -> Result<CommandOutput, String> {
        if std::env::var("DAY0GUARD_E2E_LOG").is_ok() {
            eprintln!("command: day0guard {:?} (cwd: {})", args, cwd.display());
        }
        let output = Command::new(&self.bin_path)
            .args(args)
            .current_dir(cwd)
            .env("HOME", &env.home)
            .env("XDG_CONFIG_HOME", &env.xdg_config)
            .env_remove("GITHUB_TOKEN")
            .env_remove("GITHUB_API_URL")
            .env_remove("RUST_LOG")
            .output()
            .map_err(|e| format!("Failed to run day0guard: {}", e))?;

        Ok(CommandOutput::from_output(output))
    }
}

/// Fall back to a debug build when not run through `cargo test`
fn built_binary() -> Result<PathBuf, String> {
    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| "CARGO_MANIFEST_DIR not set".to_string())?;
    let candidate = manifest_dir.join("target").join("debug").join("day0guard");
    if candidate.exists() {
        return Ok(candidate);
    }
    let status = Command::new("cargo")
        .arg("build")
        .current_dir(&manifest_dir)
        .status()
        .map_err(|e| format!("Failed to run cargo build: {}", e))?;
    if !status.success() {
        return Err("cargo build failed".to_string());
    }
    Ok(candidate)
}

impl TestEnv {
    /// Write a file relative to the repository root
    pub fn write(&self, rel: &str, content: &str) -> Result<(), String> {
        write_file(&self.repo.join(rel), content)
    }

    /// Write the default config file
    pub fn write_config(&self, json: &str) -> Result<(), String> {
        write_file(&self.xdg_config.join("day0guard").join("config.json"), json)
    }
}

impl CommandOutput {
    pub fn from_output(output: Output) -> Self {
        Self {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    pub fn assert_exit(&self, code: i32) -> Result<(), String> {
        if self.status == code {
            Ok(())
        } else {
            Err(format!(
                "Expected exit {}, got {}.\nstdout: {}\nstderr: {}",
                code, self.status, self.stdout, self.stderr
            ))
        }
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> Result<(), String> {
        if self.stdout.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stdout to contain '{}'.\nstdout: {}",
                needle, self.stdout
            ))
        }
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> Result<(), String> {
        if self.stderr.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stderr to contain '{}'.\nstderr: {}",
                needle, self.stderr
            ))
        }
    }

    /// Parse stdout as the JSON check outcome
    pub fn json(&self) -> Result<serde_json::Value, String> {
        serde_json::from_str(&self.stdout)
            .map_err(|e| format!("Invalid JSON output: {}\nstdout: {}", e, self.stdout))
    }

    /// Assert the JSON outcome's conclusion
    pub fn assert_conclusion(&self, expected: &str) -> Result<serde_json::Value, String> {
        let json = self.json()?;
        if json["conclusion"] == expected {
            Ok(json)
        } else {
            Err(format!("Expected {} conclusion, got: {}", expected, json))
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent dirs: {}", e))?;
    }
    fs::write(path, content).map_err(|e| format!("Failed to write file: {}", e))
}

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use emcc_pack_contracts::{EMCC_ARGS_ENV, EMCC_ENV, PACKER_DIR_ENV, WASM_PACK_ENV};

use crate::error::{PackError, Result};

/// External programs the pipeline delegates to.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub emcc: OsString,
    /// Appended to every compiler invocation (`EMCC_PACK_EMCC_ARGS`).
    pub emcc_extra_args: Vec<String>,
    pub wasm_pack: OsString,
    /// The `wasm-bindgen` crate that embeds the compiled binary.
    pub packer_dir: PathBuf,
}

impl Toolchain {
    pub fn from_env() -> Self {
        let emcc = std::env::var_os(EMCC_ENV).unwrap_or_else(|| OsString::from("emcc"));
        let emcc_args = std::env::var(EMCC_ARGS_ENV).unwrap_or_default();
        let wasm_pack =
            std::env::var_os(WASM_PACK_ENV).unwrap_or_else(|| OsString::from("wasm-pack"));
        let packer_dir = std::env::var_os(PACKER_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_packer_dir);

        Toolchain {
            emcc,
            emcc_extra_args: split_extra_args(&emcc_args),
            wasm_pack,
            packer_dir,
        }
    }
}

fn default_packer_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("packer")
}

fn split_extra_args(raw: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    raw.split_whitespace()
        .filter(|tok| seen.insert(*tok))
        .map(str::to_string)
        .collect()
}

/// One external process invocation with inherited stdio.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(&'static str, OsString)>,
    cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn env(mut self, key: &'static str, value: impl Into<OsString>) -> Self {
        self.envs.push((key, value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Runs to completion; a non-zero exit becomes [`PackError::ToolFailed`].
    pub fn run(&self) -> Result<()> {
        let tool = self.program.to_string_lossy().into_owned();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        tracing::debug!(argv = ?self.argv(), "spawn {tool}");
        let status = cmd
            .status()
            .map_err(|source| PackError::Spawn {
                tool: tool.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(PackError::ToolFailed { tool, status })
        }
    }
}

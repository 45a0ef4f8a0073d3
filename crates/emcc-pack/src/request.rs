use std::collections::HashSet;
use std::path::{Path, PathBuf};

use emcc_pack_contracts::{OUT_DIR_NAME, PROJECT_MANIFEST_FILE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PackError, Result};

/// Switches that distinguish the pipeline variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// Leave the binding binary as `.wasm` for the bundler instead of fetching
    /// a disguised asset at runtime.
    pub inline_binary: bool,
    pub thread_support: bool,
    pub simd_support: bool,
}

/// Identity of the consuming package, as written into the synthesized manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub collaborators: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    collaborators: Vec<String>,
    author: Option<Value>,
}

impl PackageInfo {
    /// Reads `package.json` from the project directory.
    ///
    /// `name` is required unless `fallback_name` is given; `version` defaults to `0.0.0`.
    /// Collaborators come from `collaborators`, or from `author` when that is absent.
    pub fn from_project(project_dir: &Path, fallback_name: Option<&str>) -> Result<Self> {
        let path = project_dir.join(PROJECT_MANIFEST_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackError::Project {
                    path,
                    detail: "project manifest not found (run inside a package directory)"
                        .to_string(),
                });
            }
            Err(err) => return Err(PackError::fs("read project manifest", path, err)),
        };
        let manifest: ProjectManifest =
            serde_json::from_slice(&bytes).map_err(|err| PackError::Project {
                path: path.clone(),
                detail: format!("invalid JSON: {err}"),
            })?;

        let name = match (manifest.name, fallback_name) {
            (Some(name), _) if !name.trim().is_empty() => name,
            (_, Some(fallback)) => fallback.to_string(),
            _ => {
                return Err(PackError::Project {
                    path,
                    detail: "missing \"name\" (or pass --wasmname)".to_string(),
                });
            }
        };

        let mut collaborators = manifest.collaborators;
        if collaborators.is_empty() {
            match manifest.author {
                Some(Value::String(author)) => collaborators.push(author),
                Some(Value::Object(obj)) => {
                    if let Some(author) = obj.get("name").and_then(Value::as_str) {
                        collaborators.push(author.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(PackageInfo {
            name,
            version: manifest.version.unwrap_or_else(|| "0.0.0".to_string()),
            collaborators,
        })
    }
}

/// Immutable configuration for one packaging run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    exports: Vec<String>,
    include_dirs: Vec<PathBuf>,
    config: PipelineConfig,
    base_name: String,
    package: PackageInfo,
    project_dir: PathBuf,
    out_dir: PathBuf,
    trailing_args: Vec<String>,
}

pub struct BuildRequestBuilder {
    exports: Vec<String>,
    include_dirs: Vec<PathBuf>,
    config: PipelineConfig,
    base_name: Option<String>,
    package: PackageInfo,
    project_dir: PathBuf,
    trailing_args: Vec<String>,
}

impl BuildRequest {
    pub fn builder(project_dir: impl Into<PathBuf>, package: PackageInfo) -> BuildRequestBuilder {
        BuildRequestBuilder {
            exports: Vec::new(),
            include_dirs: Vec::new(),
            config: PipelineConfig::default(),
            base_name: None,
            package,
            project_dir: project_dir.into(),
            trailing_args: Vec::new(),
        }
    }

    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn package(&self) -> &PackageInfo {
        &self.package
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn trailing_args(&self) -> &[String] {
        &self.trailing_args
    }
}

impl BuildRequestBuilder {
    /// Adds exported symbols; each entry may itself be a comma-separated list.
    pub fn exports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in names {
            self.exports.extend(
                raw.as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        self
    }

    pub fn include_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_dirs.extend(dirs);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_name(mut self, name: Option<String>) -> Self {
        self.base_name = name;
        self
    }

    pub fn trailing_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.trailing_args.extend(args);
        self
    }

    pub fn build(self) -> Result<BuildRequest> {
        let mut seen: HashSet<&str> = HashSet::new();
        let exports: Vec<String> = self
            .exports
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();
        if exports.is_empty() {
            return Err(PackError::Config(
                "require --exports argument (comma-separated function names)".to_string(),
            ));
        }

        let base_name = match self.base_name {
            Some(name) => name.trim().to_string(),
            None => default_base_name(&self.package.name),
        };
        if base_name.is_empty() || base_name.contains(['/', '\\']) {
            return Err(PackError::Config(format!(
                "invalid output base name: {base_name:?}"
            )));
        }

        let out_dir = self.project_dir.join(OUT_DIR_NAME);
        Ok(BuildRequest {
            exports,
            include_dirs: self.include_dirs,
            config: self.config,
            base_name,
            package: self.package,
            project_dir: self.project_dir,
            out_dir,
            trailing_args: self.trailing_args,
        })
    }
}

/// Package name without its `@scope/` prefix.
fn default_base_name(package_name: &str) -> String {
    package_name
        .rsplit('/')
        .next()
        .unwrap_or(package_name)
        .trim()
        .to_string()
}

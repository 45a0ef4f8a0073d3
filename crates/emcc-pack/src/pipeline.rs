use std::collections::BTreeMap;
use std::path::Path;

use emcc_pack_contracts::EMCC_PACK_REPORT_SCHEMA_VERSION;
use serde::Serialize;

use crate::artifacts::{ArtifactRole, ArtifactSet};
use crate::compile;
use crate::error::{PackError, Result};
use crate::fsutil;
use crate::repack;
use crate::request::{BuildRequest, PipelineConfig};
use crate::synth;
use crate::toolchain::Toolchain;

/// Machine-readable summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub schema_version: &'static str,
    pub ok: bool,
    pub name: String,
    pub base_name: String,
    pub version: String,
    pub config: PipelineConfig,
    pub out_dir: String,
    pub compiler_argv: Vec<String>,
    pub generator_argv: Vec<String>,
    pub artifacts: BTreeMap<ArtifactRole, String>,
    pub files: Vec<String>,
}

impl PackReport {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| PackError::fs("encode report", path, e.into()))?;
        bytes.push(b'\n');
        write_report(path, &bytes)
    }
}

/// Writes an encoded report, creating missing parent directories.
pub fn write_report(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| PackError::fs("create report dir", parent, e))?;
    }
    fsutil::write_atomic_next_to(path, bytes)
}

/// Runs both stages and synthesizes the package files.
///
/// Nothing external runs unless the request is valid, and each stage starts only
/// after the previous one has produced its outputs.
pub fn pack(req: &BuildRequest, toolchain: &Toolchain) -> Result<PackReport> {
    let config = req.config();
    let artifacts = ArtifactSet::new(req.out_dir(), req.base_name());

    compile::ensure_out_dir(&artifacts)?;

    let compiler = compile::compiler_invocation(req, &artifacts, toolchain);
    compile::run_compiler(req, &artifacts, &compiler)?;

    let generator = repack::generator_invocation(req, &artifacts, toolchain);
    repack::run_generator(req, &artifacts, &generator)?;

    synth::write_all(req.package(), &artifacts, config)?;

    let files = artifacts.published_files(config);
    let mut paths = BTreeMap::new();
    for role in ArtifactSet::published_roles(config)
        .iter()
        .copied()
        .chain([ArtifactRole::Manifest])
    {
        paths.insert(role, artifacts.path(role).display().to_string());
    }

    tracing::debug!(files = ?files, "package complete");
    Ok(PackReport {
        schema_version: EMCC_PACK_REPORT_SCHEMA_VERSION,
        ok: true,
        name: req.package().name.clone(),
        base_name: req.base_name().to_string(),
        version: req.package().version.clone(),
        config,
        out_dir: artifacts.out_dir().display().to_string(),
        compiler_argv: compiler.argv(),
        generator_argv: generator.argv(),
        artifacts: paths,
        files,
    })
}

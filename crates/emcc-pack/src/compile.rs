//! Compiler invocation stage: native sources to `_api.js` + `_api.wasm`.

use crate::artifacts::{ArtifactRole, ArtifactSet};
use crate::error::{PackError, Result};
use crate::request::BuildRequest;
use crate::toolchain::{Invocation, Toolchain};

/// Module shape expected by the synthesized entry module.
const EMCC_BASE_FLAGS: &[&str] = &[
    "-sEXPORT_ES6=1",
    "-sUSE_ES6_IMPORT_META=0",
    "-sSTRICT=1",
    "-sMODULARIZE=1",
];

const EMCC_SIZE_FLAGS: &[&str] = &["-Os", "-sALLOW_MEMORY_GROWTH=1", "-sMALLOC=emmalloc"];

pub const ENV_WEB: &str = "-sENVIRONMENT=web";
pub const ENV_WEB_WORKER: &str = "-sENVIRONMENT=web,worker";
const THREAD_FLAGS: &[&str] = &["-pthread", "-sUSE_PTHREADS=1"];
const SIMD_FLAGS: &[&str] = &["-msimd128"];

/// `-sEXPORTED_FUNCTIONS=_a,_b` with the C symbol prefix applied to every name.
pub fn exported_functions_flag(exports: &[String]) -> String {
    let names: Vec<String> = exports.iter().map(|name| format!("_{name}")).collect();
    format!("-sEXPORTED_FUNCTIONS={}", names.join(","))
}

/// Full compiler argument list (program excluded).
pub fn compiler_args(req: &BuildRequest, artifacts: &ArtifactSet, extra: &[String]) -> Vec<String> {
    let config = req.config();
    let mut args: Vec<String> = Vec::new();
    args.extend(EMCC_BASE_FLAGS.iter().map(|s| s.to_string()));
    args.extend(EMCC_SIZE_FLAGS.iter().map(|s| s.to_string()));

    if config.thread_support {
        args.extend(THREAD_FLAGS.iter().map(|s| s.to_string()));
        args.push(ENV_WEB_WORKER.to_string());
    } else {
        args.push(ENV_WEB.to_string());
    }
    if config.simd_support {
        args.extend(SIMD_FLAGS.iter().map(|s| s.to_string()));
    }

    for dir in req.include_dirs() {
        args.push(format!("-I{}", dir.display()));
    }
    args.push(exported_functions_flag(req.exports()));

    args.push("-o".to_string());
    args.push(
        artifacts
            .path(ArtifactRole::CompiledLoader)
            .display()
            .to_string(),
    );
    args.extend(extra.iter().cloned());
    args.extend(req.trailing_args().iter().cloned());
    args
}

/// Creates the output directory if absent. Safe to repeat.
pub fn ensure_out_dir(artifacts: &ArtifactSet) -> Result<()> {
    let dir = artifacts.out_dir();
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "making output dir");
        std::fs::create_dir_all(dir).map_err(|e| PackError::fs("create output dir", dir, e))?;
    }
    Ok(())
}

pub fn compiler_invocation(
    req: &BuildRequest,
    artifacts: &ArtifactSet,
    toolchain: &Toolchain,
) -> Invocation {
    Invocation::new(toolchain.emcc.clone())
        .args(compiler_args(req, artifacts, &toolchain.emcc_extra_args))
        .current_dir(req.project_dir())
}

/// Runs the compiler and checks that both outputs exist.
pub fn run_compiler(req: &BuildRequest, artifacts: &ArtifactSet, inv: &Invocation) -> Result<()> {
    tracing::info!(exports = %req.exports().join(","), "emcc building...");
    inv.run()?;

    for role in [ArtifactRole::CompiledLoader, ArtifactRole::RawBinary] {
        let path = artifacts.path(role);
        if !path.is_file() {
            return Err(PackError::fs(
                "compiler output missing",
                path,
                std::io::ErrorKind::NotFound.into(),
            ));
        }
    }
    tracing::info!("emcc build done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::request::{PackageInfo, PipelineConfig};

    fn request(config: PipelineConfig, exports: &[&str]) -> BuildRequest {
        BuildRequest::builder(
            "/work/mathcore",
            PackageInfo {
                name: "mathcore".to_string(),
                version: "1.0.0".to_string(),
                collaborators: Vec::new(),
            },
        )
        .exports(exports.iter().copied())
        .include_dirs([PathBuf::from("include"), PathBuf::from("third_party/inc")])
        .config(config)
        .trailing_args(["src/math.c".to_string()])
        .build()
        .unwrap()
    }

    fn args_for(config: PipelineConfig) -> Vec<String> {
        let req = request(config, &["add", "mul"]);
        let artifacts = ArtifactSet::new(req.out_dir(), req.base_name());
        compiler_args(&req, &artifacts, &[])
    }

    #[test]
    fn exported_functions_are_prefixed_in_order() {
        let exports = vec!["mul".to_string(), "add".to_string(), "dot".to_string()];
        assert_eq!(
            exported_functions_flag(&exports),
            "-sEXPORTED_FUNCTIONS=_mul,_add,_dot"
        );
    }

    #[test]
    fn single_export_flag_per_run() {
        let args = args_for(PipelineConfig::default());
        let flags: Vec<&String> = args
            .iter()
            .filter(|a| a.starts_with("-sEXPORTED_FUNCTIONS="))
            .collect();
        assert_eq!(flags, vec!["-sEXPORTED_FUNCTIONS=_add,_mul"]);
    }

    #[test]
    fn plain_build_targets_web_only() {
        let args = args_for(PipelineConfig::default());
        assert_eq!(
            args,
            vec![
                "-sEXPORT_ES6=1",
                "-sUSE_ES6_IMPORT_META=0",
                "-sSTRICT=1",
                "-sMODULARIZE=1",
                "-Os",
                "-sALLOW_MEMORY_GROWTH=1",
                "-sMALLOC=emmalloc",
                "-sENVIRONMENT=web",
                "-Iinclude",
                "-Ithird_party/inc",
                "-sEXPORTED_FUNCTIONS=_add,_mul",
                "-o",
                "/work/mathcore/pkg/_api.js",
                "src/math.c",
            ]
        );
    }

    #[test]
    fn thread_build_uses_worker_environment() {
        let args = args_for(PipelineConfig {
            thread_support: true,
            ..PipelineConfig::default()
        });
        assert!(args.iter().any(|a| a == "-pthread"));
        assert!(args.iter().any(|a| a == "-sUSE_PTHREADS=1"));
        assert!(args.iter().any(|a| a == ENV_WEB_WORKER));
        assert!(!args.iter().any(|a| a == ENV_WEB));
        assert!(!args.iter().any(|a| a == "-msimd128"));
    }

    #[test]
    fn simd_and_threads_are_independent() {
        let simd_only = args_for(PipelineConfig {
            simd_support: true,
            ..PipelineConfig::default()
        });
        assert!(simd_only.iter().any(|a| a == "-msimd128"));
        assert!(simd_only.iter().any(|a| a == ENV_WEB));
        assert!(!simd_only.iter().any(|a| a == "-pthread"));

        let both = args_for(PipelineConfig {
            thread_support: true,
            simd_support: true,
            inline_binary: false,
        });
        assert!(both.iter().any(|a| a == "-msimd128"));
        assert!(both.iter().any(|a| a == "-pthread"));
        assert!(both.iter().any(|a| a == ENV_WEB_WORKER));
    }

    #[test]
    fn extra_args_precede_trailing_sources() {
        let req = request(PipelineConfig::default(), &["add"]);
        let artifacts = ArtifactSet::new(req.out_dir(), req.base_name());
        let args = compiler_args(&req, &artifacts, &["-g".to_string()]);
        let n = args.len();
        assert_eq!(&args[n - 2..], ["-g", "src/math.c"]);
    }

    #[test]
    fn ensure_out_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path().join("pkg"), "m");
        ensure_out_dir(&artifacts).unwrap();
        std::fs::write(artifacts.path(ArtifactRole::EntryModule), "keep").unwrap();
        ensure_out_dir(&artifacts).unwrap();
        assert_eq!(
            std::fs::read_to_string(artifacts.path(ArtifactRole::EntryModule)).unwrap(),
            "keep"
        );
    }
}

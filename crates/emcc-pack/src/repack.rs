//! Repackaging stage: wrap the raw binary with `wasm-pack`, then reshape its output.

use emcc_pack_contracts::{DATA_PATH_ENV, JS_PATH_ENV};

use crate::artifacts::{ArtifactRole, ArtifactSet};
use crate::error::Result;
use crate::fsutil;
use crate::request::{BuildRequest, PipelineConfig};
use crate::toolchain::{Invocation, Toolchain};

/// The wrapper's self-URL lookup; the entry module resolves the asset URL instead.
pub const SELF_URL_EXPR: &str = "import.meta.url";

pub fn wasm_pack_target(config: PipelineConfig) -> &'static str {
    if config.inline_binary {
        "bundler"
    } else {
        "web"
    }
}

pub fn generator_invocation(
    req: &BuildRequest,
    artifacts: &ArtifactSet,
    toolchain: &Toolchain,
) -> Invocation {
    Invocation::new(toolchain.wasm_pack.clone())
        .args(["build", "--release", "--target", wasm_pack_target(req.config())])
        .arg("--out-dir")
        .arg(artifacts.out_dir())
        .args(["--out-name", req.base_name()])
        .arg(&toolchain.packer_dir)
        .env(DATA_PATH_ENV, artifacts.path(ArtifactRole::StagedBinary))
        .env(JS_PATH_ENV, artifacts.path(ArtifactRole::CompiledLoader))
        .current_dir(req.project_dir())
}

/// Moves the compiler's binary to the staging name the packer crate embeds.
pub fn stage_raw_binary(artifacts: &ArtifactSet) -> Result<()> {
    fsutil::rename(
        &artifacts.path(ArtifactRole::RawBinary),
        &artifacts.path(ArtifactRole::StagedBinary),
    )
}

/// Replaces every self-URL reference with an empty string literal.
pub fn patch_wrapper_source(source: &str) -> String {
    source.replace(SELF_URL_EXPR, "''")
}

/// Reshapes the generator output in place. Steps run in order and stop at the
/// first failure; nothing already done is rolled back.
pub fn finalize_generator_output(artifacts: &ArtifactSet, config: PipelineConfig) -> Result<()> {
    fsutil::remove_file(&artifacts.path(ArtifactRole::ManifestSource))?;
    fsutil::remove_file(&artifacts.path(ArtifactRole::BindingTypeDecl))?;

    if !config.inline_binary {
        fsutil::rename(
            &artifacts.path(ArtifactRole::BindingBinary),
            &artifacts.path(ArtifactRole::DisguisedBinary),
        )?;

        let wrapper = artifacts.path(ArtifactRole::BindingWrapper);
        let source = fsutil::read_to_string(&wrapper)?;
        let patched = patch_wrapper_source(&source);
        if patched != source {
            fsutil::write_atomic_next_to(&wrapper, patched.as_bytes())?;
        }
    }

    fsutil::remove_file(&artifacts.path(ArtifactRole::StagedBinary))
}

pub fn run_generator(
    req: &BuildRequest,
    artifacts: &ArtifactSet,
    inv: &Invocation,
) -> Result<()> {
    tracing::info!(wasm_pack_target = wasm_pack_target(req.config()), "wasm packing...");
    stage_raw_binary(artifacts)?;
    inv.run()?;
    tracing::info!("wasm pack done");

    finalize_generator_output(artifacts, req.config())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::ErrorKind;

    const WRAPPER_JS: &str = "\
async function __wbg_init(module_or_path) {
    if (typeof module_or_path === 'undefined') {
        module_or_path = new URL('mathcore_bg.wasm', import.meta.url);
    }
}
const base = import.meta.url;
export default __wbg_init;
";

    fn write(path: &Path, bytes: &[u8]) {
        std::fs::write(path, bytes).unwrap();
    }

    fn fake_generator_output(artifacts: &ArtifactSet, binary: &[u8]) {
        write(&artifacts.path(ArtifactRole::ManifestSource), b"{}");
        write(&artifacts.path(ArtifactRole::BindingTypeDecl), b"export {};");
        write(&artifacts.path(ArtifactRole::BindingBinary), binary);
        write(&artifacts.path(ArtifactRole::BindingWrapper), WRAPPER_JS.as_bytes());
        write(&artifacts.path(ArtifactRole::BindingGlue), b"export {};");
        write(&artifacts.path(ArtifactRole::StagedBinary), b"\0asm");
    }

    #[test]
    fn patch_removes_every_self_url_reference() {
        let patched = patch_wrapper_source(WRAPPER_JS);
        assert!(!patched.contains(SELF_URL_EXPR));
        assert!(patched.contains("new URL('mathcore_bg.wasm', '')"));
        assert!(patched.contains("const base = '';"));
    }

    #[test]
    fn fetch_variant_renames_binary_without_touching_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path(), "mathcore");
        let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fake_generator_output(&artifacts, &binary);

        finalize_generator_output(&artifacts, PipelineConfig::default()).unwrap();

        assert!(!artifacts.path(ArtifactRole::ManifestSource).exists());
        assert!(!artifacts.path(ArtifactRole::BindingTypeDecl).exists());
        assert!(!artifacts.path(ArtifactRole::BindingBinary).exists());
        assert!(!artifacts.path(ArtifactRole::StagedBinary).exists());
        assert_eq!(
            std::fs::read(artifacts.path(ArtifactRole::DisguisedBinary)).unwrap(),
            binary
        );
        let wrapper =
            std::fs::read_to_string(artifacts.path(ArtifactRole::BindingWrapper)).unwrap();
        assert!(!wrapper.contains(SELF_URL_EXPR));
    }

    #[test]
    fn inline_variant_keeps_binary_and_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path(), "mathcore");
        fake_generator_output(&artifacts, b"\0asm\x01\0\0\0");
        let config = PipelineConfig {
            inline_binary: true,
            ..PipelineConfig::default()
        };

        finalize_generator_output(&artifacts, config).unwrap();

        assert!(artifacts.path(ArtifactRole::BindingBinary).is_file());
        assert!(!artifacts.path(ArtifactRole::DisguisedBinary).exists());
        assert_eq!(
            std::fs::read_to_string(artifacts.path(ArtifactRole::BindingWrapper)).unwrap(),
            WRAPPER_JS
        );
        assert!(!artifacts.path(ArtifactRole::StagedBinary).exists());
    }

    #[test]
    fn missing_generator_manifest_aborts_before_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path(), "mathcore");
        fake_generator_output(&artifacts, b"\0asm");
        std::fs::remove_file(artifacts.path(ArtifactRole::ManifestSource)).unwrap();

        let err = finalize_generator_output(&artifacts, PipelineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(artifacts.path(ArtifactRole::BindingTypeDecl).exists());
        assert!(artifacts.path(ArtifactRole::BindingBinary).exists());
    }

    #[test]
    fn generator_gets_staged_paths_through_the_environment() {
        let toolchain = Toolchain {
            emcc: "emcc".into(),
            emcc_extra_args: Vec::new(),
            wasm_pack: "wasm-pack".into(),
            packer_dir: "/opt/packer".into(),
        };
        let req = BuildRequest::builder(
            "/work/mathcore",
            crate::PackageInfo {
                name: "mathcore".to_string(),
                version: "1.0.0".to_string(),
                collaborators: Vec::new(),
            },
        )
        .exports(["add"])
        .build()
        .unwrap();
        let artifacts = ArtifactSet::new(req.out_dir(), req.base_name());
        let inv = generator_invocation(&req, &artifacts, &toolchain);
        assert_eq!(
            inv.argv(),
            vec![
                "wasm-pack",
                "build",
                "--release",
                "--target",
                "web",
                "--out-dir",
                "/work/mathcore/pkg",
                "--out-name",
                "mathcore",
                "/opt/packer",
            ]
        );
        assert_eq!(
            inv.env_value(DATA_PATH_ENV),
            Some(Path::new("/work/mathcore/pkg/_api.data").as_os_str())
        );
        assert_eq!(
            inv.env_value(JS_PATH_ENV),
            Some(Path::new("/work/mathcore/pkg/_api.js").as_os_str())
        );
    }
}

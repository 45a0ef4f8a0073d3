use std::path::{Path, PathBuf};

use emcc_pack_contracts::{
    COMPILED_LOADER_FILE, DISGUISED_BINARY_EXT, ENTRY_MODULE_FILE, MANIFEST_FILE,
    RAW_BINARY_FILE, STAGED_BINARY_FILE, TYPE_STUB_FILE,
};
use serde::Serialize;

use crate::request::PipelineConfig;

/// Logical role of a file in the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// `_api.js` emitted by the compiler.
    CompiledLoader,
    /// `_api.wasm` emitted by the compiler.
    RawBinary,
    /// The raw binary under the name handed to the binding generator.
    StagedBinary,
    /// `<base>.js` emitted by the binding generator.
    BindingWrapper,
    /// `<base>_bg.js`, bundler target only.
    BindingGlue,
    /// `<base>_bg.wasm` emitted by the binding generator.
    BindingBinary,
    /// `<base>_bg.wasm.d.ts` emitted by the binding generator.
    BindingTypeDecl,
    /// The binding generator's own `package.json`.
    ManifestSource,
    /// `<base>_bg.png`: the binding binary under a disguised extension.
    DisguisedBinary,
    EntryModule,
    TypeStub,
    Manifest,
}

impl ArtifactRole {
    pub const ALL: [ArtifactRole; 12] = [
        ArtifactRole::CompiledLoader,
        ArtifactRole::RawBinary,
        ArtifactRole::StagedBinary,
        ArtifactRole::BindingWrapper,
        ArtifactRole::BindingGlue,
        ArtifactRole::BindingBinary,
        ArtifactRole::BindingTypeDecl,
        ArtifactRole::ManifestSource,
        ArtifactRole::DisguisedBinary,
        ArtifactRole::EntryModule,
        ArtifactRole::TypeStub,
        ArtifactRole::Manifest,
    ];
}

/// Maps every role to one path inside a single output directory.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    out_dir: PathBuf,
    base_name: String,
}

impl ArtifactSet {
    pub fn new(out_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        ArtifactSet {
            out_dir: out_dir.into(),
            base_name: base_name.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn file_name(&self, role: ArtifactRole) -> String {
        let base = &self.base_name;
        match role {
            ArtifactRole::CompiledLoader => COMPILED_LOADER_FILE.to_string(),
            ArtifactRole::RawBinary => RAW_BINARY_FILE.to_string(),
            ArtifactRole::StagedBinary => STAGED_BINARY_FILE.to_string(),
            ArtifactRole::BindingWrapper => format!("{base}.js"),
            ArtifactRole::BindingGlue => format!("{base}_bg.js"),
            ArtifactRole::BindingBinary => format!("{base}_bg.wasm"),
            ArtifactRole::BindingTypeDecl => format!("{base}_bg.wasm.d.ts"),
            // The generator writes its manifest where ours goes; it is deleted first.
            ArtifactRole::ManifestSource | ArtifactRole::Manifest => MANIFEST_FILE.to_string(),
            ArtifactRole::DisguisedBinary => format!("{base}_bg.{DISGUISED_BINARY_EXT}"),
            ArtifactRole::EntryModule => ENTRY_MODULE_FILE.to_string(),
            ArtifactRole::TypeStub => TYPE_STUB_FILE.to_string(),
        }
    }

    pub fn path(&self, role: ArtifactRole) -> PathBuf {
        self.out_dir.join(self.file_name(role))
    }

    /// Roles present in the finished package, in manifest order (the manifest itself excluded).
    pub fn published_roles(config: PipelineConfig) -> &'static [ArtifactRole] {
        if config.inline_binary {
            &[
                ArtifactRole::EntryModule,
                ArtifactRole::TypeStub,
                ArtifactRole::CompiledLoader,
                ArtifactRole::BindingWrapper,
                ArtifactRole::BindingGlue,
                ArtifactRole::BindingBinary,
            ]
        } else {
            &[
                ArtifactRole::EntryModule,
                ArtifactRole::TypeStub,
                ArtifactRole::CompiledLoader,
                ArtifactRole::BindingWrapper,
                ArtifactRole::DisguisedBinary,
            ]
        }
    }

    pub fn published_files(&self, config: PipelineConfig) -> Vec<String> {
        Self::published_roles(config)
            .iter()
            .map(|role| self.file_name(*role))
            .collect()
    }
}

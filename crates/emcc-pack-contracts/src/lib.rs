//! Shared, version-pinned identifiers for the packaging pipeline.
//!
//! File names listed here are part of the published package layout; the
//! environment variable names are the contract with the `packer` crate.

pub const EMCC_PACK_REPORT_SCHEMA_VERSION: &str = "emcc-pack.report@0.1.0";

/// Output directory, relative to the consuming project.
pub const OUT_DIR_NAME: &str = "pkg";

/// Consumer manifest read for the package name/version.
pub const PROJECT_MANIFEST_FILE: &str = "package.json";

pub const COMPILED_LOADER_FILE: &str = "_api.js";
pub const RAW_BINARY_FILE: &str = "_api.wasm";
pub const STAGED_BINARY_FILE: &str = "_api.data";

pub const ENTRY_MODULE_FILE: &str = "index.js";
pub const TYPE_STUB_FILE: &str = "index.d.ts";
pub const MANIFEST_FILE: &str = "package.json";

/// Extension the binding binary is renamed to in the fetch variant.
pub const DISGUISED_BINARY_EXT: &str = "png";

pub const DATA_PATH_ENV: &str = "EMCC_PACK_DATA_PATH";
pub const JS_PATH_ENV: &str = "EMCC_PACK_JS_PATH";

pub const EMCC_ENV: &str = "EMCC_PACK_EMCC";
pub const EMCC_ARGS_ENV: &str = "EMCC_PACK_EMCC_ARGS";
pub const WASM_PACK_ENV: &str = "EMCC_PACK_WASM_PACK";
pub const PACKER_DIR_ENV: &str = "EMCC_PACK_PACKER_DIR";
pub const LOG_ENV: &str = "EMCC_PACK_LOG";

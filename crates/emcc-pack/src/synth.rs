//! Synthesized package files: entry module, type stub and manifest.
//!
//! Output depends only on the inputs passed in, so repeated runs produce
//! byte-identical files.

use serde::Serialize;

use crate::artifacts::{ArtifactRole, ArtifactSet};
use crate::error::{PackError, Result};
use crate::fsutil;
use crate::request::{PackageInfo, PipelineConfig};

const GENERATED_BANNER: &str = "// Generated by emcc-pack. Do not edit.\n";

/// Loader runtime shared by both variants. `fetchPayload` and `createApi`
/// are bound by the variant-specific prologue.
const LOADER_RUNTIME_JS: &str = r#"
const UNINITIALIZED = 'uninitialized';
const FETCHING = 'fetching';
const READY = 'ready';

// Delivers the instance to the compiled loader at most once; a failure rejects
// the promise returned by load().
class InstantiateHandshake {
    constructor(imports, receiveInstance, reject) {
        this.imports = imports;
        this.receiveInstance = receiveInstance;
        this.reject = reject;
        this.delivered = false;
    }

    complete(instance, module) {
        if (this.delivered) {
            throw new Error('instantiateWasm: instance already delivered');
        }
        this.delivered = true;
        this.receiveInstance(instance, module);
    }

    fail(reason) {
        this.delivered = true;
        this.reject(reason);
    }
}

export class Loader {
    constructor(source = fetchPayload) {
        this.source = source;
        this.state = { kind: UNINITIALIZED };
    }

    // UNINITIALIZED -> FETCHING -> READY. Callers arriving while FETCHING share
    // the in-flight promise.
    payload() {
        const state = this.state;
        if (state.kind === READY) {
            return Promise.resolve(state.payload);
        }
        if (state.kind === FETCHING) {
            return state.pending;
        }
        const pending = Promise.resolve()
            .then(() => this.source())
            .then((payload) => {
                this.state = { kind: READY, payload };
                return payload;
            });
        this.state = { kind: FETCHING, pending };
        return pending;
    }

    getWasmData() {
        return this.payload().then((payload) => payload.wasm);
    }

    getJsData() {
        return this.payload().then((payload) => payload.js);
    }

    load() {
        return this.payload().then((payload) => new Promise((resolve, reject) => {
            const api = createApi({
                instantiateWasm(imports, receiveInstance) {
                    const handshake = new InstantiateHandshake(imports, receiveInstance, reject);
                    WebAssembly.instantiate(payload.wasm, handshake.imports)
                        .then((result) => handshake.complete(result.instance, result.module))
                        .catch((reason) => {
                            console.error('failed to prepare wasm');
                            handshake.fail(reason);
                        });
                    return {};
                },
            });
            Promise.resolve(api).then(resolve, reject);
        }));
    }
}

const defaultLoader = new Loader();

export function createLoader() {
    return new Loader();
}

export function load() {
    return defaultLoader.load();
}

export function getWasmData() {
    return defaultLoader.getWasmData();
}

export function getJsData() {
    return defaultLoader.getJsData();
}

export default {
    load,
    getWasmData,
    getJsData,
    createLoader,
};
"#;

const TYPE_STUB_TS: &str = r#"export interface WasmModule {
    [key: string]: any;
}

export declare class Loader {
    load(): Promise<WasmModule>;
    getWasmData(): Promise<Uint8Array>;
    getJsData(): Promise<string>;
}

export declare function createLoader(): Loader;
export declare function load(): Promise<WasmModule>;
export declare function getWasmData(): Promise<Uint8Array>;
export declare function getJsData(): Promise<string>;

declare const _default: {
    load: typeof load;
    getWasmData: typeof getWasmData;
    getJsData: typeof getJsData;
    createLoader: typeof createLoader;
};
export default _default;
"#;

fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn relative(file: &str) -> String {
    js_str(&format!("./{file}"))
}

/// `index.js`: the lazy, single-flight loader around the compiled module.
pub fn entry_module(artifacts: &ArtifactSet, config: PipelineConfig) -> String {
    let api = relative(&artifacts.file_name(ArtifactRole::CompiledLoader));
    let wrapper = relative(&artifacts.file_name(ArtifactRole::BindingWrapper));

    let mut out = String::new();
    out.push_str(GENERATED_BANNER);
    out.push_str(&format!("import createApi from {api};\n"));
    if config.inline_binary {
        out.push_str(&format!(
            "\nfunction fetchPayload() {{\n    return import({wrapper}).then((bindings) => ({{\n        wasm: bindings.getData(),\n        js: bindings.getJsData(),\n    }}));\n}}\n"
        ));
    } else {
        let asset = relative(&artifacts.file_name(ArtifactRole::DisguisedBinary));
        out.push_str(&format!(
            "import initBindings, {{ getData as bindingData, getJsData as bindingJsData }} from {wrapper};\n"
        ));
        out.push_str(&format!("import bindingsUrl from {asset};\n"));
        out.push_str(
            "\nfunction fetchPayload() {\n    return initBindings(bindingsUrl).then(() => ({\n        wasm: bindingData(),\n        js: bindingJsData(),\n    }));\n}\n",
        );
    }
    out.push_str(LOADER_RUNTIME_JS);
    out
}

/// `index.d.ts`.
pub fn type_stub() -> String {
    format!("{GENERATED_BANNER}{TYPE_STUB_TS}")
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    name: &'a str,
    collaborators: &'a [String],
    version: &'a str,
    files: Vec<String>,
    module: String,
    types: String,
    #[serde(rename = "sideEffects")]
    side_effects: bool,
}

/// `package.json` for the finished package.
pub fn manifest(
    package: &PackageInfo,
    artifacts: &ArtifactSet,
    config: PipelineConfig,
) -> Result<String> {
    let doc = Manifest {
        name: &package.name,
        collaborators: &package.collaborators,
        version: &package.version,
        files: artifacts.published_files(config),
        module: artifacts.file_name(ArtifactRole::EntryModule),
        types: artifacts.file_name(ArtifactRole::TypeStub),
        side_effects: false,
    };
    let mut text = serde_json::to_string_pretty(&doc).map_err(|e| {
        PackError::fs(
            "encode manifest",
            artifacts.path(ArtifactRole::Manifest),
            e.into(),
        )
    })?;
    text.push('\n');
    Ok(text)
}

/// Writes the three synthesized files, replacing any previous copies.
pub fn write_all(
    package: &PackageInfo,
    artifacts: &ArtifactSet,
    config: PipelineConfig,
) -> Result<()> {
    tracing::info!("final packing...");
    let files = [
        (ArtifactRole::EntryModule, entry_module(artifacts, config)),
        (ArtifactRole::TypeStub, type_stub()),
        (ArtifactRole::Manifest, manifest(package, artifacts, config)?),
    ];
    for (role, contents) in files {
        let path = artifacts.path(role);
        tracing::debug!(path = %path.display(), bytes = contents.len(), "write");
        fsutil::write_atomic_next_to(&path, contents.as_bytes())?;
    }
    Ok(())
}

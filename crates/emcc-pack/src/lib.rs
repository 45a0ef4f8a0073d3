//! Packages an Emscripten-compiled WebAssembly module as a lazily-loaded web package.
//!
//! A run compiles native sources with `emcc`, embeds the resulting binary in the
//! `packer` crate through `wasm-pack`, reshapes the generator's output and writes
//! the entry module, type stub and manifest into `<project>/pkg`.

pub mod artifacts;
pub mod compile;
pub mod error;
mod fsutil;
pub mod pipeline;
pub mod repack;
pub mod request;
pub mod synth;
pub mod toolchain;

pub use artifacts::{ArtifactRole, ArtifactSet};
pub use error::{ErrorKind, PackError};
pub use pipeline::{pack, PackReport};
pub use request::{BuildRequest, PackageInfo, PipelineConfig};
pub use toolchain::Toolchain;

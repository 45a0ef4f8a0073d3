//! Carries an emcc-built wasm binary and its JS loader inside a `wasm-bindgen` module.
//!
//! `emcc-pack` builds this crate with `wasm-pack`, pointing `EMCC_PACK_DATA_PATH`
//! at the staged binary and `EMCC_PACK_JS_PATH` at the compiler-emitted loader.

use wasm_bindgen::prelude::*;

const DATA: &[u8] = include_bytes!(env!("EMCC_PACK_DATA_PATH"));
const JS: &str = include_str!(env!("EMCC_PACK_JS_PATH"));

/// Raw bytes of the compiled module.
#[wasm_bindgen(js_name = "getData")]
pub fn get_data() -> Vec<u8> {
    DATA.to_vec()
}

/// Source text of the compiler-emitted loader.
#[wasm_bindgen(js_name = "getJsData")]
pub fn get_js_data() -> String {
    JS.to_string()
}

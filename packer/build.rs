fn main() {
    for var in ["EMCC_PACK_DATA_PATH", "EMCC_PACK_JS_PATH"] {
        println!("cargo:rerun-if-env-changed={var}");
        if let Ok(path) = std::env::var(var) {
            println!("cargo:rerun-if-changed={path}");
        }
    }
}

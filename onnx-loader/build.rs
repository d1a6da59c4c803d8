// ONNX Runtime links the dynamic MSVC runtime; drop the static one so the
// two do not clash when the `onnx` feature is on.

fn main() {
    let windows = std::env::var("CARGO_CFG_TARGET_OS").map_or(false, |os| os == "windows");
    if windows && std::env::var_os("CARGO_FEATURE_ONNX").is_some() {
        println!("cargo:rustc-link-arg=/NODEFAULTLIB:libcmt");
    }
    println!("cargo:rerun-if-changed=build.rs");
}

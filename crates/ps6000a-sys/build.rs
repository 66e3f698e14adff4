//! Build script for ps6000a-sys.
//!
//! The bindings themselves are hand-declared in `src/lib.rs` because the
//! vendor header is a flat C API with a stable ABI. This script only emits
//! link directives, and only when the `picosdk` feature is enabled, so the
//! crate builds on machines without the PicoSDK installed.

fn main() {
    println!("cargo:rerun-if-env-changed=PICOSDK_LIB_DIR");

    #[cfg(feature = "picosdk")]
    link_picosdk();
}

#[cfg(feature = "picosdk")]
fn link_picosdk() {
    use std::path::Path;

    println!("cargo:rustc-link-lib=dylib=ps6000a");

    if let Ok(dir) = std::env::var("PICOSDK_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
        return;
    }

    // Default install locations of the PicoSDK
    let lib_paths = [
        "/opt/picoscope/lib",
        "/usr/local/lib",
        "/Library/Frameworks/PicoSDK.framework/Libraries/libps6000a",
        "C:\\Program Files\\Pico Technology\\SDK\\lib",
    ];

    for path in lib_paths {
        if Path::new(path).exists() {
            println!("cargo:rustc-link-search=native={}", path);
            break;
        }
    }
}

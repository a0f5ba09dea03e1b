//! Build script for zdb-core
//!
//! This script checks build requirements before compilation:
//! - Minimum Rust version
//! - 64-bit target (every calling-convention rule in `abi` and `sb` assumes
//!   pointer-width words and the 64-bit System V / AAPCS64 aggregate rules)
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer (`std::sync::OnceLock`, let-else)
//! - **Target**: x86-64 or AArch64, Linux or macOS

use std::env;

fn main()
{
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        if rustc_version < min_rust_version {
            panic!("zdb-core requires Rust {min_rust_version} or newer, found {rustc_version}");
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    check_target_width();
}

fn check_target_width()
{
    // Cargo exposes the target configuration to build scripts through env vars.
    // The build script itself runs on the host, so `cfg!(target_pointer_width)`
    // would describe the wrong machine when cross-compiling.
    let width = env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();
    if !width.is_empty() && width != "64" {
        panic!("zdb-core only supports 64-bit targets, found a {width}-bit target");
    }

    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if !arch.is_empty() && arch != "x86_64" && arch != "aarch64" {
        println!("cargo:warning=zdb-core ABI rules are only verified for x86_64 and aarch64, building for {arch}");
    }
}

// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Build script for the RF-A secure test framework core.

/// The list of all supported platforms.
pub const PLATFORMS: &[&str] = &["fvp", "qemu"];

fn main() {
    println!(
        "cargo::rustc-check-cfg=cfg(platform, values(\"{}\"))",
        PLATFORMS.join("\", \""),
    );
    println!("cargo:rerun-if-env-changed=STF_LOG_LEVEL");
}

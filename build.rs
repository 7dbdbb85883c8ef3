//! Build script for cupid-client.
//!
//! Warns when the crate is built without a chain backend.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only the in-process devnet remains without `evm`; the CLI is skipped.
    if std::env::var_os("CARGO_FEATURE_EVM").is_none() {
        println!(
            "cargo:warning=cupid-client built without the evm feature: \
             only the devnet backend is available and the CLI is not built"
        );
    }
}

//! Build script: checks that the checked-in CRI stubs are present and not stale.
//!
//! The gRPC code under `src/generated/` is committed so the crate builds without
//! `protoc`. Regenerate it with tonic-build whenever `proto/runtime/v1/api.proto` changes.

use std::fs;
use std::path::Path;

fn main() {
    let proto = Path::new("proto/runtime/v1/api.proto");
    let generated = Path::new("src/generated/runtime.v1.rs");

    println!("cargo:rerun-if-changed={}", proto.display());
    println!("cargo:rerun-if-changed={}", generated.display());

    if !generated.exists() {
        panic!(
            "missing generated gRPC source '{}'; commit generated artifacts",
            generated.display()
        );
    }

    if let (Ok(proto_meta), Ok(gen_meta)) = (fs::metadata(proto), fs::metadata(generated)) {
        if let (Ok(proto_mtime), Ok(gen_mtime)) = (proto_meta.modified(), gen_meta.modified()) {
            if proto_mtime > gen_mtime {
                println!(
                    "cargo:warning=proto '{}' is newer than generated Rust stubs '{}'",
                    proto.display(),
                    generated.display()
                );
            }
        }
    }
}

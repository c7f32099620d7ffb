//! Build script for wgpuj
//!
//! This script:
//! 1. Reads the struct IDL from build_support/structs.json
//! 2. Computes the C layout of every struct
//! 3. Writes the Rust bindings (structs, accessors, layout assertions)
//! 4. Writes and compiles a C probe that reports the header's layouts
//! 5. Links the probe so the layouts can be checked at run time

#[path = "build_support/codegen.rs"]
mod codegen;
#[path = "build_support/idl.rs"]
mod idl;

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use idl::Idl;

/// Overrides the directory holding the native header.
const INCLUDE_DIR_ENV: &str = "WGPU_NATIVE_INCLUDE_DIR";

struct BuildPaths {
    out_dir: PathBuf,
    idl_path: PathBuf,
    include_dir: PathBuf,
}

fn resolve_paths() -> BuildPaths {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let idl_path = manifest_dir.join("build_support").join("structs.json");

    let include_dir = match env::var_os(INCLUDE_DIR_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            println!(
                "cargo:warning=Checking bindings against the header in {:?}",
                dir
            );
            dir
        }
        None => manifest_dir.join("native"),
    };

    if !idl_path.exists() {
        panic!("Struct IDL not found at {:?}", idl_path);
    }
    if !include_dir.exists() {
        panic!("Native include directory not found at {:?}", include_dir);
    }

    BuildPaths {
        out_dir,
        idl_path,
        include_dir,
    }
}

fn load_idl(paths: &BuildPaths) -> Idl {
    let idl = idl::load_idl(&paths.idl_path)
        .unwrap_or_else(|err| panic!("Failed to read {:?}: {}", paths.idl_path, err));

    let header = paths.include_dir.join(&idl.header);
    if !header.exists() {
        panic!("Native header not found at {:?}", header);
    }
    idl
}

fn write_generated_bindings(out_dir: &Path, idl: &Idl) {
    let layouts = idl
        .compute_layouts()
        .unwrap_or_else(|err| panic!("Invalid struct IDL: {}", err));

    let bindings_rs = out_dir.join("bindings.rs");
    fs::write(&bindings_rs, codegen::rust_bindings(idl, &layouts))
        .expect("Couldn't write bindings!");
}

fn write_layout_probe(out_dir: &Path, idl: &Idl) -> PathBuf {
    let probe_c = out_dir.join("layout_probe.c");
    fs::write(&probe_c, codegen::c_probe(idl)).expect("Couldn't write layout probe!");
    probe_c
}

fn compile_layout_probe(paths: &BuildPaths, probe_c: &Path) {
    cc::Build::new()
        .file(probe_c)
        .include(&paths.include_dir)
        .warnings(true)
        .compile("wgpuj_layout_probe");
}

fn emit_rerun_if_changed(paths: &BuildPaths, idl: &Idl) {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=build_support/codegen.rs");
    println!("cargo:rerun-if-changed=build_support/idl.rs");
    println!("cargo:rerun-if-changed={}", paths.idl_path.display());
    println!(
        "cargo:rerun-if-changed={}",
        paths.include_dir.join(&idl.header).display()
    );
    println!("cargo:rerun-if-env-changed={}", INCLUDE_DIR_ENV);
}

fn emit_header_path(paths: &BuildPaths, idl: &Idl) {
    println!(
        "cargo:rustc-env=WGPUJ_HEADER_PATH={}",
        paths.include_dir.join(&idl.header).display()
    );
}

fn main() {
    let paths = resolve_paths();
    let idl = load_idl(&paths);

    write_generated_bindings(&paths.out_dir, &idl);
    let probe_c = write_layout_probe(&paths.out_dir, &idl);
    compile_layout_probe(&paths, &probe_c);

    emit_header_path(&paths, &idl);
    emit_rerun_if_changed(&paths, &idl);
}

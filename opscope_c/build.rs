// Generates include/opscope.h for C/C++ executors
use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let header = PathBuf::from(&crate_dir).join("include").join("opscope.h");

    println!("cargo:rerun-if-changed=src/lib.rs");

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("OPSCOPE_H")
        .generate()
    {
        Ok(bindings) => {
            if let Some(dir) = header.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=opscope.h not generated: {}", e),
    }
}

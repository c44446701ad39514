use std::path::PathBuf;

fn main() {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed=tests");

    build_test_package("lang");
}

/// Generates one `#[test]` per `.lox` script under `tests/{package_name}`, each of
/// which hands the script to the package's `run_file` harness.
fn build_test_package(package_name: &str) {
    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").expect("cargo should set OUT_DIR for build scripts"));

    let mut tests = Vec::new();

    for path in glob::glob(format!("tests/{}/**/*.lox", package_name).as_str()).expect("Failed to read glob pattern").flatten() {
        let name = format!("{}", path.display())
            .replace(std::path::MAIN_SEPARATOR_STR, "_")
            .trim_start_matches("tests_")
            .trim_end_matches(".lox")
            .to_owned();

        tests.push((path.to_owned(), name));
    }

    tests.sort();

    let test_defs = tests.iter()
        .map(|(path, name)| format!("#[test]\nfn {name}() {{ run_file({:?}).expect(\"no errors\") }}", path.display().to_string()))
        .collect::<Vec<_>>()
        .join("\n\n");

    println!("cargo::rerun-if-changed=tests/{package_name}/");
    std::fs::create_dir_all(out_dir.join("tests")).expect("Unable to create test directory");
    std::fs::write(out_dir.join("tests").join(format!("{package_name}.rs")), test_defs).expect("Unable to write test file")
}

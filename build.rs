use std::env;
use std::fs;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

static TEST_DATA: &str = "./tests/data/";
static TEST_TEMPLATE: &str = r#"
    #[test]
    fn {test_name}() {
        let filename = Path::new("{filename}");
        do_test(filename);
    }
"#;

fn main() {
    let out_dir = env::var_os("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let dest_path = Path::new(&out_dir).join("test_files.rs");

    let file = fs::File::create(dest_path).expect("failed to create test_files.rs");
    let mut buf = BufWriter::new(file);

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={TEST_DATA}");

    for entry in get_all_files() {
        let Some(filename) = entry.path().to_str() else {
            continue;
        };
        if !filename.ends_with(".lox") {
            continue;
        }

        let test_name = filename
            .replace("./", "")
            .replace(['/', '-'], "_")
            .replace(".lox", "")
            .replace("tests_data_", "");

        let test_case = TEST_TEMPLATE
            .replace("{test_name}", &test_name)
            .replace("{filename}", filename);

        write!(&mut buf, "{test_case}").expect("failed to write test case");
    }
}

fn get_all_files() -> Vec<walkdir::DirEntry> {
    let mut entries: Vec<_> = WalkDir::new(TEST_DATA)
        .into_iter()
        .filter_map(|o| o.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by(|a, b| a.path().cmp(b.path()));
    entries
}

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use pretty_assertions::assert_eq;

include!(concat!(env!("OUT_DIR"), "/test_files.rs"));

const EXPECT: &str = "// expect: ";
const EXPECT_RUNTIME_ERROR: &str = "// expect runtime error: ";
const EXPECT_ERROR: &str = "// expect error: ";

/// What a script under `tests/data` says about its own run.
#[derive(Debug, Default)]
struct Expectations {
    stdout: Vec<String>,
    runtime_error: Option<String>,
    errors: Vec<String>,
}

impl Expectations {
    fn exit_code(&self) -> i32 {
        if !self.errors.is_empty() {
            65
        } else if self.runtime_error.is_some() {
            70
        } else {
            0
        }
    }
}

fn do_test(filename: &Path) {
    let expect = find_expects(filename);
    let output = run_file(filename);

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stdout: Vec<_> = stdout.lines().map(str::to_owned).collect();
    let stderr = String::from_utf8(output.stderr).unwrap();

    assert_eq!(expect.stdout, stdout, "stderr={stderr}");

    if let Some(message) = &expect.runtime_error {
        assert!(stderr.contains(message), "missing runtime error {message:?} in {stderr:?}");
    }
    for message in &expect.errors {
        assert!(stderr.contains(message), "missing error {message:?} in {stderr:?}");
    }

    assert_eq!(Some(expect.exit_code()), output.status.code(), "stderr={stderr}");
}

fn run_file(filename: &Path) -> Output {
    let mut cmd = Command::cargo_bin("treelox").unwrap();
    cmd.arg(filename).output().unwrap()
}

fn find_expects(filename: &Path) -> Expectations {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let mut result = Expectations::default();
    for line in content.lines() {
        if let Some(target) = after(line, EXPECT_RUNTIME_ERROR) {
            result.runtime_error = Some(target.into());
        } else if let Some(target) = after(line, EXPECT_ERROR) {
            result.errors.push(target.into());
        } else if let Some(target) = after(line, EXPECT) {
            result.stdout.push(target.into());
        }
    }

    result
}

fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.rfind(marker).map(|idx| &line[idx + marker.len()..])
}

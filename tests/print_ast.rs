use assert_cmd::Command;
use pretty_assertions::assert_eq;

fn print_ast(filename: &str) -> std::process::Output {
    let mut cmd = Command::cargo_bin("treelox").unwrap();
    cmd.arg("--print-ast").arg(filename).output().unwrap()
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout).lines().map(str::to_owned).collect()
}

#[test]
fn prints_each_top_level_statement() {
    let output = print_ast("./tests/ast/program.lox");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_lines(&output),
        vec![
            "(var a 1)",
            r#"(print (?: a "yes" (, "no" 2)))"#,
            "(fun twice(x) (return (* x 2)))",
            "(block (var i 0) (while (< i 2) (block (print (call twice i)) (; (= i (+ i 1))))))",
        ]
    );
}

#[test]
fn parse_errors_are_reported_with_exit_code_65() {
    let output = print_ast("./tests/ast/parse_error.lox");

    assert_eq!(output.status.code(), Some(65));
    assert_eq!(stdout_lines(&output), vec!["(print 1)", "(print 2)"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[line 2] Error at ';': Expect expression."), "{stderr}");
}

#[test]
fn print_ast_needs_a_script() {
    let mut cmd = Command::cargo_bin("treelox").unwrap();
    cmd.arg("--print-ast").assert().failure();
}

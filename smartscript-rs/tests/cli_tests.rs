//! End-to-end tests: run the `smartscript` binary on template files and check
//! what it writes to stdout and stderr.
//!
//! Every run passes `-n` (unless a test supplies its own config) so a user
//! config on the test machine cannot change the output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Path to the binary built by this Cargo workspace.
fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_smartscript"))
}

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn template(src: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(src.as_bytes()).expect("write template");
    file
}

fn run(args: &[&str], paths: &[&Path]) -> Output {
    Command::new(binary())
        .args(args)
        .args(paths)
        .env_remove("SMARTSCRIPT_RC")
        .env("SMARTSCRIPT_LOG", "off")
        .output()
        .expect("failed to run smartscript binary")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ── Rendering ─────────────────────────────────────────────────────────────────

#[test]
fn renders_a_loop() {
    let t = template("{$ FOR i 1 5 $}{$= i $}{$END$}");
    let out = run(&["-n"], &[t.path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "12345");
}

#[test]
fn request_parameters_from_flags() {
    let out = run(&["-n", "-p", "a=4", "-pb=2"], &[demo("sum.smscr").as_path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "a + b = 6\n");

    let out = run(&["-n"], &[demo("sum.smscr").as_path()]);
    assert_eq!(stdout(&out), "a + b = 3\n");
}

#[test]
fn persistent_parameters_carry_across_templates() {
    let visits = demo("visits.smscr");
    let out = run(&["-n", "-P", "visits=41"], &[visits.as_path(), visits.as_path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "This page was requested 42 time(s).\nThis page was requested 43 time(s).\n"
    );
}

#[test]
fn temporary_parameters() {
    let out = run(&["-n"], &[demo("fibonacci.smscr").as_path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "Fibonacci numbers:\n0 1\n 1 2 3 5 8 13 21 34\n"
    );
}

#[test]
fn header_uses_mime_type_from_template() {
    let out = run(&["-n", "-H"], &[demo("sum.smscr").as_path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\na + b = 3\n"
    );
}

#[test]
fn header_for_empty_body() {
    let t = template("");
    let out = run(&["-nH"], &[t.path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n"
    );
}

#[test]
fn output_follows_argument_order() {
    let a = template("first\n");
    let b = template("second\n");
    let out = run(&["-n"], &[b.path(), a.path(), b.path()]);
    assert_eq!(stdout(&out), "second\nfirst\nsecond\n");
}

#[test]
fn demo_basic_renders() {
    let out = run(&["-n"], &[demo("basic.smscr").as_path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("This is sample text.\n"));
    assert_eq!(text.matches("-th time this message is generated.").count(), 10);
    assert!(text.contains("sin(2^2) = 0.070"));
}

// ── Tree writer ───────────────────────────────────────────────────────────────

#[test]
fn print_tree() {
    let t = template("a \\{ b{$for i 1 3$}{$= i \"x\"$}{$end$}");
    let out = run(&["-n", "-t"], &[t.path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "a \\{ b{$ FOR i 1 3 $}{$= i \"x\" $}{$END$}");
}

// ── Config ────────────────────────────────────────────────────────────────────

#[test]
fn explicit_config_file() {
    let rc = template(
        "; test config\nparam a=10\nmime text/plain\nstatus 404 Not Found\n\
         header on\ncookie sid=1 path=/\n",
    );
    let t = template("{$= \"a\" 0 @paramGet $}");
    let out = run(&["-c", rc.path().to_str().unwrap()], &[t.path()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain; charset=UTF-8\r\n\
         Set-Cookie: sid=1; Path=/\r\n\r\n10"
    );
}

#[test]
fn flags_override_config() {
    let rc = template("param a=10\n");
    let t = template("{$= \"a\" 0 @paramGet $}");
    let out = run(&["-c", rc.path().to_str().unwrap(), "-p", "a=11"], &[t.path()]);
    assert_eq!(stdout(&out), "11");
}

#[test]
fn config_from_environment() {
    let rc = template("param who=env\n");
    let t = template("{$= \"who\" \"nobody\" @paramGet $}");
    let out = Command::new(binary())
        .arg(t.path())
        .env("SMARTSCRIPT_RC", rc.path())
        .env("SMARTSCRIPT_LOG", "off")
        .output()
        .expect("failed to run smartscript binary");
    assert_eq!(stdout(&out), "env");
}

#[test]
fn bad_config_lines_are_warnings() {
    let rc = template("frobnicate\nparam a=1\n");
    let t = template("{$= \"a\" 0 @paramGet $}");
    let out = Command::new(binary())
        .args(["-c", rc.path().to_str().unwrap()])
        .arg(t.path())
        .env("SMARTSCRIPT_LOG", "warn")
        .output()
        .expect("failed to run smartscript binary");
    assert!(out.status.success());
    assert_eq!(stdout(&out), "1");
    assert!(stderr(&out).contains("unknown directive"));
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[test]
fn parse_error_names_the_template() {
    let t = template("{$ FOR i 1 $}{$END$}");
    let out = run(&["-n"], &[t.path()]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains(&t.path().display().to_string()), "{err}");
    assert!(err.contains("FOR tag takes 3 or 4 arguments"), "{err}");
}

#[test]
fn runtime_error_exits_with_failure() {
    let t = template("{$= missing $}");
    let out = run(&["-n"], &[t.path()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("\"missing\" is not bound"));
}

#[test]
fn partial_output_is_kept_on_error() {
    let ok = template("first\n");
    let bad = template("before{$= x $}after");
    let out = run(&["-n"], &[ok.path(), bad.path(), ok.path()]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stdout(&out), "first\nbefore");
    assert!(stderr(&out).contains("\"x\" is not bound"));
}

#[test]
fn missing_template_file() {
    let out = run(&["-n"], &[Path::new("/nonexistent/page.smscr")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("/nonexistent/page.smscr"));
}

#[test]
fn usage_errors() {
    let out = run(&[], &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Usage: smartscript"));

    let out = run(&["-z", "x"], &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unknown option: -z"));
}

#[test]
fn help_flag() {
    let out = run(&["-h"], &[]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("Usage: smartscript"));
}

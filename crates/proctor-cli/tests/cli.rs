use std::path::PathBuf;
use std::process::{Command, Output};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
}

fn proctor(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_proctor"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn test_validate_fixture_tree() {
    let out = proctor(&fixtures(), &["validate", "manifests"]);
    assert!(out.status.success(), "{}", text(&out.stderr));
    let stdout = text(&out.stdout);
    assert!(stdout.contains("Validated 3 manifest(s) with 4 test case(s)"), "{stdout}");
    assert!(stdout.contains("basic.yaml"));
}

#[test]
fn test_validate_reports_field_errors() {
    let out = proctor(&fixtures(), &["validate", "invalid", "does-not-exist"]);
    assert!(!out.status.success());
    let stderr = text(&out.stderr);
    assert!(stderr.contains("test_cases[0].request.method"), "{stderr}");
    assert!(stderr.contains("test_cases[1].name"));
    assert!(stderr.contains("does-not-exist"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let out = proctor(dir.path(), &["init"]);
    assert!(out.status.success(), "{}", text(&out.stderr));
    let written = std::fs::read_to_string(dir.path().join("proctor.toml")).unwrap();
    assert!(written.contains("localhost:50051"));

    let again = proctor(dir.path(), &["init"]);
    assert!(!again.status.success());
    assert!(text(&again.stderr).contains("--force"));
    assert!(proctor(dir.path(), &["init", "--force"]).status.success());
}

#[test]
fn test_run_without_manifests_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = proctor(dir.path(), &["run", "."]);
    assert!(!out.status.success());
    assert!(text(&out.stderr).contains("no test manifests found"));
}

#[test]
fn test_run_rejects_conflicting_target_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("proctor.toml"),
        "[target]\nunix_socket = \"/tmp/p.sock\"\ntls = true\n",
    )
    .unwrap();
    let manifest = fixtures().join("manifests/basic.yaml");
    let out = proctor(dir.path(), &["run", manifest.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(text(&out.stderr).contains("TLS cannot be used with a Unix socket"));
}

#[test]
fn test_run_against_missing_processor_reports_failures_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("absent.sock");
    let manifest = fixtures().join("manifests/basic.yaml");
    let out = proctor(
        dir.path(),
        &[
            "run",
            manifest.to_str().unwrap(),
            "--unix-socket",
            socket.to_str().unwrap(),
            "--timeout-ms",
            "2000",
            "-o",
            "json",
        ],
    );

    assert!(!out.status.success());
    let stdout = text(&out.stdout);
    assert!(stdout.contains("\"failed\": 2"), "{stdout}");
    assert!(stdout.contains("\"success\": false"));
    assert!(stdout.contains("\"error\""));
}

const MESSY_MANIFEST: &str = r#"
test_cases:
  - request: { path: /, method: GET }
    name: one
    expectations: [ { phase: REQUEST_HEADERS, headers_response: { remove_headers: [x-a] } } ]
name:    messy
"#;

#[test]
fn test_fmt_checks_then_rewrites() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.yaml"), MESSY_MANIFEST).unwrap();
    std::fs::write(dir.path().join("b.yaml"), MESSY_MANIFEST.replace("messy", "other")).unwrap();

    let check = proctor(dir.path(), &["fmt", "."]);
    assert!(!check.status.success());
    let stdout = text(&check.stdout);
    assert!(stdout.contains("a.yaml needs formatting"), "{stdout}");
    assert!(stdout.contains("b.yaml needs formatting"));

    let diff = proctor(dir.path(), &["fmt", "--diff", "a.yaml"]);
    assert!(!diff.status.success());
    let stdout = text(&diff.stdout);
    assert!(stdout.contains("--- a.yaml (original)"), "{stdout}");
    assert!(stdout.contains("+name: messy"));
    assert_eq!(std::fs::read_to_string(dir.path().join("a.yaml")).unwrap(), MESSY_MANIFEST);

    let write = proctor(dir.path(), &["fmt", "-w", "."]);
    assert!(write.status.success(), "{}", text(&write.stderr));
    assert!(text(&write.stdout).contains("formatted"));
    let rewritten = std::fs::read_to_string(dir.path().join("a.yaml")).unwrap();
    assert!(rewritten.starts_with("name: messy\n"), "{rewritten}");

    assert!(proctor(dir.path(), &["fmt", "."]).status.success());
    let single = proctor(dir.path(), &["fmt", "a.yaml"]);
    assert!(single.status.success());
    assert_eq!(text(&single.stdout), rewritten);
}

#[test]
fn test_fmt_reports_unparsable_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.yaml"), "test_cases: [ { name: no-request } ]\n").unwrap();

    let out = proctor(dir.path(), &["fmt", "broken.yaml"]);
    assert!(!out.status.success());
    let stderr = text(&out.stderr);
    assert!(stderr.contains("ERROR: broken.yaml"), "{stderr}");
    assert!(stderr.contains("parse manifest yaml"));
}

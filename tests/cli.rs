//! End-to-end tests driving the compiled `guidepack` binary.
//!
//! Builds use `sh -c 'cp "$0" "$1"'` as the renderer so the tests run
//! without grip installed.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn guidepack(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_guidepack"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn archive_files(path: &Path) -> Vec<String> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    let mut files: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.header().entry_type().is_file())
        .map(|e| {
            let path = e.path().unwrap().into_owned();
            path.to_string_lossy().into_owned()
        })
        .collect();
    files.sort();
    files
}

const COPY_RENDERER: &str = r#"
[renderer]
program = "sh"
args = ["-c", "cp \"$0\" \"$1\""]
"#;

#[test]
fn gen_config_prints_stock_config() {
    let tmp = TempDir::new().unwrap();
    let out = guidepack(tmp.path(), &["gen-config"]);

    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("source_dir = \"guide\""));
    assert!(text.contains("program = \"grip\""));
}

#[test]
fn missing_source_fails_without_touching_output() {
    let tmp = TempDir::new().unwrap();
    let out = guidepack(tmp.path(), &["build"]);

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("guide"), "stderr: {stderr}");
    assert!(!tmp.path().join("dist").exists());
    assert!(!tmp.path().join("dist.tar.gz").exists());
}

#[test]
fn unknown_config_key_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("guidepack.toml"), "outputdir = \"x\"\n").unwrap();

    let out = guidepack(tmp.path(), &["build"]);
    assert!(!out.status.success());
}

#[test]
fn check_fails_when_renderer_missing() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("guide")).unwrap();
    fs::write(tmp.path().join("guide/a.md"), "# A").unwrap();
    fs::write(
        tmp.path().join("guidepack.toml"),
        "[renderer]\nprogram = \"guidepack-no-such-renderer\"\n",
    )
    .unwrap();

    let out = guidepack(tmp.path(), &["check"]);

    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("001 a.md"));
    assert!(stdout.contains("NOT FOUND"));
}

#[cfg(unix)]
#[test]
fn build_renders_rewrites_and_archives() {
    let tmp = TempDir::new().unwrap();
    let guide = tmp.path().join("guide");
    fs::create_dir_all(&guide).unwrap();
    fs::write(guide.join("a.md"), "# A\n\nSee [b](b.md).\n").unwrap();
    fs::write(guide.join("b.md"), "# B\n").unwrap();
    fs::write(tmp.path().join("guidepack.toml"), COPY_RENDERER).unwrap();

    // No subcommand means build.
    let out = guidepack(tmp.path(), &[]);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("==> Found 2 files in guide"));
    assert!(stdout.contains("==> Done: 2 pages, 1 link rewritten"));

    let a = fs::read_to_string(tmp.path().join("dist/a.html")).unwrap();
    assert_eq!(a, "# A\n\nSee [b](b.html).\n");
    assert_eq!(
        archive_files(&tmp.path().join("dist.tar.gz")),
        vec!["dist/a.html", "dist/b.html"]
    );
}

#[cfg(unix)]
#[test]
fn flags_override_config_paths() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("docs")).unwrap();
    fs::write(tmp.path().join("docs/index.md"), "home").unwrap();
    fs::write(tmp.path().join("guidepack.toml"), COPY_RENDERER).unwrap();

    let out = guidepack(
        tmp.path(),
        &["build", "--source", "docs", "--output", "site", "--archive", "out/site.tar.gz"],
    );

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        archive_files(&tmp.path().join("out/site.tar.gz")),
        vec!["site/index.html"]
    );
}

#[cfg(unix)]
#[test]
fn failing_renderer_produces_no_archive() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("guide")).unwrap();
    fs::write(tmp.path().join("guide/a.md"), "A").unwrap();
    fs::write(
        tmp.path().join("guidepack.toml"),
        "[renderer]\nprogram = \"sh\"\nargs = [\"-c\", \"exit 1\"]\n",
    )
    .unwrap();

    let out = guidepack(tmp.path(), &["build"]);

    assert!(!out.status.success());
    assert!(!tmp.path().join("dist.tar.gz").exists());
}

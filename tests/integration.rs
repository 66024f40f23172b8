use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn inject_hashes(dir: &Path, args: &[&str]) -> Output {
    return Command::new(env!("CARGO_BIN_EXE_inject-hashes"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap();
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const CONFIG: &str = r#"dirs = ["site"]
mask = ["*.html"]

[[files]]
ref = "app.js"
location = "assets/app.js"
"#;

const PAGE: &str = "<!DOCTYPE html>\n<html>\n<head>\n  <script src=\"app.js\"></script>\n</head>\n</html>\n";

#[test]
fn end_to_end_renames_asset_and_rewrites_page() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    write(dir, "hashes.toml", CONFIG);
    write(dir, "assets/app.js", "console.log(1);\n");
    write(dir, "site/index.html", PAGE);
    write(dir, "site/readme.txt", "<script src=\"app.js\"></script>");

    let out = inject_hashes(dir, &["--config", "hashes.toml"]);
    assert!(out.status.success(), "run failed: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "Hashed 1 assets, rewrote 1 documents (1 references)"
    );
    assert!(out.stderr.is_empty(), "quiet mode wrote to stderr");

    assert!(!dir.join("assets/app.js").exists());
    assert_eq!(fs::read_to_string(dir.join("assets/app-6a9f696c.js")).unwrap(), "console.log(1);\n");
    assert_eq!(
        fs::read_to_string(dir.join("site/index.html")).unwrap(),
        PAGE.replace("app.js", "app-6a9f696c.js")
    );
    assert_eq!(fs::read_to_string(dir.join("site/index.html.bak")).unwrap(), PAGE);
    assert_eq!(fs::read_to_string(dir.join("site/readme.txt")).unwrap(), "<script src=\"app.js\"></script>");

    let mut names: Vec<String> = fs::read_dir(dir.join("site"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["index.html", "index.html.bak", "readme.txt"]);
}

#[test]
fn verbose_mode_traces_matches() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    write(dir, "hashes.toml", CONFIG);
    write(dir, "assets/app.js", "console.log(1);\n");
    write(dir, "site/index.html", PAGE);

    let out = inject_hashes(dir, &["--config", "hashes.toml", "--verbose"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("replacing 'app.js' to 'app-6a9f696c.js'"), "stderr: {stderr}");
    assert!(stderr.contains("applying rules to <script>"), "stderr: {stderr}");
}

#[test]
fn missing_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let out = inject_hashes(tmp.path(), &["--config", "absent.toml"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Config Not Found"));
}

#[test]
fn missing_asset_fails_before_touching_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    write(dir, "hashes.toml", CONFIG);
    write(dir, "site/index.html", PAGE);

    let out = inject_hashes(dir, &["--config", "hashes.toml"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(fs::read_to_string(dir.join("site/index.html")).unwrap(), PAGE);
    assert!(!dir.join("site/index.html.bak").exists());
}

#[test]
fn config_flag_is_required() {
    let tmp = tempfile::tempdir().unwrap();
    let out = inject_hashes(tmp.path(), &[]);
    assert!(!out.status.success());
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const CONFIG: &str = r#"
[package]
name = "net"
version = "1.0.0"

[docs]
languages = ["en", "zh"]
versions = ["1.0", "1.2"]
folders = ["include"]
suffixes = ["hpp"]
output = "docs/build"
doxyfile = "Doxyfile"

[modules]
marker = "Conan"
module_suffix = "cppm"
std_modules = ["vector"]
user_modules = ["util"]
"#;

const DECLARATION: &str = "\
// Conan::ImportStart
#pragma once
#include <vector>
#include \"legacy.hpp\"
// Conan::ImportEnd



/**
 * @brief [en] Trains the net.
 * @brief [zh] 训练网络。
 * @since 1.0
 * @exporter
 */
void train();



/**
 * @brief [en] Newer entry point.
 * @since 1.2
 */
void newer();
";

const DEFINITION: &str = "\
// Conan::ImportStart
#include \"net.hpp\"
#include \"util.hpp\"
// Conan::ImportEnd


/**
 * @exporter
 */
void train() {}


/**
 * @attacher
 */
static int helper() { return 1; }
";

const TEMPLATE: &str = "PROJECT_NAME = %LIB_NAME%\nOUTPUT_LANGUAGE = %FULL_LAN%\nPROJECT_NUMBER = %VER%\nFILE_PATTERNS = %PATTERNS%\n";

fn splice(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_splice"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute splice")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// A project with one declaration/definition pair and a Doxyfile template.
fn setup_project() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path();
    fs::create_dir_all(root.join("include")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("splice.toml"), CONFIG).unwrap();
    fs::write(root.join("include/net.hpp"), DECLARATION).unwrap();
    fs::write(root.join("src/net.cpp"), DEFINITION).unwrap();
    fs::write(root.join("Doxyfile"), TEMPLATE).unwrap();
    dir
}

fn tree_file(root: &Path, lang: &str, version: Option<&str>) -> PathBuf {
    let build = root.join("docs/build").join(lang);
    match version {
        None => build.join(format!("_{}_docstrings", lang)).join("net.hpp"),
        Some(v) => build
            .join(format!("v{}", v))
            .join(format!("_{}_v{}_docstrings", lang, v))
            .join("net.hpp"),
    }
}

#[test]
fn test_docs_builds_every_tree() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["docs"]);
    assert!(output.status.success(), "docs failed: {}", stderr(&output));

    let en = fs::read_to_string(tree_file(root, "en", None)).unwrap();
    assert!(en.contains(" * @brief Trains the net."));
    assert!(!en.contains("训练网络"));
    assert!(en.contains("void newer();"));

    let zh = fs::read_to_string(tree_file(root, "zh", None)).unwrap();
    assert!(zh.contains(" * @brief 训练网络。"));
    assert!(!zh.contains("Trains the net"));

    let en_10 = fs::read_to_string(tree_file(root, "en", Some("1.0"))).unwrap();
    assert!(en_10.contains("void train();"));
    assert!(!en_10.contains("void newer();"));

    let en_12 = fs::read_to_string(tree_file(root, "en", Some("1.2"))).unwrap();
    assert!(en_12.contains("void newer();"));
}

#[test]
fn test_docs_writes_doxyfiles_and_index() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["docs"]);
    assert!(output.status.success(), "docs failed: {}", stderr(&output));

    let doxyfile = fs::read_to_string(root.join("docs/build/zh/v1.2/Doxyfile.in")).unwrap();
    assert!(doxyfile.contains("PROJECT_NAME = net"));
    assert!(doxyfile.contains("OUTPUT_LANGUAGE = Chinese"));
    assert!(doxyfile.contains("PROJECT_NUMBER = 1.2"));
    assert!(doxyfile.contains("FILE_PATTERNS = *.hpp"));

    let index = fs::read_to_string(root.join("docs/build/docs.html")).unwrap();
    assert!(index.contains("v1.2"));
    assert!(index.contains("v1.0"));
    assert!(index.find("v1.2") < index.find("v1.0"), "newest version first");
}

#[test]
fn test_docs_rejects_unknown_language_before_writing() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["docs", "--lang", "fr"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("fr"));
    assert!(!root.join("docs/build").exists());
}

#[test]
fn test_docs_json_report() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["--json", "docs", "--lang", "en"]);
    assert!(output.status.success(), "docs failed: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["sources"], 1);
    assert_eq!(report["trees"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_modules_generates_unit_beside_definition() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["modules"]);
    assert!(output.status.success(), "modules failed: {}", stderr(&output));

    let unit = fs::read_to_string(root.join("src/net.cppm")).unwrap();
    assert!(unit.starts_with("module;\n"));
    assert!(unit.contains("import <vector>;"));
    assert!(unit.contains("import \"util.hpp\";"));
    assert!(unit.contains("export module net;"));
    assert!(unit.contains("// Conan::Escape #include \"legacy.hpp\""));
    assert!(unit.contains("export void train();"));
    assert!(!unit.contains("#pragma once"));
    assert!(!unit.contains("import \"net.hpp\";"));
}

#[test]
fn test_modules_dry_run_writes_nothing() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["modules", "--dry-run"]);
    assert!(output.status.success(), "modules failed: {}", stderr(&output));
    assert!(!root.join("src/net.cppm").exists());
}

#[test]
fn test_modules_missing_definition_fails() {
    let dir = setup_project();
    let root = dir.path();
    fs::write(root.join("include/orphan.hpp"), "void orphan();\n").unwrap();

    let output = splice(root, &["modules"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("orphan"));
    // the healthy pair is still generated
    assert!(root.join("src/net.cppm").exists());
}

#[test]
fn test_modules_removes_stale_units() {
    let dir = setup_project();
    let root = dir.path();
    fs::write(root.join("src/gone.cppm"), "module;\n").unwrap();

    let output = splice(root, &["modules"]);
    assert!(output.status.success(), "modules failed: {}", stderr(&output));
    assert!(!root.join("src/gone.cppm").exists());
}

#[test]
fn test_slice_prints_filtered_file() {
    let dir = setup_project();
    let root = dir.path();
    let file = root.join("include/net.hpp");

    let output = splice(root, &["slice", file.to_str().unwrap(), "--lang", "zh"]);
    assert!(output.status.success(), "slice failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains(" * @brief 训练网络。"));
    assert!(!text.contains("[zh]"));

    let output = splice(
        root,
        &["slice", file.to_str().unwrap(), "--lang", "en", "--doc-version", "1.0"],
    );
    assert!(output.status.success());
    assert!(!stdout(&output).contains("newer"));
}

#[test]
fn test_slice_rejects_overlapping_language_block() {
    let dir = setup_project();
    let root = dir.path();
    let file = root.join("include/broken.hpp");
    fs::write(&file, "/**\n * @brief [en] never closed\n */\nvoid f();\n").unwrap();

    let output = splice(root, &["slice", file.to_str().unwrap(), "--lang", "en"]);
    assert!(!output.status.success());
}

#[test]
fn test_synth_prints_unit() {
    let dir = setup_project();
    let root = dir.path();
    let decl = root.join("include/net.hpp");
    let def = root.join("src/net.cpp");

    let output = splice(root, &["synth", decl.to_str().unwrap(), def.to_str().unwrap()]);
    assert!(output.status.success(), "synth failed: {}", stderr(&output));
    assert!(stdout(&output).contains("export module net;"));
    assert!(!root.join("src/net.cppm").exists());
}

#[test]
fn test_missing_config_reports_tip() {
    let dir = tempfile::tempdir().unwrap();
    let output = splice(dir.path(), &["modules"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("splice.toml not found"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("splice.toml"),
        "[package]\nname = \"net\"\n\n[docs]\nversions = [\"1.x\"]\n",
    )
    .unwrap();
    let output = splice(dir.path(), &["docs"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid configuration"));
}

#[test]
fn test_init_then_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let output = splice(root, &["init", "mylib"]);
    assert!(output.status.success(), "init failed: {}", stderr(&output));
    let text = fs::read_to_string(root.join("splice.toml")).unwrap();
    assert!(text.contains("name = \"mylib\""));

    let output = splice(root, &["init", "mylib"]);
    assert!(!output.status.success());
}

#[test]
fn test_guide_without_project() {
    let dir = tempfile::tempdir().unwrap();
    let output = splice(dir.path(), &["guide", "modules"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("// Conan::ImportStart"));
}

#[test]
fn test_c_compat_wraps_once() {
    let dir = setup_project();
    let root = dir.path();
    fs::write(root.join("include/plain.h"), "#pragma once\nint plain(void);\n").unwrap();

    let output = splice(root, &["c-compat"]);
    assert!(output.status.success(), "c-compat failed: {}", stderr(&output));
    let text = fs::read_to_string(root.join("include/plain.h")).unwrap();
    assert!(text.starts_with("#pragma once\n#ifdef __cplusplus\nextern \"C\" {\n#endif\n"));
    assert!(text.contains("    int plain(void);"));

    let output = splice(root, &["c-compat"]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(root.join("include/plain.h")).unwrap(), text);
}

#[test]
fn test_strip_tags_removes_directives() {
    let dir = setup_project();
    let root = dir.path();

    let output = splice(root, &["strip-tags"]);
    assert!(output.status.success(), "strip-tags failed: {}", stderr(&output));
    let decl = fs::read_to_string(root.join("include/net.hpp")).unwrap();
    let def = fs::read_to_string(root.join("src/net.cpp")).unwrap();
    assert!(!decl.contains("@exporter"));
    assert!(!def.contains("@exporter"));
    assert!(!def.contains("@attacher"));
    assert!(decl.contains(" * @since 1.0"));
}

#[test]
fn test_clean_removes_generated_modules() {
    let dir = setup_project();
    let root = dir.path();

    assert!(splice(root, &["modules"]).status.success());
    assert!(root.join("src/net.cppm").exists());

    let output = splice(root, &["clean", "--modules"]);
    assert!(output.status.success(), "clean failed: {}", stderr(&output));
    assert!(!root.join("src/net.cppm").exists());
    assert!(root.join("src/net.cpp").exists());
}

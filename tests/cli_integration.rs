//! CLI integration tests for depplan
//!
//! These run the built binary against manifests and package indexes on disk
//! and check the plan, the written artifacts and the structured failures.

use predicates::prelude::*;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LINUX: [&str; 4] = ["os=Linux", "compiler=gcc", "build_type=Release", "arch=x86_64"];
const WINDOWS: [&str; 4] = ["os=Windows", "compiler=msvc", "build_type=Release", "arch=x86_64"];

/// Get a command instance for the depplan binary, isolated from user config
fn depplan_cmd(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("depplan"));
    cmd.env("DEPPLAN_CONFIG_DIR", config_dir)
        .env_remove("DEPPLAN_INDEX")
        .env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn setting_args(settings: &[&str]) -> Vec<String> {
    settings.iter().flat_map(|s| ["--setting".to_string(), s.to_string()]).collect()
}

fn write_manifest(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(
        &path,
        format!("settings = [\"os\", \"compiler\", \"build_type\", \"arch\"]\n{}", body),
    )
    .unwrap();
    path
}

/// Resolves a manifest in JSON mode and returns the parsed plan
fn resolve_json<S: AsRef<OsStr>>(config_dir: &Path, manifest: &Path, extra: &[S]) -> serde_json::Value {
    let output = depplan_cmd(config_dir)
        .args(["--format", "json", "resolve"])
        .arg(manifest)
        .args(extra)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "resolve failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn node_names(plan: &serde_json::Value) -> Vec<String> {
    plan["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["name"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Init
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();

    depplan_cmd(config.path())
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized depplan project"));

    assert!(dir.path().join(".depplan/config.toml").is_file());
    assert!(dir.path().join(".depplan/plugins").is_dir());
}

#[test]
fn test_init_is_idempotent() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();

    depplan_cmd(config.path()).arg("init").arg(dir.path()).assert().success();
    depplan_cmd(config.path()).arg("init").arg(dir.path()).assert().success();
}

// =============================================================================
// Resolve
// =============================================================================

#[test]
fn test_end_to_end_two_node_plan() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "depplan.toml",
        "requires = [\"qt/6.0.2\", \"boost/1.74.0\"]\n\n[options]\n\"boost:without_thread\" = true\n",
    );

    let plan = resolve_json(config.path(), &manifest, &setting_args(&LINUX));

    assert_eq!(plan["nodes"].as_array().unwrap().len(), 2);
    let boost = plan["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["name"] == "boost")
        .unwrap();
    assert_eq!(boost["options"]["without_thread"], true);
    assert_eq!(plan["settings"]["os"], "Linux");
    assert_eq!(plan["fingerprint"].as_str().unwrap().len(), 64);
}

#[test]
fn test_text_output_lists_packages() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"qt/6.0.2\"]\n");

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .assert()
        .success()
        .stdout(predicate::str::contains("qt/6.0.2"))
        .stdout(predicate::str::contains("Fingerprint:"));
}

#[test]
fn test_index_expands_transitive_requirements() {
    let config = TempDir::new().unwrap();
    let index = fixture("index.toml");
    let mut args = setting_args(&LINUX);
    args.extend(["--index".to_string(), index.display().to_string()]);

    let plan = resolve_json(config.path(), &fixture("current.toml"), &args);
    let names = node_names(&plan);

    assert_eq!(names.len(), 8);
    assert!(names.contains(&"ncurses".to_string()));
    assert!(!names.contains(&"pdcurses".to_string()));

    // Override pins the transitive openssl/1.0.2 request
    let openssl: Vec<_> = plan["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|node| node["name"] == "openssl")
        .collect();
    assert_eq!(openssl.len(), 1);
    assert_eq!(openssl[0]["version"], "1.1.1i");

    // Dependencies come before dependents
    let position = |name: &str| names.iter().position(|n| n == name).unwrap();
    assert!(position("zlib") < position("openssl"));
    assert!(position("openssl") < position("libcurl"));
    assert!(position("fmt") < position("spdlog"));

    // Manifest options override provider defaults; untouched defaults remain
    let libcurl = &plan["nodes"][position("libcurl")];
    assert_eq!(libcurl["options"]["with_ssl"], "openssl");
    assert_eq!(libcurl["options"]["shared"], false);
    let qt = &plan["nodes"][position("qt")];
    assert_eq!(qt["options"]["shared"], true);
    assert_eq!(qt["options"]["with_pq"], true);
}

#[test]
fn test_conditional_requirement_follows_os() {
    let config = TempDir::new().unwrap();
    let index = fixture("index.toml").display().to_string();

    let run = |settings: &[&str]| {
        let mut args = setting_args(settings);
        args.extend(["--index".to_string(), index.clone()]);
        node_names(&resolve_json(config.path(), &fixture("current.toml"), &args))
    };

    let windows = run(&WINDOWS);
    let linux = run(&LINUX);

    assert!(windows.contains(&"pdcurses".to_string()));
    assert!(!windows.contains(&"ncurses".to_string()));
    assert!(linux.contains(&"ncurses".to_string()));
    assert!(!linux.contains(&"pdcurses".to_string()));
}

#[test]
fn test_index_from_environment() {
    let config = TempDir::new().unwrap();

    let output = depplan_cmd(config.path())
        .env("DEPPLAN_INDEX", fixture("index.toml"))
        .args(["--format", "json", "resolve"])
        .arg(fixture("current.toml"))
        .args(setting_args(&LINUX))
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(node_names(&plan).contains(&"zlib".to_string()));
}

#[test]
fn test_resolve_is_deterministic() {
    let config = TempDir::new().unwrap();
    let index = fixture("index.toml").display().to_string();
    let mut args = setting_args(&LINUX);
    args.extend(["--index".to_string(), index]);

    let first = resolve_json(config.path(), &fixture("current.toml"), &args);
    let second = resolve_json(config.path(), &fixture("current.toml"), &args);

    assert_eq!(first, second);
}

#[test]
fn test_legacy_yaml_manifest() {
    let config = TempDir::new().unwrap();
    let args = setting_args(&WINDOWS);

    let plan = resolve_json(config.path(), &fixture("legacy.yaml"), &args);

    let pdcurses = plan["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["name"] == "pdcurses")
        .unwrap();
    assert_eq!(pdcurses["channel"], "bincrafters/stable");

    let boost = plan["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["name"] == "boost")
        .unwrap();
    assert_eq!(boost["options"]["without_thread"], true);
    assert_eq!(boost["options"]["shared"], false);
    assert_eq!(plan["generator_directives"][0]["generator"], "cmake");
}

#[test]
fn test_option_flag_wins_over_manifest() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "depplan.toml",
        "requires = [\"boost/1.74.0\"]\noptions = [\"boost:shared=True\"]\n",
    );

    let mut args = setting_args(&LINUX);
    args.extend(["--option".to_string(), "boost:shared=False".to_string()]);

    let plan = resolve_json(config.path(), &manifest, &args);
    assert_eq!(plan["nodes"][0]["options"]["shared"], false);
}

#[test]
fn test_out_dir_writes_artifacts() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("build");
    let manifest = write_manifest(
        dir.path(),
        "depplan.toml",
        "requires = [\"zlib/1.2.11\"]\ngenerators = [\"cmake\", \"env\", \"json\", \"make\"]\n",
    );

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success();

    let cmake = fs::read_to_string(out.join("depplan.cmake")).unwrap();
    assert!(cmake.contains("set(DEPPLAN_ZLIB_VERSION \"1.2.11\")"));
    assert!(fs::read_to_string(out.join("depplan.env")).unwrap().contains("export DEPPLAN_ZLIB_VERSION='1.2.11'"));
    assert!(fs::read_to_string(out.join("depplan.mk")).unwrap().contains("DEPPLAN_ZLIB_VERSION := 1.2.11"));

    let lock: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("depplan.lock.json")).unwrap()).unwrap();
    assert_eq!(lock["packages"][0]["name"], "zlib");
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_project_profile_supplies_settings() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    depplan_cmd(config.path()).arg("init").arg(dir.path()).assert().success();
    fs::write(
        dir.path().join(".depplan/config.toml"),
        "[profile]\nos = \"Linux\"\ncompiler = \"gcc\"\nbuild_type = \"Debug\"\narch = \"armv8\"\n",
    )
    .unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"qt/6.0.2\"]\n");

    let plan = resolve_json(config.path(), &manifest, &["--setting", "build_type=Release"]);

    assert_eq!(plan["settings"]["arch"], "armv8");
    assert_eq!(plan["settings"]["build_type"], "Release");
}

#[test]
fn test_project_index_from_config() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".depplan")).unwrap();
    fs::copy(fixture("index.toml"), dir.path().join("packages.toml")).unwrap();
    fs::write(
        dir.path().join(".depplan/config.toml"),
        "[provider]\nindex = \"packages.toml\"\n",
    )
    .unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"spdlog/1.8.1\"]\n");

    let args = setting_args(&LINUX);
    let plan = resolve_json(config.path(), &manifest, &args);

    assert_eq!(node_names(&plan), vec!["fmt", "spdlog"]);
}

#[test]
fn test_global_default_format() {
    let config = TempDir::new().unwrap();
    fs::write(config.path().join("config.toml"), "default_format = \"json\"\n").unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"qt/6.0.2\"]\n");

    let output = depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["nodes"][0]["name"], "qt");
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_version_conflict_exit_code() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "depplan.toml",
        "requires = [\"boost/1.68.0\", \"boost/1.74.0\"]\n",
    );

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .assert()
        .code(5)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error [version_conflict]"))
        .stderr(predicate::str::contains("1.68.0, 1.74.0"));
}

#[test]
fn test_dangling_option_json_error() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "depplan.toml",
        "requires = [\"qt/6.0.2\"]\n\n[options]\n\"pq:shared\" = true\n",
    );

    let output = depplan_cmd(config.path())
        .args(["--format", "json", "resolve"])
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    assert!(output.stdout.is_empty());
    let error: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["success"], false);
    assert_eq!(error["kind"], "dangling_option");
}

#[test]
fn test_unknown_generator() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "depplan.toml",
        "requires = [\"qt/6.0.2\"]\ngenerators = \"scons\"\n",
    );

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .assert()
        .code(9)
        .stderr(predicate::str::contains("Error [unknown_generator]"));
}

#[test]
fn test_malformed_manifest() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("depplan.toml");
    fs::write(&manifest, "requires = [\"qt/6.0.2\"]\n").unwrap();

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error [malformed_manifest]"));
}

#[test]
fn test_unbound_setting() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"qt/6.0.2\"]\n");

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(["--setting", "os=Linux"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error [unbound_setting]"));
}

#[test]
fn test_unknown_setting_axis() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"qt/6.0.2\"]\n");

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(["--setting", "kernel=5.10"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error [unknown_setting_axis]"));
}

#[test]
fn test_missing_package_in_index() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"sqlite3/3.34.0\"]\n");

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .arg("--index")
        .arg(fixture("index.toml"))
        .assert()
        .code(8)
        .stderr(predicate::str::contains("Error [unresolvable_package]"))
        .stderr(predicate::str::contains("sqlite3/3.34.0"));
}

#[test]
fn test_cyclic_requirement() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index.toml");
    fs::write(
        &index,
        "[[package]]\nref = \"a/1.0\"\nrequires = [\"b/1.0\"]\n\n[[package]]\nref = \"b/1.0\"\nrequires = [\"a/1.0\"]\n",
    )
    .unwrap();
    let manifest = write_manifest(dir.path(), "depplan.toml", "requires = [\"a/1.0\"]\n");

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(&manifest)
        .args(setting_args(&LINUX))
        .arg("--index")
        .arg(&index)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("a -> b -> a"));
}

#[test]
fn test_missing_manifest_file() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();

    depplan_cmd(config.path())
        .arg("resolve")
        .arg(dir.path().join("nope.toml"))
        .args(setting_args(&LINUX))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read manifest"));
}

// =============================================================================
// Generators
// =============================================================================

#[test]
fn test_generators_lists_builtins() {
    let config = TempDir::new().unwrap();

    depplan_cmd(config.path())
        .arg("generators")
        .assert()
        .success()
        .stdout(predicate::str::contains("cmake"))
        .stdout(predicate::str::contains("json"))
        .stdout(predicate::str::contains("builtin"));
}

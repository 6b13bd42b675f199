use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Repository, cache and config in one temporary directory
struct TestEnvironment {
    dir: TempDir,
}

impl TestEnvironment {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Four items: a variant of Player, which uses a material, which uses a texture
    fn with_items() -> Self {
        let env = Self::new();
        env.write_item(
            "Player",
            r#"{
                "objects": [{
                    "name": "Player",
                    "components": [
                        {
                            "type_name": "Renderer",
                            "fields": [
                                { "name": "m_Material", "value": { "kind": "reference", "value": "Materials/Red.item.json" } },
                                { "name": "m_Font", "value": { "kind": "reference", "value": "Library/UnityEngine.dll" } }
                            ]
                        },
                        {
                            "type_name": "Label",
                            "fields": [
                                { "name": "m_Title", "value": { "kind": "string", "value": "menu.title" } }
                            ]
                        }
                    ]
                }]
            }"#,
        );
        env.write_item(
            "Materials/Red",
            r#"{
                "components": [{
                    "type_name": "Material",
                    "fields": [
                        { "name": "m_Texture", "value": { "kind": "reference", "value": "Textures/Brick.item.json" } }
                    ]
                }]
            }"#,
        );
        env.write_item("Textures/Brick", "{}");
        env.write_item(
            "Variant",
            r#"{ "variant": { "role": "variant_of", "base": "Player.item.json" } }"#,
        );
        env
    }

    fn repository(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn write_item(&self, id: &str, json: &str) {
        let path = self.repository().join(format!("{}.item.json", id));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, json).unwrap();
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("depcache").unwrap();
        cmd.env_remove("DEPCACHE_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path())
            .arg("--cache-dir")
            .arg(self.cache_dir())
            .arg("--repository")
            .arg(self.repository());
        cmd
    }

    fn build(&self) {
        self.command().arg("build").assert().success();
    }
}

fn cache_file(dir: &Path) -> PathBuf {
    dir.join("AssetDependencyCache_v1.cache")
}

#[test]
fn test_build_writes_cache() {
    let env = TestEnvironment::with_items();

    env.command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 items: 4 rebuilt"));

    assert!(cache_file(&env.cache_dir()).exists());
}

#[test]
fn test_build_reports_missing_targets() {
    let env = TestEnvironment::with_items();
    env.write_item(
        "Broken",
        r#"{
            "components": [{
                "type_name": "Material",
                "fields": [
                    { "name": "m_Texture", "value": { "kind": "reference", "value": "Textures/Gone.item.json" } }
                ]
            }]
        }"#,
    );

    env.command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 references to items missing"));
}

#[test]
fn test_second_build_is_incremental() {
    let env = TestEnvironment::with_items();
    env.build();

    env.command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 rebuilt, 4 up to date"));

    env.command()
        .args(["build", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 rebuilt"));
}

#[test]
fn test_removed_item_is_dropped() {
    let env = TestEnvironment::with_items();
    env.build();

    fs::remove_file(env.repository().join("Variant.item.json")).unwrap();
    env.command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 removed"));
}

#[test]
fn test_deps_lists_direct_dependencies() {
    let env = TestEnvironment::with_items();
    env.build();

    env.command()
        .args(["deps", "Player"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Materials/Red"))
        .stdout(predicate::str::contains("Player/Renderer/m_Material"))
        .stdout(predicate::str::contains("UnityEngine").not());
}

#[test]
fn test_deps_json() {
    let env = TestEnvironment::with_items();
    env.build();

    let output = env
        .command()
        .args(["--format", "json", "deps", "Variant"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let edges: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let edges = edges.as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["target"], "Player");
    assert_eq!(edges[0]["connection_type"], "Object");
    assert_eq!(edges[0]["path"][0]["name"], "Variant Of");
    assert_eq!(edges[0]["path"][0]["kind"], "component");
}

#[test]
fn test_transitive_dependents() {
    let env = TestEnvironment::with_items();
    env.build();

    env.command()
        .args(["dependents", "Textures/Brick", "--depth", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 found"))
        .stdout(predicate::str::contains("Materials/Red"))
        .stdout(predicate::str::contains("Variant"));
}

#[test]
fn test_path_between_items() {
    let env = TestEnvironment::with_items();
    env.build();

    env.command()
        .args(["path", "Variant", "Textures/Brick"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Variant -> Player -> Materials/Red -> Textures/Brick",
        ));

    env.command()
        .args(["path", "Textures/Brick", "Variant"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependency chain"));
}

#[test]
fn test_show_missing_target() {
    let env = TestEnvironment::with_items();
    env.build();
    fs::remove_file(env.repository().join("Textures/Brick.item.json")).unwrap();
    env.build();

    env.command()
        .args(["show", "Textures/Brick"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing"));

    env.command()
        .args(["show", "Nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the cache"));
}

#[test]
fn test_localization_keys_from_config() {
    let env = TestEnvironment::with_items();

    env.command()
        .args(["config", "set", "traversal.localization_properties", "m_Title"])
        .assert()
        .success();
    env.build();

    env.command()
        .args(["deps", "Player"])
        .assert()
        .success()
        .stdout(predicate::str::contains("menu.title"))
        .stdout(predicate::str::contains("LocaKey"))
        .stdout(predicate::str::contains("localization"));
}

#[test]
fn test_query_before_build() {
    let env = TestEnvironment::with_items();

    env.command()
        .args(["deps", "Player"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Cache is empty"));

    env.command()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("(not built)"));
}

#[test]
fn test_corrupt_cache_triggers_rebuild() {
    let env = TestEnvironment::with_items();
    env.build();

    let path = cache_file(&env.cache_dir());
    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() / 2);
    fs::write(&path, bytes).unwrap();

    env.command()
        .args(["deps", "Player"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Cache is empty"));

    env.command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 rebuilt"));
}

#[test]
fn test_stats_and_clear() {
    let env = TestEnvironment::with_items();
    env.build();

    env.command()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodes: 4"))
        .stdout(predicate::str::contains("dependencies: 3"));

    env.command()
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared cache"));
    assert!(!cache_file(&env.cache_dir()).exists());
}

#[test]
fn test_build_without_repository() {
    let env = TestEnvironment::new();
    let mut cmd = Command::cargo_bin("depcache").unwrap();
    cmd.env_remove("DEPCACHE_CONFIG")
        .arg("--config")
        .arg(env.config_path())
        .arg("--cache-dir")
        .arg(env.cache_dir())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No repository given"));
}

#[test]
fn test_config_get_set() {
    let env = TestEnvironment::new();

    env.command()
        .args(["config", "set", "traversal.max_depth", "16"])
        .assert()
        .success();
    env.command()
        .args(["config", "get", "traversal.max_depth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("16"));
    env.command()
        .args(["config", "get", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));

    let content = fs::read_to_string(env.config_path()).unwrap();
    assert!(content.contains("max_depth = 16"));
}

#[test]
fn test_completions() {
    let env = TestEnvironment::new();
    env.command()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("depcache"));
}

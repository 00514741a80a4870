use workspace_tests::{members, read_manifest, root_manifest, workspace_root};

/// Declared `[lib]` / `[[bin]]` targets must point at files that exist
#[test]
fn test_declared_targets_exist() {
    let root = root_manifest().unwrap();
    for member in members(&root) {
        let dir = workspace_root().join(&member);
        let manifest = read_manifest(&dir.join("Cargo.toml")).unwrap();

        if let Some(lib) = manifest.get("lib") {
            let path = lib.get("path").and_then(|p| p.as_str()).unwrap_or("src/lib.rs");
            assert!(dir.join(path).exists(), "{}: missing {}", member, path);
        }

        if let Some(bins) = manifest.get("bin").and_then(|b| b.as_array()) {
            for bin in bins {
                let path = bin.get("path").and_then(|p| p.as_str()).unwrap_or("src/main.rs");
                assert!(dir.join(path).exists(), "{}: missing {}", member, path);
            }
        }

        assert!(
            dir.join("src/lib.rs").exists() || dir.join("src/main.rs").exists(),
            "{} has neither lib.rs nor main.rs",
            member
        );
    }
}

#[test]
fn test_cli_crate_is_library_and_binary() {
    let dir = workspace_root().join("flow-video");
    let manifest = read_manifest(&dir.join("Cargo.toml")).unwrap();
    assert!(manifest.contains_key("lib"));
    let bins = manifest["bin"].as_array().unwrap();
    assert_eq!(bins[0]["name"].as_str(), Some("flow-video"));
}

#[test]
fn test_engine_is_library_only() {
    let dir = workspace_root().join("flow-engine");
    assert!(dir.join("src/lib.rs").exists());
    assert!(!dir.join("src/main.rs").exists());
}

use proptest::prelude::*;
use workspace_tests::{
    dependency_entries, inherits_workspace, members, read_manifest, root_manifest,
    shared_dependencies, workspace_root,
};

/// Any dependency also declared in `[workspace.dependencies]` must inherit it
/// with `workspace = true` instead of pinning its own version.
#[test]
fn test_shared_dependencies_inherit_from_workspace() {
    let root = root_manifest().unwrap();
    let shared = shared_dependencies(&root);
    assert!(!shared.is_empty(), "Root manifest declares no shared dependencies");

    for member in members(&root) {
        let manifest = read_manifest(&workspace_root().join(&member).join("Cargo.toml")).unwrap();
        for (section, name, decl) in dependency_entries(&manifest) {
            if shared.contains(&name) {
                assert!(
                    inherits_workspace(&decl),
                    "{} [{}] pins {} instead of using workspace = true",
                    member,
                    section,
                    name
                );
            }
        }
    }
}

#[test]
fn test_members_inherit_package_metadata() {
    let root = root_manifest().unwrap();
    for member in members(&root) {
        let manifest = read_manifest(&workspace_root().join(&member).join("Cargo.toml")).unwrap();
        let package = manifest.get("package").unwrap();
        for key in ["version", "edition"] {
            assert!(
                inherits_workspace(package.get(key).unwrap()),
                "{} does not inherit package.{} from the workspace",
                member,
                key
            );
        }
    }
}

#[test]
fn test_engine_stack_is_present() {
    let root = root_manifest().unwrap();
    let shared = shared_dependencies(&root);
    for dep in ["tokio", "chromiumoxide", "thiserror", "tracing", "clap", "proptest"] {
        assert!(shared.iter().any(|d| d == dep), "{} missing from workspace", dep);
    }
}

proptest! {
    /// Inheritance detection only accepts an explicit `workspace = true`
    #[test]
    fn prop_inherits_workspace_detection(version in "[0-9]{1,2}\\.[0-9]{1,2}", flag in any::<bool>()) {
        let pinned: toml::Table = format!("dep = \"{}\"", version).parse().unwrap();
        prop_assert!(!inherits_workspace(&pinned["dep"]));

        let table: toml::Table = format!("dep = {{ workspace = {} }}", flag).parse().unwrap();
        prop_assert_eq!(inherits_workspace(&table["dep"]), flag);
    }
}

use std::sync::{Arc, Mutex};

use glyph_config::ConfigHandle;
use glyph_core::VcsStatus;
use glyph_engine::{IconHints, IconService, IconTarget, StrategyManager};
use glyph_session::Storage;
use glyph_tables::IconTables;
use pretty_assertions::assert_eq;

struct TestTarget {
    classes: Mutex<Vec<String>>,
}

impl TestTarget {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            classes: Mutex::new(Vec::new()),
        })
    }

    fn classes(&self) -> Vec<String> {
        self.classes.lock().unwrap().clone()
    }
}

impl IconTarget for TestTarget {
    fn apply_classes(&self, classes: &[String]) {
        *self.classes.lock().unwrap() = classes.to_vec();
    }
}

fn service() -> (Arc<ConfigHandle>, Arc<Storage>, IconService) {
    let tables = IconTables::load().unwrap();
    let config = ConfigHandle::with_defaults();
    let storage = Storage::new(64);
    let manager = StrategyManager::new(tables, Arc::clone(&config), Arc::clone(&storage));
    let service = IconService::new(manager, Arc::clone(&config));
    (config, storage, service)
}

#[test]
fn binding_applies_resolved_classes() {
    let (_config, _storage, service) = service();
    let target = TestTarget::new();

    let _handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/main.py",
        IconHints::default(),
    );
    assert_eq!(
        target.classes(),
        vec!["python-icon".to_string(), "dark-blue".to_string()]
    );
}

#[test]
fn unclassified_paths_get_the_default_class() {
    let (_config, _storage, service) = service();
    let target = TestTarget::new();

    let _handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/unknown.zzz",
        IconHints::default(),
    );
    assert_eq!(target.classes(), vec!["default-icon".to_string()]);
}

#[test]
fn settings_changes_reapply_classes() {
    let (config, _storage, service) = service();
    let target = TestTarget::new();

    let _handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/main.py",
        IconHints::default(),
    );
    assert_eq!(target.classes().len(), 2);

    config.update(|settings| settings.coloured = false);
    assert_eq!(target.classes(), vec!["python-icon".to_string()]);
}

#[test]
fn tab_bindings_respect_tab_pane_icon() {
    let (config, _storage, service) = service();
    config.update(|settings| settings.tab_pane_icon = false);

    let target = TestTarget::new();
    let _handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/main.py",
        IconHints {
            is_tab_icon: true,
            ..IconHints::default()
        },
    );
    assert_eq!(target.classes(), vec!["default-icon".to_string()]);

    // Tree-view bindings are unaffected.
    let tree_target = TestTarget::new();
    let _tree = service.add_icon_to_target(
        Some(tree_target.clone()),
        "/repo/main.py",
        IconHints::default(),
    );
    assert_eq!(tree_target.classes().len(), 2);
}

#[test]
fn invalid_input_yields_a_noop_handle() {
    let (_config, storage, service) = service();

    // No target: nothing happens, nothing panics.
    let handle = service.add_icon_to_target(None, "/repo/main.py", IconHints::default());
    handle.release();

    // Empty path: the target is left untouched.
    let target = TestTarget::new();
    let handle = service.add_icon_to_target(Some(target.clone()), "  ", IconHints::default());
    handle.release();
    assert!(target.classes().is_empty());
    assert!(storage.is_empty());
}

#[test]
fn directory_bindings_classify_directories() {
    let (_config, _storage, service) = service();
    let target = TestTarget::new();

    let _handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/node_modules",
        IconHints {
            is_directory: true,
            ..IconHints::default()
        },
    );
    assert_eq!(
        target.classes(),
        vec!["node-icon".to_string(), "medium-green".to_string()]
    );
}

#[test]
fn bindings_share_one_resource_per_path() {
    let (_config, _storage, service) = service();
    let first = TestTarget::new();
    let second = TestTarget::new();

    let _h1 =
        service.add_icon_to_target(Some(first), "/repo/main.py", IconHints::default());
    let resource = service.resource_for_path("/repo/main.py").unwrap();

    let _h2 =
        service.add_icon_to_target(Some(second), "/repo/main.py", IconHints::default());
    let again = service.resource_for_path("/repo/main.py").unwrap();
    assert!(Arc::ptr_eq(&resource, &again));
}

#[test]
fn vcs_changes_gate_colour_classes() {
    let (config, _storage, service) = service();
    config.update(|settings| settings.colour_changed_only = true);

    let target = TestTarget::new();
    let _handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/main.py",
        IconHints::default(),
    );
    // Unchanged in VCS: no colour variant.
    assert_eq!(target.classes(), vec!["python-icon".to_string()]);

    service
        .resource_for_path("/repo/main.py")
        .unwrap()
        .set_vcs_status(VcsStatus::Modified);
    assert_eq!(
        target.classes(),
        vec!["python-icon".to_string(), "dark-blue".to_string()]
    );
}

#[test]
fn destroy_clears_cached_entry_and_registry_slot() {
    let (_config, storage, service) = service();
    let target = TestTarget::new();
    let _handle =
        service.add_icon_to_target(Some(target), "/repo/main.py", IconHints::default());
    assert!(storage.has_icon("/repo/main.py"));

    service
        .resource_for_path("/repo/main.py")
        .unwrap()
        .destroy();
    assert!(!storage.has_icon("/repo/main.py"));
    assert!(service.resource_for_path("/repo/main.py").is_none());
}

#[test]
fn released_binding_stops_updating() {
    let (config, _storage, service) = service();
    let target = TestTarget::new();
    let handle = service.add_icon_to_target(
        Some(target.clone()),
        "/repo/main.py",
        IconHints::default(),
    );
    assert_eq!(target.classes().len(), 2);

    handle.release();
    config.update(|settings| settings.coloured = false);
    // Still whatever was applied before release.
    assert_eq!(target.classes().len(), 2);
}

#[test]
fn deprecated_accessor_reads_the_cache() {
    let (_config, _storage, service) = service();
    let target = TestTarget::new();
    let _handle = service.add_icon_to_target(
        Some(target),
        "/repo/main.py",
        IconHints::default(),
    );

    #[allow(deprecated)]
    let classes = service.icon_class_for_path("/repo/main.py").unwrap();
    assert_eq!(
        classes,
        vec!["python-icon".to_string(), "dark-blue".to_string()]
    );

    #[allow(deprecated)]
    let missing = service.icon_class_for_path("/repo/never-seen");
    assert!(missing.is_none());
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use glyph_config::{ConfigHandle, IconSettings};
use glyph_core::{DisposeBag, Resource, ResourceKind, Subscription};
use glyph_session::Storage;

use crate::manager::StrategyManager;

/// Host-side sink for resolved display classes (a tree-view row, a tab, …).
pub trait IconTarget: Send + Sync {
    fn apply_classes(&self, classes: &[String]);
}

/// Hints accompanying a public icon request.
#[derive(Debug, Clone, Copy, Default)]
pub struct IconHints {
    pub is_directory: bool,
    pub is_symlink: bool,
    pub is_tab_icon: bool,
}

/// The public query surface consumed by integration glue.
///
/// Resources are shared per path: bindings for the same path observe one
/// [`Resource`], and hosts can fetch it via [`IconService::resource_for_path`]
/// to feed stat, VCS, and destroy events into the engine.
pub struct IconService {
    manager: Arc<StrategyManager>,
    storage: Arc<Storage>,
    config: Arc<ConfigHandle>,
    resources: Arc<Mutex<HashMap<String, Weak<Resource>>>>,
    subscriptions: DisposeBag,
}

impl std::fmt::Debug for IconService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconService").finish_non_exhaustive()
    }
}

impl IconService {
    pub fn new(manager: Arc<StrategyManager>, config: Arc<ConfigHandle>) -> Self {
        let storage = Arc::clone(manager.storage());
        Self {
            manager,
            storage,
            config,
            resources: Arc::new(Mutex::new(HashMap::new())),
            subscriptions: DisposeBag::new(),
        }
    }

    /// Classifies `path` and keeps `target`'s classes current across icon
    /// changes, VCS-status changes, settings changes, and destruction.
    ///
    /// Invalid input (no target, empty path) is reported and answered with a
    /// harmless no-op handle so callers' workflows are not interrupted.
    /// Releasing the returned handle unbinds exactly once.
    pub fn add_icon_to_target(
        &self,
        target: Option<Arc<dyn IconTarget>>,
        path: &str,
        hints: IconHints,
    ) -> Subscription {
        let Some(target) = target else {
            tracing::warn!(target = "glyph.engine", path, "no icon target supplied");
            return Subscription::empty();
        };
        if path.trim().is_empty() {
            tracing::warn!(target = "glyph.engine", "empty path in icon request");
            return Subscription::empty();
        }

        let resource = self.obtain_resource(path, hints);
        self.manager.query(&resource);

        let bag = DisposeBag::new();
        let apply: Arc<dyn Fn() + Send + Sync> = {
            let target = Arc::clone(&target);
            let resource = Arc::clone(&resource);
            let config = Arc::clone(&self.config);
            Arc::new(move || {
                let settings = config.get();
                target.apply_classes(&display_classes(&resource, &settings, hints));
            })
        };
        apply();

        {
            let apply = Arc::clone(&apply);
            bag.add(resource.icon().on_did_change_icon(move |_| apply()));
        }
        {
            let apply = Arc::clone(&apply);
            bag.add(resource.on_did_change_vcs_status(move |_| apply()));
        }
        {
            let apply = Arc::clone(&apply);
            bag.add(self.config.on_did_change(move |_| apply()));
        }

        Subscription::new(move || bag.dispose())
    }

    /// Synchronous cache read; returns the stored display classes, if any.
    #[deprecated(note = "use add_icon_to_target and observe changes instead")]
    pub fn icon_class_for_path(&self, path: &str) -> Option<Vec<String>> {
        if path.trim().is_empty() {
            tracing::warn!(target = "glyph.engine", "empty path in icon lookup");
            return None;
        }
        self.storage.get_icon(path).map(|icon| icon.classes)
    }

    /// The live resource for `path`, if any binding is holding one. Hosts
    /// push stat loads, VCS changes, and destroy notifications through this.
    pub fn resource_for_path(&self, path: &str) -> Option<Arc<Resource>> {
        self.lock_resources()
            .get(path)
            .and_then(Weak::upgrade)
            .filter(|resource| !resource.is_destroyed())
    }

    /// Runs a host-owned resource through the strategy pipeline.
    pub fn query(&self, resource: &Arc<Resource>) {
        self.manager.query(resource);
    }

    pub fn manager(&self) -> &Arc<StrategyManager> {
        &self.manager
    }

    fn obtain_resource(&self, path: &str, hints: IconHints) -> Arc<Resource> {
        {
            let resources = self.lock_resources();
            if let Some(existing) = resources.get(path).and_then(Weak::upgrade) {
                if !existing.is_destroyed() {
                    return existing;
                }
            }
        }

        let kind = if hints.is_directory {
            ResourceKind::Directory
        } else {
            ResourceKind::File
        };
        let resource = Resource::new(path, kind, hints.is_symlink);
        self.lock_resources()
            .insert(path.to_string(), Arc::downgrade(&resource));

        // Destruction drops the cached classification and the registry slot.
        let storage = Arc::clone(&self.storage);
        let registry = Arc::clone(&self.resources);
        let key = resource.path_key();
        self.subscriptions
            .add(resource.on_did_destroy(move |_| {
                storage.delete_path(&key);
                match registry.lock() {
                    Ok(mut guard) => {
                        guard.remove(&key);
                    }
                    Err(err) => {
                        err.into_inner().remove(&key);
                    }
                }
            }));

        resource
    }

    fn lock_resources(&self) -> std::sync::MutexGuard<'_, HashMap<String, Weak<Resource>>> {
        match self.resources.lock() {
            Ok(guard) => guard,
            Err(err) => err.into_inner(),
        }
    }
}

fn display_classes(resource: &Resource, settings: &IconSettings, hints: IconHints) -> Vec<String> {
    let icon = resource.icon();
    if hints.is_tab_icon && !settings.tab_pane_icon {
        return icon.fallback_classes(&settings.default_icon_class);
    }
    let coloured =
        settings.coloured && (!settings.colour_changed_only || resource.vcs_status().is_changed());
    icon.classes(coloured)
        .unwrap_or_else(|| icon.fallback_classes(&settings.default_icon_class))
}

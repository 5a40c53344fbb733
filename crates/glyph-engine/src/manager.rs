use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glyph_config::{ConfigHandle, IconSettings};
use glyph_core::{DisposeBag, IconAssignment, Resource};
use glyph_session::{Storage, StoredIcon};
use glyph_tables::{Icon, IconTables};

use crate::strategies::default_strategies;
use crate::strategy::{Strategy, StrategyCtx};

struct RegisteredStrategy {
    strategy: Arc<dyn Strategy>,
    enabled: AtomicBool,
}

/// Owns the ordered strategy lists and runs resources through them.
///
/// Evaluation order is fixed at construction by sorting on declared priority
/// (descending); within one query the first strategy to commit wins and the
/// rest are never consulted. Toggling a strategy takes effect on the next
/// query; continuations already registered by a strategy still fire.
pub struct StrategyManager {
    tables: Arc<IconTables>,
    config: Arc<ConfigHandle>,
    storage: Arc<Storage>,
    registered: Vec<Arc<RegisteredStrategy>>,
    file_order: Vec<Arc<RegisteredStrategy>>,
    dir_order: Vec<Arc<RegisteredStrategy>>,
    self_weak: Weak<StrategyManager>,
    subscriptions: DisposeBag,
}

impl std::fmt::Debug for StrategyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyManager")
            .field("strategies", &self.registered.len())
            .finish_non_exhaustive()
    }
}

impl StrategyManager {
    /// Builds a manager over the built-in strategies.
    pub fn new(
        tables: Arc<IconTables>,
        config: Arc<ConfigHandle>,
        storage: Arc<Storage>,
    ) -> Arc<Self> {
        Self::with_strategies(tables, config, storage, default_strategies())
    }

    /// Builds a manager over an explicit strategy set.
    pub fn with_strategies(
        tables: Arc<IconTables>,
        config: Arc<ConfigHandle>,
        storage: Arc<Storage>,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Arc<Self> {
        let settings = config.get();
        let registered: Vec<Arc<RegisteredStrategy>> = strategies
            .into_iter()
            .map(|strategy| {
                let enabled = initial_enabled(strategy.as_ref(), &settings);
                Arc::new(RegisteredStrategy {
                    strategy,
                    enabled: AtomicBool::new(enabled),
                })
            })
            .collect();

        let mut file_order: Vec<_> = registered
            .iter()
            .filter(|entry| entry.strategy.matches_files())
            .cloned()
            .collect();
        file_order.sort_by(|a, b| b.strategy.priority().cmp(&a.strategy.priority()));

        let mut dir_order: Vec<_> = registered
            .iter()
            .filter(|entry| entry.strategy.matches_dirs())
            .cloned()
            .collect();
        dir_order.sort_by(|a, b| b.strategy.priority().cmp(&a.strategy.priority()));

        let manager = Arc::new_cyclic(|self_weak| Self {
            tables,
            config: Arc::clone(&config),
            storage,
            registered,
            file_order,
            dir_order,
            self_weak: self_weak.clone(),
            subscriptions: DisposeBag::new(),
        });

        let weak = Arc::downgrade(&manager);
        manager.subscriptions.add(config.on_did_change(move |change| {
            if let Some(manager) = weak.upgrade() {
                manager.apply_toggles(&change.current);
            }
        }));

        manager
    }

    /// Runs `resource` through the matching strategy list; the first
    /// committed icon wins. Returns the committed icon, or `None` when every
    /// strategy declined (the resource stays unclassified until a later
    /// event triggers a fresh query).
    pub fn query(&self, resource: &Arc<Resource>) -> Option<Arc<Icon>> {
        if resource.is_destroyed() {
            return None;
        }

        let order = if resource.is_directory() {
            &self.dir_order
        } else {
            &self.file_order
        };
        let ctx = StrategyCtx {
            tables: Arc::clone(&self.tables),
            storage: Arc::clone(&self.storage),
            settings: self.config.get(),
            manager: self.self_weak.clone(),
        };

        for entry in order {
            if !entry.enabled.load(Ordering::Relaxed) {
                continue;
            }
            if let Some(found) = entry.strategy.check(resource, &ctx) {
                self.commit(resource, entry.strategy.as_ref(), &ctx.settings, &found.icon);
                return Some(found.icon);
            }
        }

        tracing::trace!(
            target = "glyph.engine",
            path = %resource.path().display(),
            "no strategy committed an icon"
        );
        None
    }

    /// Whether a named strategy currently participates in queries.
    pub fn strategy_enabled(&self, name: &str) -> Option<bool> {
        self.registered
            .iter()
            .find(|entry| entry.strategy.name() == name)
            .map(|entry| entry.enabled.load(Ordering::Relaxed))
    }

    pub fn tables(&self) -> &Arc<IconTables> {
        &self.tables
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    fn apply_toggles(&self, settings: &IconSettings) {
        for entry in &self.registered {
            if !entry.strategy.configurable() {
                continue;
            }
            let Some(enabled) = settings.strategies.enabled_for(entry.strategy.name()) else {
                continue;
            };
            let previous = entry.enabled.swap(enabled, Ordering::Relaxed);
            if previous != enabled {
                tracing::debug!(
                    target = "glyph.engine",
                    strategy = entry.strategy.name(),
                    enabled,
                    "strategy toggled"
                );
            }
        }
    }

    fn commit(
        &self,
        resource: &Arc<Resource>,
        strategy: &dyn Strategy,
        settings: &IconSettings,
        icon: &Arc<Icon>,
    ) {
        let coloured = settings.coloured
            && (!settings.colour_changed_only || resource.vcs_status().is_changed());

        resource.icon().set(IconAssignment {
            icon_class: icon.icon_class().to_string(),
            colour_class: icon.colour_class().map(str::to_string),
            priority: strategy.priority(),
            index: icon.index(),
        });

        let path = resource.path_key();
        self.storage.set_icon(
            &path,
            StoredIcon {
                priority: strategy.priority(),
                index: icon.index(),
                classes: icon.display_classes(coloured),
            },
        );
        if let Some(inode) = resource.inode() {
            self.storage.set_inode(&path, inode);
        }

        tracing::debug!(
            target = "glyph.engine",
            path = %path,
            strategy = strategy.name(),
            icon = icon.slug(),
            "icon committed"
        );
    }
}

fn initial_enabled(strategy: &dyn Strategy, settings: &IconSettings) -> bool {
    if !strategy.configurable() {
        return true;
    }
    settings
        .strategies
        .enabled_for(strategy.name())
        .unwrap_or(true)
}

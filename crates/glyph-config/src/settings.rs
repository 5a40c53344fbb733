use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use glyph_core::{Emitter, Subscription};
use serde::{Deserialize, Serialize};

/// User-facing settings for icon resolution.
///
/// Every field carries a serde default so a partial settings payload from the
/// host deserializes into a usable value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSettings {
    /// Whether colour-variant classes are applied at all.
    #[serde(default = "default_true")]
    pub coloured: bool,

    /// Only colour icons whose files are changed in version control.
    #[serde(default)]
    pub colour_changed_only: bool,

    /// Show file icons in tab panes (when off, tabs keep the default class).
    #[serde(default = "default_true")]
    pub tab_pane_icon: bool,

    /// Class applied while a resource is unclassified.
    #[serde(default = "default_icon_class")]
    pub default_icon_class: String,

    /// User-defined mapping of file extension (without dot) to grammar scope.
    ///
    /// Consulted by the usertype strategy, e.g. `"inc" => "source.php"`.
    #[serde(default)]
    pub custom_types: BTreeMap<String, String>,

    #[serde(default)]
    pub strategies: StrategyToggles,
}

impl Default for IconSettings {
    fn default() -> Self {
        Self {
            coloured: true,
            colour_changed_only: false,
            tab_pane_icon: true,
            default_icon_class: default_icon_class(),
            custom_types: BTreeMap::new(),
            strategies: StrategyToggles::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_icon_class() -> String {
    "default-icon".to_string()
}

/// Per-strategy enable switches. The path strategy has no switch; it is
/// always on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyToggles {
    #[serde(default = "default_true")]
    pub signature: bool,
    #[serde(default = "default_true")]
    pub hashbang: bool,
    #[serde(default = "default_true")]
    pub modeline: bool,
    #[serde(default = "default_true")]
    pub linguist: bool,
    #[serde(default = "default_true")]
    pub usertype: bool,
    #[serde(default = "default_true")]
    pub grammar: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            signature: true,
            hashbang: true,
            modeline: true,
            linguist: true,
            usertype: true,
            grammar: true,
        }
    }
}

impl StrategyToggles {
    /// The switch for a named strategy, or `None` for strategies without
    /// user-facing configuration.
    pub fn enabled_for(&self, strategy: &str) -> Option<bool> {
        match strategy {
            "signature" => Some(self.signature),
            "hashbang" => Some(self.hashbang),
            "modeline" => Some(self.modeline),
            "linguist" => Some(self.linguist),
            "usertype" => Some(self.usertype),
            "grammar" => Some(self.grammar),
            _ => None,
        }
    }

    fn set(&mut self, strategy: &str, enabled: bool) -> bool {
        let slot = match strategy {
            "signature" => &mut self.signature,
            "hashbang" => &mut self.hashbang,
            "modeline" => &mut self.modeline,
            "linguist" => &mut self.linguist,
            "usertype" => &mut self.usertype,
            "grammar" => &mut self.grammar,
            _ => return false,
        };
        *slot = enabled;
        true
    }
}

/// Payload of a settings-change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsChange {
    pub previous: IconSettings,
    pub current: IconSettings,
}

/// Shared, observable settings handle.
pub struct ConfigHandle {
    inner: Mutex<IconSettings>,
    changed: Emitter<SettingsChange>,
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle").finish_non_exhaustive()
    }
}

impl ConfigHandle {
    pub fn new(settings: IconSettings) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(settings),
            changed: Emitter::new(),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(IconSettings::default())
    }

    pub fn get(&self) -> IconSettings {
        self.lock().clone()
    }

    /// Applies `mutate` to the settings, notifying subscribers only when the
    /// value actually changed.
    pub fn update(&self, mutate: impl FnOnce(&mut IconSettings)) {
        let change = {
            let mut guard = self.lock();
            let previous = guard.clone();
            mutate(&mut guard);
            if *guard == previous {
                None
            } else {
                Some(SettingsChange {
                    previous,
                    current: guard.clone(),
                })
            }
        };
        if let Some(change) = change {
            self.changed.emit(&change);
        }
    }

    /// Toggles one strategy switch by name. Unknown or non-configurable
    /// strategy names are logged and ignored.
    pub fn set_strategy_enabled(&self, strategy: &str, enabled: bool) {
        let mut known = true;
        self.update(|settings| {
            known = settings.strategies.set(strategy, enabled);
        });
        if !known {
            tracing::warn!(
                target = "glyph.config",
                strategy,
                "ignoring toggle for unknown strategy"
            );
        }
    }

    pub fn on_did_change(
        &self,
        callback: impl Fn(&SettingsChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.changed.subscribe(callback)
    }

    #[track_caller]
    fn lock(&self) -> MutexGuard<'_, IconSettings> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target = "glyph.config",
                    file = loc.file(),
                    line = loc.line(),
                    "settings mutex poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn partial_payload_deserializes_with_defaults() {
        let settings: IconSettings = serde_json::from_str(r#"{"coloured": false}"#).unwrap();
        assert!(!settings.coloured);
        assert!(settings.tab_pane_icon);
        assert_eq!(settings.default_icon_class, "default-icon");
        assert!(settings.strategies.hashbang);
    }

    #[test]
    fn update_emits_only_on_change() {
        let config = ConfigHandle::with_defaults();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        let _sub = config.on_did_change(move |_| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        config.update(|s| s.coloured = true); // already true
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        config.update(|s| s.coloured = false);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!config.get().coloured);
    }

    #[test]
    fn strategy_toggle_round_trips() {
        let config = ConfigHandle::with_defaults();
        config.set_strategy_enabled("modeline", false);
        assert_eq!(config.get().strategies.enabled_for("modeline"), Some(false));

        // Unknown names are ignored without panicking.
        config.set_strategy_enabled("path", false);
        assert_eq!(config.get().strategies.enabled_for("path"), None);
    }

    #[test]
    fn change_event_carries_both_values() {
        let config = ConfigHandle::with_defaults();
        let seen = Arc::new(Mutex::new(None::<SettingsChange>));
        let seen2 = seen.clone();
        let _sub = config.on_did_change(move |change| {
            *seen2.lock().unwrap() = Some(change.clone());
        });

        config.update(|s| s.default_icon_class = "blank-icon".to_string());
        let change = seen.lock().unwrap().clone().unwrap();
        assert_eq!(change.previous.default_icon_class, "default-icon");
        assert_eq!(change.current.default_icon_class, "blank-icon");
    }
}

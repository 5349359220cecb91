//! Plugin registry.
//!
//! Holds every registered plugin in registration order. Legacy plugins are
//! adapted into the quality contract on the way in, so the registry only ever
//! hands out [`QualityPlugin`] trait objects together with their original
//! [`PluginVariant`] tag.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::contract::{LegacyAdapter, LegacyPlugin, QualityPlugin};
use super::error::{PluginError, PluginResult};
use super::types::{PluginContext, PluginVariant};
use crate::core::{FaultKind, PluginFault};

/// Maximum identifier length.
pub const MAX_PLUGIN_ID_LEN: usize = 64;

static PLUGIN_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("plugin id pattern is valid")
});

/// Validate a plugin identifier.
pub fn validate_plugin_id(id: &str) -> PluginResult<()> {
    let invalid = |reason: &str| PluginError::InvalidId { id: id.to_string(), reason: reason.to_string() };

    if id.is_empty() {
        return Err(invalid("identifier is empty"));
    }

    if id.len() > MAX_PLUGIN_ID_LEN {
        return Err(invalid("identifier is longer than 64 characters"));
    }

    if !PLUGIN_ID_PATTERN.is_match(id) {
        return Err(invalid(
            "identifier must start with a letter or digit and contain only letters, digits, '-', '_' and '.'",
        ));
    }

    Ok(())
}

/// A registered plugin.
#[derive(Clone)]
pub struct RegisteredPlugin {
    /// Shape the plugin was registered with.
    pub variant: PluginVariant,
    /// The plugin, in quality shape.
    pub plugin: Arc<dyn QualityPlugin>,
}

impl std::fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("id", &self.plugin.id())
            .field("variant", &self.variant)
            .finish()
    }
}

/// Plugins selected for a run, plus the applicability faults met on the way.
#[derive(Default)]
pub struct Applicable {
    /// Plugins to run, in registration order.
    pub plugins: Vec<Arc<dyn QualityPlugin>>,
    /// Plugins whose applicability check failed.
    pub warnings: Vec<PluginFault>,
}

impl std::fmt::Debug for Applicable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.plugins.iter().map(|p| p.id()).collect();
        f.debug_struct("Applicable").field("plugins", &ids).field("warnings", &self.warnings).finish()
    }
}

/// Registry of analysis plugins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.plugins.len()).finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a legacy plugin. It is adapted to the quality contract here.
    pub fn register_legacy(&mut self, plugin: Arc<dyn LegacyPlugin>) -> PluginResult<()> {
        let adapted: Arc<dyn QualityPlugin> = Arc::new(LegacyAdapter::new(plugin));
        self.insert(PluginVariant::Legacy, adapted)
    }

    /// Register a quality plugin.
    pub fn register_quality(&mut self, plugin: Arc<dyn QualityPlugin>) -> PluginResult<()> {
        self.insert(PluginVariant::Quality, plugin)
    }

    fn insert(&mut self, variant: PluginVariant, plugin: Arc<dyn QualityPlugin>) -> PluginResult<()> {
        let id = plugin.id();
        validate_plugin_id(id)?;

        if self.contains(id) {
            return Err(PluginError::AlreadyRegistered(id.to_string()));
        }

        tracing::debug!(plugin = id, variant = %variant, version = plugin.version(), "Registered plugin");
        self.plugins.push(RegisteredPlugin { variant, plugin });
        Ok(())
    }

    /// Remove a plugin by id.
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.plugins.len();
        self.plugins.retain(|p| p.plugin.id() != id);
        before != self.plugins.len()
    }

    /// Check whether a plugin id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.plugins.iter().any(|p| p.plugin.id() == id)
    }

    /// Get a plugin by id.
    pub fn get(&self, id: &str) -> Option<&RegisteredPlugin> {
        self.plugins.iter().find(|p| p.plugin.id() == id)
    }

    /// All plugins in registration order.
    pub fn list(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.plugins.iter()
    }

    /// Plugins registered with the given variant.
    pub fn list_by_variant(&self, variant: PluginVariant) -> impl Iterator<Item = &RegisteredPlugin> {
        self.plugins.iter().filter(move |p| p.variant == variant)
    }

    /// Number of registered plugins.
    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Select the plugins that should run for `context`.
    ///
    /// Plugins named in `skip` (by id or name) are left out. A plugin whose
    /// applicability check fails is left out and reported as a warning.
    pub fn applicable_plugins(&self, context: &PluginContext, skip: &[String]) -> Applicable {
        let mut applicable = Applicable::default();

        for entry in &self.plugins {
            let plugin = &entry.plugin;

            if skip.iter().any(|s| s == plugin.id() || s == plugin.name()) {
                tracing::debug!(plugin = plugin.id(), "Skipping plugin");
                continue;
            }

            match plugin.is_applicable(context) {
                Ok(true) => applicable.plugins.push(Arc::clone(plugin)),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        plugin = plugin.id(),
                        path = %context.path.display(),
                        error = %e,
                        "Applicability check failed"
                    );
                    applicable.warnings.push(PluginFault::new(
                        plugin.name(),
                        FaultKind::Applicability,
                        format!("applicability check failed: {e}"),
                    ));
                }
            }
        }

        applicable
    }
}

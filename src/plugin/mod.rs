//! Plugin system for Testgauge.
//!
//! Quality checks are provided by plugins. A plugin is either a legacy
//! analyzer (path in, issues out) or a full quality plugin that can also
//! score its own findings and suggest improvements. Legacy analyzers are
//! adapted to the quality contract when they are registered.
//!
//! # Custom plugins
//!
//! Regex-backed plugins can be declared in the configuration file:
//!
//! ```toml
//! [[plugins]]
//! id = "no-focused-tests"
//! extensions = ["ts", "js"]
//!
//! [[plugins.patterns]]
//! id = "only"
//! category = "pattern"
//! severity = "critical"
//! regex = '\.only\('
//! message = "Focused test left in the suite"
//! ```

mod contract;
mod custom;
mod error;
mod registry;
mod types;

pub use contract::{LegacyAdapter, LegacyPlugin, QualityPlugin};
pub use custom::{CustomPattern, CustomPlugin, CustomPluginSpec};
pub use error::{PluginError, PluginResult};
pub use registry::{
    validate_plugin_id, Applicable, PluginRegistry, RegisteredPlugin, MAX_PLUGIN_ID_LEN,
};
pub use types::{
    DetectionResult, Improvement, Issue, Location, PluginContext, PluginVariant, Priority,
    QualityDimensions, QualityScore, Severity, TestUnit, LEGACY_PLUGIN_VERSION,
};

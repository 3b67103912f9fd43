// src/config/mod.rs

//! Configuration for packflow.
//!
//! Responsibilities:
//! - The app config tree (JSON) and its validation (`loader.rs`, `validate.rs`).
//! - Machine-local tool settings (TOML) with dotted access (`model.rs`,
//!   `settings.rs`).
//! - Typed dot-path expressions and the tree transformer (`path.rs`,
//!   `transform.rs`).

pub mod loader;
pub mod model;
pub mod path;
pub mod settings;
pub mod transform;
pub mod validate;

pub use loader::{load_and_validate_app, load_app_config, load_tool_settings};
pub use model::{AndroidSection, SupervisorSection, ToolSettingsFile};
pub use path::{ConfigPath, PathError, Segment};
pub use settings::ToolSettings;
pub use transform::{TransformError, transform, transform_in_place};
pub use validate::validate_app_config;

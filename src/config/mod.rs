//! Configuration: project settings and the `.sops.yaml` renderer.

pub mod render;
pub mod settings;

pub use render::{config_id, render_sops_config, transit_key_uri};
pub use settings::Settings;

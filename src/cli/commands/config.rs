//! `sops-transit config` — render a `.sops.yaml` for a Transit key.
//!
//! Needs only the Vault address and engine path; no credentials.

use crate::cli::commands::write_output;
use crate::cli::{load_settings, output, transit_engine, vault_address, Cli};
use crate::config::{config_id, render_sops_config};
use crate::errors::Result;

/// Execute the `config` command.
pub fn execute(cli: &Cli, key: &str, path_regexes: &[String], out: Option<&str>) -> Result<()> {
    let settings = load_settings(cli)?;
    let address = vault_address(cli, &settings)?;
    let engine = transit_engine(cli, &settings);

    let rendered = render_sops_config(&address, &engine, key, Some(path_regexes))?;
    write_output(out, &rendered)?;

    if let Some(path) = out {
        output::success(&format!("Wrote {path}"));
        output::info(&format!("config id: {}", config_id(&rendered)));
        output::tip("Commit it next to your encrypted files so `sops` can find the key.");
    }
    Ok(())
}

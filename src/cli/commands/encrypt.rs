//! `sops-transit encrypt` — turn a plaintext document into a SOPS file.
//!
//! Usage:
//!   sops-transit encrypt secrets.json --key app > secrets.enc.json
//!   cat values.yaml | sops-transit encrypt - --key app --input-type yaml -o values.enc.yaml

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::cli::commands::write_output;
use crate::cli::{load_settings, output, transit_client, Cli, EncryptArgs};
use crate::config::Settings;
use crate::envelope::{create_document, CreateRequest, EncryptRequest};
use crate::errors::Result;
use crate::format::DocumentFormat;
use crate::scope::ScopePolicy;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, args: &EncryptArgs) -> Result<()> {
    let settings = load_settings(cli)?;

    // Reject bad scope options before talking to Vault at all.
    let scope = args.scope_fields();
    ScopePolicy::from_fields(&scope)?;

    let input_format = input_format(args)?;
    let output_format = output_format(args, &settings)?;
    let pretty_json = pretty(args, &settings);
    if args.pretty && output_format == DocumentFormat::Yaml {
        output::warning("--pretty only affects JSON output; ignoring it for YAML");
    }
    let content = read_input(&args.input)?;
    debug!(%input_format, %output_format, bytes = content.len(), "read input");

    let client = transit_client(cli, &settings)?;
    let request = CreateRequest {
        encrypt: EncryptRequest {
            key_name: args.key.clone(),
            scope,
        },
        input_format,
        output_format,
        pretty: pretty_json,
    };
    let encrypted = create_document(&content, &request, &client)?;

    write_output(args.output.as_deref(), &encrypted)?;
    if let Some(path) = &args.output {
        output::success(&format!("Encrypted {} into {path}", display_input(&args.input)));
    }
    Ok(())
}

/// `--input-type`, else the input file extension, else JSON.
fn input_format(args: &EncryptArgs) -> Result<DocumentFormat> {
    match &args.input_type {
        Some(name) => name.parse(),
        None if args.input == "-" => Ok(DocumentFormat::Json),
        None => Ok(DocumentFormat::from_path(Path::new(&args.input)).unwrap_or_default()),
    }
}

/// `--format`, else the output file extension, else the configured default.
fn output_format(args: &EncryptArgs, settings: &Settings) -> Result<DocumentFormat> {
    if let Some(name) = &args.format {
        return name.parse();
    }
    if let Some(format) = args
        .output
        .as_deref()
        .and_then(|p| DocumentFormat::from_path(Path::new(p)))
    {
        return Ok(format);
    }
    settings.default_output_format()
}

/// `--pretty` / `--no-pretty`, else the configured default.
fn pretty(args: &EncryptArgs, settings: &Settings) -> bool {
    if args.no_pretty {
        return false;
    }
    args.pretty || settings.pretty
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(input)?)
}

fn display_input(input: &str) -> &str {
    if input == "-" {
        "stdin"
    } else {
        input
    }
}

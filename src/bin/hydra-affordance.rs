//! Hydra affordance CLI
//!
//! Command-line interface for expanding URI templates, rendering resources
//! as Hydra JSON-LD and validating request payloads against affordances.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hydra_affordance::{
    load_affordance, load_json, load_registry, load_resource, to_value, validate_request,
    ActionDescriptor, Affordance, Registry, SerializeOptions, UriTemplate, ValidateError,
    DEFAULT_MAX_DEPTH,
};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hydra-affordance")]
#[command(about = "Hypermedia affordances and Hydra JSON-LD rendering")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a URI template
    Expand {
        /// RFC 6570 style template, e.g. "/events{/city}{?q}"
        template: String,

        /// Variable binding; repeat a name to bind a list
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Keep unbound variables as template syntax
        #[arg(long)]
        partial: bool,

        /// Drop unbound query variables from the result
        #[arg(long, requires = "partial")]
        strip: bool,
    },

    /// Render a resource snapshot as Hydra JSON-LD
    Render {
        /// Resource source: file path or URL (http:// or https://)
        resource: String,

        /// Semantic registry (file path or URL)
        #[arg(long)]
        registry: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Maximum object nesting depth
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Omit hydra:operation entries
        #[arg(long)]
        no_operations: bool,
    },

    /// Validate a request payload against one of an affordance's actions
    Validate {
        /// Affordance source: file path or URL
        affordance: String,

        /// Payload file to validate
        payload: PathBuf,

        /// Action name (default: first action with a request body, else first action)
        #[arg(long)]
        action: Option<String>,

        /// Semantic registry describing request body types
        #[arg(long)]
        registry: Option<String>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Print an affordance as an RFC 5988 Link header value
    Link {
        /// Affordance source: file path or URL
        affordance: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Expand {
            template,
            vars,
            partial,
            strip,
        } => run_expand(&template, &vars, partial, strip),

        Commands::Render {
            resource,
            registry,
            output,
            pretty,
            max_depth,
            no_operations,
        } => {
            let options = SerializeOptions::new()
                .max_depth(max_depth)
                .emit_operations(!no_operations);
            run_render(&resource, registry.as_deref(), output, pretty, &options)
        }

        Commands::Validate {
            affordance,
            payload,
            action,
            registry,
            json,
        } => run_validate(
            &affordance,
            &payload,
            action.as_deref(),
            registry.as_deref(),
            json,
        ),

        Commands::Link { affordance } => run_link(&affordance),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Parse `NAME=VALUE` bindings; repeated names collect into a list.
fn parse_vars(vars: &[String]) -> Result<Map<String, Value>, String> {
    let mut values = Map::new();
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got \"{}\"", var))?;
        let value = Value::String(value.to_string());
        match values.get_mut(name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                values.insert(name.to_string(), value);
            }
        }
    }
    Ok(values)
}

fn run_expand(template: &str, vars: &[String], partial: bool, strip: bool) -> Result<(), u8> {
    let template = UriTemplate::parse(template).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;
    let values = parse_vars(vars).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let expanded = if partial {
        let partial = template.expand_partially(&values);
        if strip {
            partial.strip_optional_variables(&[])
        } else {
            partial.to_string()
        }
    } else {
        template.expand(&values).map_err(|e| {
            eprintln!("Error: {}", e);
            2u8
        })?
    };

    println!("{}", expanded);
    Ok(())
}

fn load_registry_or_default(source: Option<&str>) -> Result<Registry, u8> {
    match source {
        Some(source) => load_registry(source).map_err(|e| {
            eprintln!("Error loading registry: {}", e);
            e.exit_code() as u8
        }),
        None => Ok(Registry::new()),
    }
}

fn run_render(
    resource_source: &str,
    registry_source: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
    options: &SerializeOptions,
) -> Result<(), u8> {
    let registry = load_registry_or_default(registry_source)?;
    let resource = load_resource(resource_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let document = to_value(&resource, &registry, options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn select_action<'a>(
    affordance: &'a Affordance,
    name: Option<&str>,
) -> Result<&'a ActionDescriptor, String> {
    let descriptors = affordance.action_descriptors();
    match name {
        Some(name) => descriptors
            .iter()
            .find(|d| d.action_name() == name)
            .ok_or_else(|| format!("affordance has no action named \"{}\"", name)),
        None => descriptors
            .iter()
            .find(|d| d.request_body().is_some())
            .or_else(|| descriptors.first())
            .ok_or_else(|| "affordance declares no actions".to_string()),
    }
}

fn run_validate(
    affordance_source: &str,
    payload_path: &std::path::Path,
    action: Option<&str>,
    registry_source: Option<&str>,
    json_output: bool,
) -> Result<(), u8> {
    let registry = load_registry_or_default(registry_source)?;
    let affordance = load_affordance(affordance_source).map_err(|e| {
        report_error(json_output, &format!("loading affordance: {}", e));
        e.exit_code() as u8
    })?;
    let payload = load_json(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;
    let descriptor = select_action(&affordance, action).map_err(|e| {
        report_error(json_output, &e);
        2u8
    })?;

    match validate_request(descriptor, &registry, &payload) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "action": descriptor.action_name(),
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed for {}:", descriptor.action_name());
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_link(affordance_source: &str) -> Result<(), u8> {
    let affordance = load_affordance(affordance_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    println!("{}", affordance.as_link_header());
    Ok(())
}

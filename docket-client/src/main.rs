//! `docket` command-line client.
//!
//! ```text
//! docket [--config <path>] <resource> [list | page <n> | get <id>]
//! docket permissions <role>... [--grant <permission>]... [--deny <permission>]...
//! ```

use std::sync::Arc;

use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use docket_cache::RequestCache;
use docket_client::telemetry::init_logging;
use docket_client::{ClientConfig, ResourceService, RestClient};
use docket_core::{RecordId, ResourceKind, SecurityContext};
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, PartialEq)]
enum Command {
    List(ResourceKind),
    Page(ResourceKind, u32),
    Get(ResourceKind, RecordId),
    Permissions {
        roles: Vec<String>,
        granted: Vec<String>,
        denied: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    if let Command::Permissions {
        roles,
        granted,
        denied,
    } = &command
    {
        let ctx = SecurityContext::derive(roles, granted, denied);
        return print_json(&json!({
            "roles": ctx.roles().iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            "visible": ctx.visible_resources().iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            "manageable": ResourceKind::ALL
                .iter()
                .filter(|k| ctx.can_manage(**k))
                .map(|k| k.to_string())
                .collect::<Vec<_>>(),
        }));
    }

    let config = ClientConfig::load().wrap_err("failed to load config")?;
    init_logging(&config.logging);
    info!(api = %config.api_base_url, language = %config.language, "Docket client starting");

    let transport = Arc::new(RestClient::new(&config)?);
    let cache = RequestCache::new(config.cache_config()?);
    let service = ResourceService::new(transport, cache);

    match command {
        Command::List(kind) => print_json(&*service.list(kind).await?),
        Command::Page(kind, page) => print_json(&*service.list_page(kind, page).await?),
        Command::Get(kind, id) => print_json(&*service.get(kind, &id).await?),
        Command::Permissions { .. } => Ok(()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_command(args: &[String]) -> Result<Command> {
    let mut positional = Vec::new();
    let mut granted = Vec::new();
    let mut denied = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            // Consumed by ClientConfig::load.
            "--config" => {
                iter.next();
            }
            "--grant" => granted.push(flag_value(iter.next(), "--grant")?),
            "--deny" => denied.push(flag_value(iter.next(), "--deny")?),
            _ => positional.push(arg.as_str()),
        }
    }

    let Some((&first, rest)) = positional.split_first() else {
        bail!("usage: docket [--config <path>] <resource> [list | page <n> | get <id>]");
    };

    if first == "permissions" {
        if rest.is_empty() {
            bail!(
                "usage: docket permissions <role>... [--grant <permission>] [--deny <permission>]"
            );
        }
        return Ok(Command::Permissions {
            roles: rest.iter().map(|s| s.to_string()).collect(),
            granted,
            denied,
        });
    }

    let kind: ResourceKind = first.parse()?;
    match rest {
        [] | ["list"] => Ok(Command::List(kind)),
        ["page", n] => {
            let page = n
                .parse::<u32>()
                .wrap_err_with(|| format!("invalid page number: {}", n))?;
            Ok(Command::Page(kind, page))
        }
        ["get", id] => Ok(Command::Get(kind, RecordId::from(*id))),
        other => Err(eyre!("unknown {} command: {}", kind, other.join(" "))),
    }
}

fn flag_value(value: Option<&String>, flag: &str) -> Result<String> {
    value
        .cloned()
        .ok_or_else(|| eyre!("{} requires a value", flag))
}

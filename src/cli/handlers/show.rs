// src/cli/handlers/show.rs

use anyhow::Result;
use serde_json::Value;

use crate::{
    cli::{dispatcher::Invocation, handlers::commons, render::CommandOutput},
    state::Session,
};

/// `show version`
pub fn version(_inv: &Invocation, _session: &mut Session) -> Result<CommandOutput> {
    Ok(CommandOutput::KeyValues {
        title: "netscope".to_string(),
        rows: vec![
            ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
            ("about".to_string(), env!("CARGO_PKG_DESCRIPTION").to_string()),
        ],
    })
}

/// `show config`: runtime settings merged over the config file.
pub fn config(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let cache_dir = session
        .cache
        .disk_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "disabled".to_string());
    let regions = session.effective_regions().join(",");
    let regions = if session.settings.regions.is_empty() {
        format!("{} (default)", regions)
    } else {
        regions
    };

    let rows = vec![
        (
            "profile".to_string(),
            session.settings.profile.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("account".to_string(), session.account_id()),
        ("regions".to_string(), regions),
        (
            "no-cache".to_string(),
            if session.settings.no_cache { "on" } else { "off" }.to_string(),
        ),
        ("output-format".to_string(), session.settings.output_format.to_string()),
        ("cache ttl".to_string(), format!("{} min", session.config.cache.ttl_minutes)),
        ("cache dir".to_string(), cache_dir),
        ("max workers".to_string(), session.config.provider.max_workers.to_string()),
        (
            "prompt".to_string(),
            format!("{:?}", session.config.prompt.style).to_lowercase(),
        ),
    ];
    Ok(CommandOutput::KeyValues {
        title: "Configuration".to_string(),
        rows,
    })
}

/// `show vpcs`, `show core-networks`, `show route-tables`, ...
pub fn listing(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let listing = commons::listing(session, &inv.name)?;
    if listing.from_cache {
        log::debug!("'show {}' served from cache", inv.name);
    }
    Ok(CommandOutput::Listing {
        title: inv.name.clone(),
        items: listing.as_slice().to_vec(),
        warnings: listing.warnings,
    })
}

/// `show detail`: the full document of the current frame.
pub fn detail(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let frame = commons::current_frame(session)?;
    Ok(CommandOutput::Document {
        title: format!("{} {}", frame.context_type, frame.label()),
        value: frame.detail.clone(),
    })
}

/// One field of the current frame's detail, named after the command
/// (`show security-groups` reads `security_groups`).
pub fn section(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let frame = commons::current_frame(session)?;
    let field = inv.name.replace('-', "_");
    Ok(match frame.detail.get(&field) {
        Some(Value::Array(items)) => CommandOutput::Listing {
            title: inv.name.clone(),
            items: items.clone(),
            warnings: Vec::new(),
        },
        Some(Value::Null) | None => CommandOutput::Message(format!(
            "No {} recorded for {} '{}'.",
            inv.name,
            frame.context_type,
            frame.label()
        )),
        Some(other) => CommandOutput::Document {
            title: format!("{} of {}", inv.name, frame.label()),
            value: other.clone(),
        },
    })
}

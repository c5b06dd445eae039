// src/cli/handlers/set.rs

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::{
    cli::{dispatcher::Invocation, handlers::commons, render::CommandOutput},
    core::{
        resolver::{self, Resolvable},
        validators,
    },
    models::ResourceKind,
    state::Session,
};

/// `set <resource> <number|id|name>`: selects one listed resource and enters it.
pub fn enter(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let context = session.navigator.current_context_type();
    let graph = std::sync::Arc::clone(session.navigator.graph());
    let child = graph.child_context_for(context, &inv.name)?;
    let show_name = graph
        .listing_command_for(context, &inv.name)
        .ok_or_else(|| anyhow!("'set {}' has nothing to select from.", inv.name))?;

    let listing = commons::listing(session, show_name)?;
    let token = match inv.args.first() {
        Some(token) if token != "?" => inv.args.join(" "),
        _ => {
            return Ok(CommandOutput::Listing {
                title: show_name.to_string(),
                items: listing.as_slice().to_vec(),
                warnings: listing.warnings,
            });
        }
    };

    let resolved = resolver::resolve(listing.as_slice(), &token)?;
    let id = resolved
        .item
        .id()
        .ok_or_else(|| anyhow!("The selected {} has no id.", inv.name))?
        .to_string();
    let display_name = resolved.item.display_name().map(str::to_string);
    let ordinal = resolved.ordinal;

    let detail: Value = match ResourceKind::from_set_name(&inv.name) {
        Some(kind) => {
            let region = commons::region_of(resolved.item).map(str::to_string);
            session
                .resource_detail(kind, &id, region.as_deref())?
                .as_ref()
                .clone()
        }
        // Route tables are complete in the listing taken from the parent.
        None => resolved.item.clone(),
    };

    let entered = session
        .navigator
        .push(child, id, display_name, detail, ordinal)?;
    log::debug!("Entered {} '{}'", entered.context_type, entered.reference);
    Ok(CommandOutput::None)
}

fn single_arg<'a>(inv: &'a Invocation, usage: &str) -> Result<&'a str> {
    match inv.args.as_slice() {
        [value] => Ok(value.as_str()),
        _ => Err(anyhow!("Usage: set {} {}", inv.name, usage)),
    }
}

/// `set profile <name>`. Changing profile changes the cache's account identity.
pub fn profile(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let profile = validators::validate_profile(single_arg(inv, "<name>")?)?;
    session.set_profile(profile.clone());
    Ok(CommandOutput::Message(format!("Profile set to '{}'.", profile)))
}

/// `set regions <r1,r2,...>`
pub fn regions(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    if inv.args.is_empty() {
        return Err(anyhow!("Usage: set regions <region1,region2,...>"));
    }
    let regions = validators::validate_regions(&inv.args.join(" "))?;
    let message = format!("Regions set to {}.", regions.join(", "));
    session.settings.regions = regions;
    Ok(CommandOutput::Message(message))
}

/// `set no-cache on|off`
pub fn no_cache(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let enabled = validators::parse_toggle(single_arg(inv, "on|off")?)?;
    session.settings.no_cache = enabled;
    Ok(CommandOutput::Message(format!(
        "Cache reads {}.",
        if enabled { "disabled" } else { "enabled" }
    )))
}

/// `set output-format table|json`
pub fn output_format(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let format = validators::validate_output_format(single_arg(inv, "table|json")?)?;
    session.settings.output_format = format;
    Ok(CommandOutput::Message(format!("Output format set to {}.", format)))
}


// src/cli/handlers/cache.rs

use anyhow::{Result, anyhow};

use crate::{
    cli::{dispatcher::Invocation, render::CommandOutput},
    constants::ROUTE_TABLE_NAMESPACE,
    models::ResourceKind,
    state::Session,
};

/// `show cache`: every entry of both tiers with its age and owner.
pub fn show(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    Ok(CommandOutput::Cache(session.cache.entries()))
}

/// `refresh [<kind>|all]`
///
/// With a kind, drops its cached lists and details and fetches the list again.
/// Without one, or with `all`, drops every cached resource list and detail.
/// The routing cache is kept; `create_routing_cache` rebuilds it.
pub fn refresh(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let target = inv.args.first().map(String::as_str).unwrap_or("all");
    if target == "all" {
        for kind in ResourceKind::ALL {
            session.invalidate_kind(kind);
        }
        session.cache.invalidate_namespace(ROUTE_TABLE_NAMESPACE);
        return Ok(CommandOutput::Message(
            "Cached resource data dropped. The next command fetches fresh data.".to_string(),
        ));
    }

    let kind = ResourceKind::from_listing_name(target)
        .or_else(|| ResourceKind::from_set_name(target))
        .ok_or_else(|| {
            let valid: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.listing_name()).collect();
            anyhow!("Unknown resource kind '{}'. Use one of: all, {}.", target, valid.join(", "))
        })?;
    session.invalidate_kind(kind);
    let listing = session.list_resources(kind, true)?;
    Ok(CommandOutput::Listing {
        title: kind.listing_name().to_string(),
        items: listing.as_slice().to_vec(),
        warnings: listing.warnings,
    })
}

/// `clear_cache`: empties both tiers, including the persisted routing cache.
pub fn clear(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let count = session.cache.entries().len();
    session.cache.invalidate_all();
    session.routing.clear(&mut session.cache);
    Ok(CommandOutput::Message(format!(
        "Cache cleared ({} entr{} removed).",
        count,
        if count == 1 { "y" } else { "ies" }
    )))
}

// src/cli/dispatcher.rs

use anyhow::{Result, anyhow, bail};

use crate::{
    cli::{
        handlers::{self, navigation},
        render::CommandOutput,
    },
    core::hierarchy::{GraphReport, HandlerRegistry},
    models::{CommandKind, ContextType},
    state::Session,
};

// --- Verb Registry ---

/// A word that can start a line, with its Cisco-style aliases.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(&[String], &mut Session) -> Result<CommandOutput>,
}

/// The verbs of the shell. Anything else is an action name.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "show",
        aliases: &["sh"],
        handler: show_verb,
    },
    CommandDefinition {
        name: "set",
        aliases: &[],
        handler: set_verb,
    },
    CommandDefinition {
        name: "exit",
        aliases: &["ex", "quit"],
        handler: navigation::exit,
    },
    CommandDefinition {
        name: "end",
        aliases: &[],
        handler: navigation::end,
    },
    CommandDefinition {
        name: "help",
        aliases: &["?"],
        handler: navigation::help,
    },
    CommandDefinition {
        name: "clear",
        aliases: &["cls"],
        handler: navigation::clear,
    },
];

/// Finds a verb in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

// --- Handler Table ---

/// A parsed `show`, `set` or action command, as a handler receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: CommandKind,
    pub name: String,
    /// Tokens after the command name.
    pub args: Vec<String>,
}

pub type HandlerFn = fn(&Invocation, &mut Session) -> Result<CommandOutput>;

struct HandlerEntry {
    /// `None` serves the command in every context that declares it.
    context: Option<ContextType>,
    kind: CommandKind,
    name: &'static str,
    handler: HandlerFn,
}

const fn any(kind: CommandKind, name: &'static str, handler: HandlerFn) -> HandlerEntry {
    HandlerEntry {
        context: None,
        kind,
        name,
        handler,
    }
}

const fn only(context: ContextType, kind: CommandKind, name: &'static str, handler: HandlerFn) -> HandlerEntry {
    HandlerEntry {
        context: Some(context),
        kind,
        name,
        handler,
    }
}

use CommandKind::{Action, Set, Show};

/// Every implemented command. Context-specific entries win over `None` ones.
static HANDLERS: &[HandlerEntry] = &[
    // Shell state
    any(Show, "version", handlers::show::version),
    any(Show, "config", handlers::show::config),
    any(Show, "cache", handlers::cache::show),
    any(Show, "routing-cache", handlers::routing::show_summary),
    any(Show, "graph", handlers::graph::show),
    // Resource listings
    any(Show, "global-networks", handlers::show::listing),
    any(Show, "core-networks", handlers::show::listing),
    any(Show, "vpcs", handlers::show::listing),
    any(Show, "transit-gateways", handlers::show::listing),
    any(Show, "firewalls", handlers::show::listing),
    any(Show, "ec2-instances", handlers::show::listing),
    any(Show, "elbs", handlers::show::listing),
    any(Show, "vpns", handlers::show::listing),
    any(Show, "route-tables", handlers::show::listing),
    // Frame detail
    any(Show, "detail", handlers::show::detail),
    any(Show, "routes", handlers::routing::show_routes),
    any(Show, "blackhole-routes", handlers::routing::show_blackholes),
    only(ContextType::Ec2Instance, Show, "routes", handlers::show::section),
    any(Show, "segments", handlers::show::section),
    any(Show, "policy", handlers::show::section),
    any(Show, "subnets", handlers::show::section),
    any(Show, "security-groups", handlers::show::section),
    any(Show, "nacls", handlers::show::section),
    any(Show, "internet-gateways", handlers::show::section),
    any(Show, "nat-gateways", handlers::show::section),
    any(Show, "endpoints", handlers::show::section),
    any(Show, "attachments", handlers::show::section),
    any(Show, "rule-groups", handlers::show::section),
    any(Show, "enis", handlers::show::section),
    any(Show, "listeners", handlers::show::section),
    any(Show, "targets", handlers::show::section),
    any(Show, "health", handlers::show::section),
    any(Show, "tunnels", handlers::show::section),
    // Selection
    any(Set, "global-network", handlers::set::enter),
    any(Set, "core-network", handlers::set::enter),
    any(Set, "route-table", handlers::set::enter),
    any(Set, "vpc", handlers::set::enter),
    any(Set, "transit-gateway", handlers::set::enter),
    any(Set, "firewall", handlers::set::enter),
    any(Set, "ec2-instance", handlers::set::enter),
    any(Set, "elb", handlers::set::enter),
    any(Set, "vpn", handlers::set::enter),
    // Settings
    only(ContextType::Root, Set, "profile", handlers::set::profile),
    only(ContextType::Root, Set, "regions", handlers::set::regions),
    only(ContextType::Root, Set, "no-cache", handlers::set::no_cache),
    only(ContextType::Root, Set, "output-format", handlers::set::output_format),
    // Actions
    any(Action, "find_prefix", handlers::routing::find_prefix),
    any(Action, "find_null_routes", handlers::routing::find_null_routes),
    only(ContextType::Root, Action, "create_routing_cache", handlers::routing::create),
    only(ContextType::Root, Action, "refresh", handlers::cache::refresh),
    only(ContextType::Root, Action, "clear_cache", handlers::cache::clear),
    only(ContextType::Root, Action, "validate_graph", handlers::graph::validate),
    // Navigation
    any(Action, "exit", navigation::exit_action),
    any(Action, "end", navigation::end_action),
    any(Action, "clear", navigation::clear_action),
    any(Action, "help", navigation::help_action),
];

fn lookup(context: ContextType, kind: CommandKind, name: &str) -> Option<HandlerFn> {
    let matching = || HANDLERS.iter().filter(|h| h.kind == kind && h.name == name);
    matching()
        .find(|h| h.context == Some(context))
        .or_else(|| matching().find(|h| h.context.is_none()))
        .map(|h| h.handler)
}

/// The handler table, as seen by graph validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Handlers;

impl HandlerRegistry for Handlers {
    fn has_handler(&self, context: ContextType, kind: CommandKind, name: &str) -> bool {
        lookup(context, kind, name).is_some()
    }

    fn registered(&self) -> Vec<(Option<ContextType>, CommandKind, String)> {
        HANDLERS
            .iter()
            .map(|h| (h.context, h.kind, h.name.to_string()))
            .collect()
    }
}

/// Checks the session's graph against the handler table.
pub fn validate_graph(session: &Session) -> GraphReport {
    session.navigator.graph().validate(&Handlers)
}

// --- Dispatch ---

/// Runs one line of user input.
pub fn dispatch_line(line: &str, session: &mut Session) -> Result<CommandOutput> {
    let tokens = shlex::split(line).ok_or_else(|| anyhow!("Unbalanced quotes in '{}'.", line.trim()))?;
    dispatch(&tokens, session)
}

/// Runs an already tokenised command.
pub fn dispatch(tokens: &[String], session: &mut Session) -> Result<CommandOutput> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(CommandOutput::None);
    };
    log::debug!("Dispatching {:?} in '{}'", tokens, session.navigator.current_context_type());
    session.reset_cancellation();

    if let Some(command) = find_command(first) {
        return (command.handler)(rest, session);
    }

    let name = first.replace('-', "_");
    run_declared(Action, &name, rest, session)
}

/// Legal names of `kind` in the current context, formatted for `?`.
pub fn options(session: &Session, kind: CommandKind) -> CommandOutput {
    let context = session.navigator.current_context_type();
    let options = session
        .navigator
        .graph()
        .commands(context, kind)
        .into_iter()
        .map(str::to_string)
        .collect();
    CommandOutput::Options {
        heading: format!("{} commands in '{}':", kind, context),
        options,
    }
}

fn is_help(token: Option<&String>) -> bool {
    token.is_none_or(|t| t == "?")
}

fn show_verb(args: &[String], session: &mut Session) -> Result<CommandOutput> {
    if is_help(args.first()) {
        return Ok(options(session, Show));
    }
    let (name, rest) = args.split_first().ok_or_else(|| anyhow!("Usage: show <command>"))?;
    run_declared(Show, name, rest, session)
}

fn set_verb(args: &[String], session: &mut Session) -> Result<CommandOutput> {
    if is_help(args.first()) {
        return Ok(options(session, Set));
    }
    let (name, rest) = args.split_first().ok_or_else(|| anyhow!("Usage: set <command> <value>"))?;
    run_declared(Set, name, rest, session)
}

fn run_declared(kind: CommandKind, name: &str, args: &[String], session: &mut Session) -> Result<CommandOutput> {
    let context = session.navigator.current_context_type();
    let verb = match kind {
        Show => "show ",
        Set => "set ",
        Action => "",
    };
    if !session.navigator.graph().is_legal(context, kind, name) {
        bail!(
            "'{}{}' is not available in the '{}' context. Type '{}?' for options.",
            verb,
            name,
            context,
            verb
        );
    }
    let handler = lookup(context, kind, name)
        .ok_or_else(|| anyhow!("'{}{}' has no implementation.", verb, name))?;
    let invocation = Invocation {
        kind,
        name: name.to_string(),
        args: args.to_vec(),
    };
    handler(&invocation, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hierarchy;

    #[test]
    fn test_standard_graph_is_fully_implemented() {
        let report = hierarchy::standard().validate(&Handlers);
        assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_context_specific_entries_are_registered() {
        let registered = Handlers.registered();
        assert!(registered.contains(&(Some(ContextType::Ec2Instance), Show, "routes".to_string())));
        assert!(registered.contains(&(None, Show, "routes".to_string())));
        assert!(lookup(ContextType::Ec2Instance, Show, "routes").is_some());
        assert!(lookup(ContextType::Elb, Show, "nonsense").is_none());
    }

    #[test]
    fn test_settings_are_root_only() {
        assert!(Handlers.has_handler(ContextType::Root, Set, "profile"));
        assert!(!Handlers.has_handler(ContextType::Vpc, Set, "profile"));
    }

    #[test]
    fn test_aliases_resolve_to_verbs() {
        assert_eq!(find_command("sh").map(|c| c.name), Some("show"));
        assert_eq!(find_command("ex").map(|c| c.name), Some("exit"));
        assert_eq!(find_command("?").map(|c| c.name), Some("help"));
        assert!(find_command("find_prefix").is_none());
    }
}

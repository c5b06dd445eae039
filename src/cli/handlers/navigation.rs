// src/cli/handlers/navigation.rs

use anyhow::Result;

use crate::{
    cli::{dispatcher::Invocation, render::CommandOutput},
    core::{hierarchy::NAVIGATION_COMMANDS, navigator::NavigationError},
    models::CommandKind,
    state::Session,
};

/// `exit`: leaves the current context. At root it ends the shell.
pub fn exit(_args: &[String], session: &mut Session) -> Result<CommandOutput> {
    match session.navigator.pop() {
        Ok(left) => {
            log::debug!("Left {} '{}'", left.context_type, left.reference);
            Ok(CommandOutput::None)
        }
        Err(NavigationError::AlreadyAtRoot) => Ok(CommandOutput::Quit),
        Err(e) => Err(e.into()),
    }
}

/// `end`: back to root from any depth.
pub fn end(_args: &[String], session: &mut Session) -> Result<CommandOutput> {
    session.navigator.reset_to_root();
    Ok(CommandOutput::None)
}

pub fn clear(_args: &[String], _session: &mut Session) -> Result<CommandOutput> {
    Ok(CommandOutput::ClearScreen)
}

/// `help` / `?`: every command legal where the user stands.
pub fn help(_args: &[String], session: &mut Session) -> Result<CommandOutput> {
    let context = session.navigator.current_context_type();
    let graph = session.navigator.graph();

    let mut options: Vec<String> = Vec::new();
    for name in graph.commands(context, CommandKind::Show) {
        options.push(format!("show {}", name));
    }
    for name in graph.commands(context, CommandKind::Set) {
        options.push(match graph.listing_command_for(context, name) {
            Some(_) => format!("set {} <number|id|name>", name),
            None => format!("set {} <value>", name),
        });
    }
    for name in graph.commands(context, CommandKind::Action) {
        options.push(name.to_string());
    }
    options.extend(NAVIGATION_COMMANDS.iter().map(|n| n.to_string()));

    Ok(CommandOutput::Options {
        heading: format!("Commands in '{}' (append '?' to show/set for sub-commands):", context),
        options,
    })
}

// Action-table entries for the navigation verbs.

pub fn exit_action(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    exit(&inv.args, session)
}

pub fn end_action(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    end(&inv.args, session)
}

pub fn clear_action(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    clear(&inv.args, session)
}

pub fn help_action(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    help(&inv.args, session)
}

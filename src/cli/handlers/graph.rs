// src/cli/handlers/graph.rs

use anyhow::{Result, anyhow};

use crate::{
    cli::{
        dispatcher::{Handlers, Invocation},
        render::CommandOutput,
    },
    state::Session,
};

/// `show graph [stats|validate|parent <command>]`
pub fn show(inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    let graph = session.navigator.graph();
    match inv.args.split_first() {
        None => Ok(CommandOutput::Graph(graph.tree(&Handlers))),
        Some((sub, rest)) => match (sub.as_str(), rest) {
            ("stats", []) => Ok(CommandOutput::GraphStats(graph.stats())),
            ("validate", []) => Ok(CommandOutput::GraphReport(graph.validate(&Handlers))),
            ("parent", [_, ..]) => Ok(CommandOutput::CommandPath(
                graph.shortest_path_to(&rest.join(" "))?,
            )),
            ("?", []) => Ok(CommandOutput::Options {
                heading: "show graph sub-commands:".to_string(),
                options: vec![
                    "stats".to_string(),
                    "validate".to_string(),
                    "parent <command>".to_string(),
                ],
            }),
            _ => Err(anyhow!(
                "Usage: show graph [stats|validate|parent <command>]"
            )),
        },
    }
}

/// `validate_graph`
pub fn validate(_inv: &Invocation, session: &mut Session) -> Result<CommandOutput> {
    Ok(CommandOutput::GraphReport(
        session.navigator.graph().validate(&Handlers),
    ))
}

// src/cli/render.rs

//! Turns handler results into text. Handlers never print; they return a
//! [`CommandOutput`] and the REPL renders it in the session's output format.

use crate::core::cache::CacheDescription;
use crate::core::config_loader::{PromptSection, PromptStyle};
use crate::core::hierarchy::{CommandPath, GraphNode, GraphReport, GraphStats, Severity};
use crate::core::routing::{RouteEntry, SourceSummary};
use crate::models::{CommandKind, Context, OutputFormat};
use colored::*;
use serde::Serialize;
use serde_json::Value;

/// Everything a command can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    None,
    Message(String),
    /// A numbered list a later `set` can select from.
    Listing {
        title: String,
        items: Vec<Value>,
        warnings: Vec<String>,
    },
    Document {
        title: String,
        value: Value,
    },
    Routes {
        title: String,
        routes: Vec<RouteEntry>,
    },
    /// Legal completions, as printed by `?`.
    Options {
        heading: String,
        options: Vec<String>,
    },
    KeyValues {
        title: String,
        rows: Vec<(String, String)>,
    },
    Cache(Vec<CacheDescription>),
    RoutingSummary(Vec<SourceSummary>),
    Graph(GraphNode),
    GraphStats(GraphStats),
    GraphReport(GraphReport),
    CommandPath(CommandPath),
    ClearScreen,
    Quit,
}

/// Renders an output. An empty string means nothing should be printed.
pub fn render(output: &CommandOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => render_json(output),
        OutputFormat::Table => render_table(output),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

fn render_json(output: &CommandOutput) -> String {
    match output {
        CommandOutput::Listing { items, .. } => to_json(items),
        CommandOutput::Document { value, .. } => to_json(value),
        CommandOutput::Routes { routes, .. } => to_json(routes),
        CommandOutput::KeyValues { rows, .. } => to_json(
            &rows
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<serde_json::Map<String, Value>>(),
        ),
        CommandOutput::Cache(entries) => to_json(entries),
        CommandOutput::RoutingSummary(summary) => to_json(summary),
        CommandOutput::Graph(node) => to_json(node),
        CommandOutput::GraphStats(stats) => to_json(stats),
        CommandOutput::GraphReport(report) => to_json(report),
        CommandOutput::CommandPath(path) => to_json(path),
        // Conversational output stays plain text in both formats.
        other => render_table(other),
    }
}

fn render_table(output: &CommandOutput) -> String {
    match output {
        CommandOutput::None | CommandOutput::ClearScreen | CommandOutput::Quit => String::new(),
        CommandOutput::Message(text) => text.clone(),
        CommandOutput::Listing {
            title,
            items,
            warnings,
        } => {
            let mut out = listing_table(title, items);
            for warning in warnings {
                out.push_str(&format!("\n{} {}", "Warning:".yellow(), warning));
            }
            out
        }
        CommandOutput::Document { title, value } => {
            format!("{}\n{}", title.bold(), to_json(value))
        }
        CommandOutput::Routes { title, routes } => routes_table(title, routes),
        CommandOutput::Options { heading, options } => {
            let mut out = heading.bold().to_string();
            for option in options {
                out.push_str(&format!("\n  {}", option));
            }
            out
        }
        CommandOutput::KeyValues { title, rows } => {
            let width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0) + 1;
            let mut out = format!("--- {} ---", title.bold());
            for (key, value) in rows {
                out.push_str(&format!("\n  {:<width$} {}", format!("{}:", key), value, width = width));
            }
            out
        }
        CommandOutput::Cache(entries) => cache_table(entries),
        CommandOutput::RoutingSummary(summary) => summary_table(summary),
        CommandOutput::Graph(node) => {
            let mut out = String::new();
            tree_lines(node, "", true, true, &mut out);
            out.trim_end().to_string()
        }
        CommandOutput::GraphStats(stats) => format!(
            "{}\n  contexts:        {}\n  show commands:   {}\n  set commands:    {}\n  action commands: {}\n  edges:           {}\n  paths:           {}\n  max depth:       {}",
            "Command graph".bold(),
            stats.contexts,
            stats.show_commands,
            stats.set_commands,
            stats.action_commands,
            stats.edges,
            stats.paths,
            stats.max_depth
        ),
        CommandOutput::GraphReport(report) => report_text(report),
        CommandOutput::CommandPath(path) => {
            let mut out = format!("Reachable in '{}':", path.context);
            for (i, step) in path.steps.iter().enumerate() {
                out.push_str(&format!("\n  {}. {}", i + 1, step));
            }
            out
        }
    }
}

// --- Tables ---

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    let mut out = header_line.trim_end().cyan().bold().to_string();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect::<Vec<_>>()
            .join("  ");
        out.push('\n');
        out.push_str(line.trim_end());
    }
    out
}

/// Columns shown for listings, when at least one item has them.
const LISTING_COLUMNS: &[&str] = &["id", "name", "region", "state", "cidr", "type"];

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items.len().to_string(),
        Some(other) => other.to_string(),
    }
}

fn listing_table(title: &str, items: &[Value]) -> String {
    if items.is_empty() {
        return format!("No {} found.", title);
    }
    let mut columns: Vec<&str> = LISTING_COLUMNS
        .iter()
        .copied()
        .filter(|c| items.iter().any(|i| i.get(*c).is_some()))
        .collect();
    if items.iter().any(|i| i.get("routes").is_some_and(Value::is_array)) {
        columns.push("routes");
    }

    let mut headers = vec!["#"];
    headers.extend(columns.iter().copied());
    let rows: Vec<Vec<String>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut row = vec![(i + 1).to_string()];
            row.extend(columns.iter().map(|c| cell(item.get(*c))));
            row
        })
        .collect();
    format!("{}\n{}", title.bold(), table(&headers, &rows))
}

fn routes_table(title: &str, routes: &[RouteEntry]) -> String {
    if routes.is_empty() {
        return format!("{}: no matching routes.", title);
    }
    let rows: Vec<Vec<String>> = routes
        .iter()
        .map(|r| {
            vec![
                r.destination.clone(),
                if r.target.is_empty() { "-".to_string() } else { r.target.clone() },
                r.state.to_string(),
                r.source_kind.to_string(),
                r.source_id.clone(),
                r.owner_name.clone().unwrap_or_else(|| r.owner_id.clone()),
                r.region.clone(),
            ]
        })
        .collect();
    format!(
        "{} ({} route(s))\n{}",
        title.bold(),
        routes.len(),
        table(
            &["Destination", "Target", "State", "Source", "Table", "Owner", "Region"],
            &rows
        )
    )
}

fn cache_table(entries: &[CacheDescription]) -> String {
    if entries.is_empty() {
        return "Cache is empty.".to_string();
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.namespace.clone(),
                e.key.clone(),
                e.tier.to_string(),
                format!("{}s", e.age_seconds),
                format!("{}s", e.ttl_seconds),
                if e.expired { "yes".to_string() } else { "no".to_string() },
                e.owner_account_id.clone(),
            ]
        })
        .collect();
    table(
        &["Namespace", "Key", "Tier", "Age", "TTL", "Expired", "Account"],
        &rows,
    )
}

fn summary_table(summary: &[SourceSummary]) -> String {
    if summary.is_empty() {
        return "Routing cache is empty.".to_string();
    }
    let rows: Vec<Vec<String>> = summary
        .iter()
        .map(|s| {
            vec![
                s.kind.to_string(),
                s.owners.to_string(),
                s.route_tables.to_string(),
                s.routes.to_string(),
                s.blackholes.to_string(),
                s.regions.join(","),
            ]
        })
        .collect();
    table(
        &["Source", "Owners", "Tables", "Routes", "Blackholes", "Regions"],
        &rows,
    )
}

fn report_text(report: &GraphReport) -> String {
    if report.issues.is_empty() {
        return format!("{} Command graph is consistent.", "OK".green().bold());
    }
    let mut out = String::new();
    for issue in &report.issues {
        let label = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        out.push_str(&format!("{} [{}] {}\n", label, issue.context, issue.message));
    }
    let errors = report.errors().count();
    let warnings = report.warnings().count();
    out.push_str(&format!("{} error(s), {} warning(s)", errors, warnings));
    out
}

// --- Graph Tree ---

fn tree_lines(node: &GraphNode, prefix: &str, is_last: bool, is_root: bool, out: &mut String) {
    let connector = if is_last { "└─" } else { "├─" };
    let label = match &node.via {
        Some(via) => format!("{} (set {})", node.context.tag().cyan(), via),
        None => node.context.tag().cyan().bold().to_string(),
    };
    let child_prefix = if is_root {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "   " } else { "│  " })
    };

    if is_root {
        out.push_str(&format!("{}\n", label));
    } else {
        out.push_str(&format!("{}{}{}\n", prefix, connector, label));
    }

    for kind in [CommandKind::Show, CommandKind::Action] {
        let names: Vec<String> = node
            .commands
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| {
                if c.implemented {
                    c.name.clone()
                } else {
                    format!("{}(!)", c.name)
                }
            })
            .collect();
        if !names.is_empty() {
            let bar = if node.children.is_empty() { "   " } else { "│  " };
            out.push_str(&format!("{}{}{}: {}\n", child_prefix, bar, kind, names.join(" ").dimmed()));
        }
    }

    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == node.children.len();
        tree_lines(child, &child_prefix, last, false, out);
    }
}

// --- Prompt ---

fn truncate(label: &str, max_length: usize) -> String {
    if label.chars().count() <= max_length || max_length < 4 {
        return label.to_string();
    }
    let kept: String = label.chars().take(max_length - 3).collect();
    format!("{}...", kept)
}

/// The REPL prompt for the current stack.
pub fn prompt(frames: &[Context], settings: &PromptSection) -> String {
    let mut out = String::from("netscope");
    for frame in frames {
        out.push('>');
        match settings.style {
            PromptStyle::Short => {
                out.push_str(&format!(
                    "{}:{}",
                    frame.context_type.abbreviation(),
                    frame.selection_index
                ));
            }
            PromptStyle::Long => {
                out.push_str(&format!(
                    "{}:{}",
                    frame.context_type.tag(),
                    truncate(frame.label(), settings.max_length)
                ));
            }
        }
    }
    out.push_str("> ");
    out
}

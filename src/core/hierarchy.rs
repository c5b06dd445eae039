// src/core/hierarchy.rs

//! # Command Hierarchy Graph
//!
//! A static table declares, for every context type, which `show`, `set` and
//! action commands are legal there and which `set` commands enter a child
//! context. [`CommandGraph`] indexes that table once and answers every
//! structural question the shell asks: legality, transitions, parents, depth,
//! discovery paths, and whether a handler exists for every declared command.

use crate::models::{CommandKind, ContextType};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;

/// Navigation verbs legal in every context.
pub const NAVIGATION_COMMANDS: &[&str] = &["exit", "end", "clear", "help"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("'set {command}' does not enter a context from '{context}'.")]
    NotFound { context: ContextType, command: String },
    #[error("No context in the hierarchy offers '{command}'.")]
    CommandNotFound { command: String },
}

type GraphResult<T> = Result<T, GraphError>;

// --- Static Definition ---

/// What a `set` sub-command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTarget {
    /// Selects a resource and pushes a frame of the given type.
    Enter(ContextType),
    /// Changes a runtime setting; never changes the stack.
    Setting,
}

#[derive(Debug, Clone, Copy)]
pub struct SetCommand {
    pub name: &'static str,
    pub target: SetTarget,
    /// The `show` command whose output this `set` resolves against.
    pub listed_by: Option<&'static str>,
}

const fn enter(name: &'static str, context: ContextType, listed_by: &'static str) -> SetCommand {
    SetCommand {
        name,
        target: SetTarget::Enter(context),
        listed_by: Some(listed_by),
    }
}

const fn setting(name: &'static str) -> SetCommand {
    SetCommand {
        name,
        target: SetTarget::Setting,
        listed_by: None,
    }
}

/// The declared command surface of one context type.
#[derive(Debug, Clone, Copy)]
pub struct ContextDef {
    pub context: ContextType,
    pub show: &'static [&'static str],
    pub set: &'static [SetCommand],
    pub actions: &'static [&'static str],
}

const ROUTE_QUERIES: &[&str] = &["find_prefix", "find_null_routes"];

/// The hierarchy the shell ships with.
pub static STANDARD_HIERARCHY: &[ContextDef] = &[
    ContextDef {
        context: ContextType::Root,
        show: &[
            "version",
            "config",
            "cache",
            "routing-cache",
            "graph",
            "global-networks",
            "vpcs",
            "transit-gateways",
            "firewalls",
            "ec2-instances",
            "elbs",
            "vpns",
        ],
        set: &[
            enter("global-network", ContextType::GlobalNetwork, "global-networks"),
            enter("vpc", ContextType::Vpc, "vpcs"),
            enter("transit-gateway", ContextType::TransitGateway, "transit-gateways"),
            enter("firewall", ContextType::Firewall, "firewalls"),
            enter("ec2-instance", ContextType::Ec2Instance, "ec2-instances"),
            enter("elb", ContextType::Elb, "elbs"),
            enter("vpn", ContextType::Vpn, "vpns"),
            setting("profile"),
            setting("regions"),
            setting("no-cache"),
            setting("output-format"),
        ],
        actions: &[
            "find_prefix",
            "find_null_routes",
            "create_routing_cache",
            "refresh",
            "clear_cache",
            "validate_graph",
        ],
    },
    ContextDef {
        context: ContextType::GlobalNetwork,
        show: &["detail", "core-networks"],
        set: &[enter("core-network", ContextType::CoreNetwork, "core-networks")],
        actions: &[],
    },
    ContextDef {
        context: ContextType::CoreNetwork,
        show: &[
            "detail",
            "segments",
            "policy",
            "routes",
            "route-tables",
            "blackhole-routes",
        ],
        set: &[enter("route-table", ContextType::RouteTable, "route-tables")],
        actions: ROUTE_QUERIES,
    },
    ContextDef {
        context: ContextType::RouteTable,
        show: &["detail", "routes"],
        set: &[],
        actions: ROUTE_QUERIES,
    },
    ContextDef {
        context: ContextType::Vpc,
        show: &[
            "detail",
            "route-tables",
            "subnets",
            "security-groups",
            "nacls",
            "internet-gateways",
            "nat-gateways",
            "endpoints",
        ],
        set: &[enter("route-table", ContextType::RouteTable, "route-tables")],
        actions: ROUTE_QUERIES,
    },
    ContextDef {
        context: ContextType::TransitGateway,
        show: &["detail", "route-tables", "attachments"],
        set: &[enter("route-table", ContextType::RouteTable, "route-tables")],
        actions: ROUTE_QUERIES,
    },
    ContextDef {
        context: ContextType::Firewall,
        show: &["detail", "rule-groups", "policy"],
        set: &[],
        actions: &[],
    },
    ContextDef {
        context: ContextType::Ec2Instance,
        show: &["detail", "security-groups", "enis", "routes"],
        set: &[],
        actions: &[],
    },
    ContextDef {
        context: ContextType::Elb,
        show: &["detail", "listeners", "targets", "health"],
        set: &[],
        actions: &[],
    },
    ContextDef {
        context: ContextType::Vpn,
        show: &["detail", "tunnels"],
        set: &[],
        actions: &[],
    },
];

lazy_static! {
    static ref STANDARD_GRAPH: Arc<CommandGraph> =
        Arc::new(CommandGraph::new(STANDARD_HIERARCHY));
}

/// The process-wide graph built from [`STANDARD_HIERARCHY`].
pub fn standard() -> Arc<CommandGraph> {
    Arc::clone(&STANDARD_GRAPH)
}

// --- Handler Registry Seam ---

/// Anything that can say whether a command has an implementation.
pub trait HandlerRegistry {
    /// True when `name` of `kind` has a handler usable in `context`.
    fn has_handler(&self, context: ContextType, kind: CommandKind, name: &str) -> bool;

    /// Every registered handler: `(context, kind, name)`. `None` means any context.
    fn registered(&self) -> Vec<(Option<ContextType>, CommandKind, String)>;
}

// --- Reports ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    /// A declared command has no handler.
    MissingHandler,
    /// A `set` edge points at a context nobody declares.
    UnknownTarget,
    /// Context edges loop back on themselves.
    Cycle,
    /// A handler exists for a command no context declares.
    Orphan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub context: ContextType,
    pub message: String,
}

/// Result of [`CommandGraph::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphReport {
    pub issues: Vec<GraphIssue>,
}

impl GraphReport {
    /// Warnings do not make a graph invalid.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &GraphIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &GraphIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// The commands a user types, from root, to reach and run a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPath {
    /// Context in which the final command is legal.
    pub context: ContextType,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub contexts: usize,
    pub show_commands: usize,
    pub set_commands: usize,
    pub action_commands: usize,
    pub edges: usize,
    /// Distinct root-to-context paths, root included.
    pub paths: usize,
    pub max_depth: usize,
}

/// One command as shown in the graph tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphCommand {
    pub kind: CommandKind,
    pub name: String,
    pub implemented: bool,
}

/// A context in the rendered hierarchy tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub context: ContextType,
    /// The `set` command that enters this node from its parent.
    pub via: Option<String>,
    pub commands: Vec<GraphCommand>,
    pub children: Vec<GraphNode>,
}

// --- The Graph ---

/// Immutable index over a hierarchy definition.
#[derive(Debug)]
pub struct CommandGraph {
    defs: Vec<ContextDef>,
    positions: HashMap<ContextType, usize>,
    edges: HashMap<(ContextType, &'static str), ContextType>,
    parents: HashMap<ContextType, Vec<ContextType>>,
}

impl CommandGraph {
    /// Indexes a hierarchy definition. Structural defects are not rejected here;
    /// they are reported by [`CommandGraph::validate`].
    pub fn new(defs: &[ContextDef]) -> Self {
        let mut positions = HashMap::new();
        let mut edges = HashMap::new();
        let mut parents: HashMap<ContextType, Vec<ContextType>> = HashMap::new();

        for (i, def) in defs.iter().enumerate() {
            positions.entry(def.context).or_insert(i);
            for cmd in def.set {
                if let SetTarget::Enter(child) = cmd.target {
                    edges.insert((def.context, cmd.name), child);
                    let list = parents.entry(child).or_default();
                    if !list.contains(&def.context) {
                        list.push(def.context);
                    }
                }
            }
        }

        log::debug!(
            "Command graph built: {} contexts, {} edges",
            positions.len(),
            edges.len()
        );

        Self {
            defs: defs.to_vec(),
            positions,
            edges,
            parents,
        }
    }

    fn def(&self, context: ContextType) -> Option<&ContextDef> {
        self.positions.get(&context).and_then(|&i| self.defs.get(i))
    }

    /// Whether `name` of `kind` may be typed in `context`.
    pub fn is_legal(&self, context: ContextType, kind: CommandKind, name: &str) -> bool {
        if kind == CommandKind::Action && NAVIGATION_COMMANDS.contains(&name) {
            return true;
        }
        let Some(def) = self.def(context) else {
            return false;
        };
        match kind {
            CommandKind::Show => def.show.contains(&name),
            CommandKind::Set => def.set.iter().any(|s| s.name == name),
            CommandKind::Action => def.actions.contains(&name),
        }
    }

    /// Declared names of `kind` in `context`, in declaration order.
    pub fn commands(&self, context: ContextType, kind: CommandKind) -> Vec<&'static str> {
        let Some(def) = self.def(context) else {
            return Vec::new();
        };
        match kind {
            CommandKind::Show => def.show.to_vec(),
            CommandKind::Set => def.set.iter().map(|s| s.name).collect(),
            CommandKind::Action => def.actions.to_vec(),
        }
    }

    /// The full declaration of a `set` command in `context`.
    pub fn set_command(&self, context: ContextType, name: &str) -> Option<SetCommand> {
        self.def(context)?.set.iter().find(|s| s.name == name).copied()
    }

    /// The context a `set` command enters from `context`.
    ///
    /// # Errors
    /// Fails when `set_command` is not declared there or is a plain setting.
    pub fn child_context_for(&self, context: ContextType, set_command: &str) -> GraphResult<ContextType> {
        self.edges
            .get(&(context, set_command))
            .copied()
            .ok_or_else(|| GraphError::NotFound {
                context,
                command: set_command.to_string(),
            })
    }

    /// Context types reachable in one `set` from `context`, in declaration order.
    pub fn children_of(&self, context: ContextType) -> Vec<ContextType> {
        let mut out = Vec::new();
        if let Some(def) = self.def(context) {
            for cmd in def.set {
                if let SetTarget::Enter(child) = cmd.target {
                    if !out.contains(&child) {
                        out.push(child);
                    }
                }
            }
        }
        out
    }

    /// Context types from which `child` can be entered.
    pub fn valid_parents(&self, child: ContextType) -> &[ContextType] {
        self.parents.get(&child).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `show` command that lists what `set_command` resolves against.
    pub fn listing_command_for(&self, context: ContextType, set_command: &str) -> Option<&'static str> {
        self.set_command(context, set_command)?.listed_by
    }

    /// Longest chain of frames reachable from root. Cycles are not followed.
    pub fn max_depth(&self) -> usize {
        let mut visiting = HashSet::new();
        self.depth_from(ContextType::Root, &mut visiting)
    }

    fn depth_from(&self, context: ContextType, visiting: &mut HashSet<ContextType>) -> usize {
        if !visiting.insert(context) {
            return 0;
        }
        let mut deepest = 0;
        for child in self.children_of(context) {
            if !visiting.contains(&child) {
                deepest = deepest.max(1 + self.depth_from(child, visiting));
            }
        }
        visiting.remove(&context);
        deepest
    }

    // --- Validation ---

    /// Checks that every declared command has a handler, and reports
    /// structural problems and orphaned handlers.
    pub fn validate(&self, handlers: &dyn HandlerRegistry) -> GraphReport {
        let mut report = GraphReport::default();

        for def in &self.defs {
            let declared = def
                .show
                .iter()
                .map(|n| (CommandKind::Show, *n))
                .chain(def.set.iter().map(|s| (CommandKind::Set, s.name)))
                .chain(def.actions.iter().map(|n| (CommandKind::Action, *n)));

            for (kind, name) in declared {
                if !handlers.has_handler(def.context, kind, name) {
                    report.issues.push(GraphIssue {
                        severity: Severity::Error,
                        category: IssueCategory::MissingHandler,
                        context: def.context,
                        message: format!("'{} {}' is declared but has no handler", kind, name),
                    });
                }
            }

            for cmd in def.set {
                let SetTarget::Enter(child) = cmd.target else {
                    continue;
                };
                if !self.positions.contains_key(&child) {
                    report.issues.push(GraphIssue {
                        severity: Severity::Error,
                        category: IssueCategory::UnknownTarget,
                        context: def.context,
                        message: format!(
                            "'set {}' enters '{}', which has no definition",
                            cmd.name, child
                        ),
                    });
                }
            }
        }

        for nav in NAVIGATION_COMMANDS {
            if !handlers.has_handler(ContextType::Root, CommandKind::Action, nav) {
                report.issues.push(GraphIssue {
                    severity: Severity::Error,
                    category: IssueCategory::MissingHandler,
                    context: ContextType::Root,
                    message: format!("navigation command '{}' has no handler", nav),
                });
            }
        }

        if let Some(cycle) = self.find_cycle() {
            let first = cycle.first().copied().unwrap_or(ContextType::Root);
            let rendered: Vec<&str> = cycle.iter().map(|c| c.tag()).collect();
            report.issues.push(GraphIssue {
                severity: Severity::Error,
                category: IssueCategory::Cycle,
                context: first,
                message: format!("context edges form a cycle: {}", rendered.join(" -> ")),
            });
        }

        for (context, kind, name) in handlers.registered() {
            if kind == CommandKind::Action && NAVIGATION_COMMANDS.contains(&name.as_str()) {
                continue;
            }
            let declared = match context {
                Some(ctx) => self.is_legal(ctx, kind, &name),
                None => self.defs.iter().any(|d| self.is_legal(d.context, kind, &name)),
            };
            if !declared {
                report.issues.push(GraphIssue {
                    severity: Severity::Warning,
                    category: IssueCategory::Orphan,
                    context: context.unwrap_or(ContextType::Root),
                    message: format!("handler for '{} {}' is never reachable", kind, name),
                });
            }
        }

        log::debug!(
            "Graph validation finished with {} issue(s)",
            report.issues.len()
        );
        report
    }

    fn find_cycle(&self) -> Option<Vec<ContextType>> {
        let mut done = HashSet::new();
        for def in &self.defs {
            let mut stack = Vec::new();
            if let Some(cycle) = self.cycle_from(def.context, &mut stack, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    fn cycle_from(
        &self,
        context: ContextType,
        stack: &mut Vec<ContextType>,
        done: &mut HashSet<ContextType>,
    ) -> Option<Vec<ContextType>> {
        if let Some(pos) = stack.iter().position(|c| *c == context) {
            let mut cycle: Vec<ContextType> = stack.iter().skip(pos).copied().collect();
            cycle.push(context);
            return Some(cycle);
        }
        if done.contains(&context) {
            return None;
        }
        stack.push(context);
        for child in self.children_of(context) {
            if let Some(cycle) = self.cycle_from(child, stack, done) {
                return Some(cycle);
            }
        }
        stack.pop();
        done.insert(context);
        None
    }

    // --- Discovery ---

    /// Breadth-first search from root for the first context offering `command`.
    ///
    /// `command` is `"show <name>"`, `"set <name>"` or a bare name, in which
    /// case any kind matches. `set` edges are explored in declaration order, so
    /// the result is deterministic.
    pub fn shortest_path_to(&self, command: &str) -> GraphResult<CommandPath> {
        let mut words = command.split_whitespace();
        let (kinds, name): (&[CommandKind], String) = match (words.next(), words.next()) {
            (Some("show"), Some(n)) => (&[CommandKind::Show], n.to_string()),
            (Some("set"), Some(n)) => (&[CommandKind::Set], n.to_string()),
            (Some(n), None) => (
                &[CommandKind::Action, CommandKind::Show, CommandKind::Set],
                n.to_string(),
            ),
            _ => {
                return Err(GraphError::CommandNotFound {
                    command: command.to_string(),
                });
            }
        };

        let mut queue = VecDeque::from([(ContextType::Root, Vec::<String>::new())]);
        let mut seen = HashSet::from([ContextType::Root]);

        while let Some((context, steps)) = queue.pop_front() {
            if let Some(kind) = kinds.iter().find(|k| self.is_legal(context, **k, &name)) {
                let mut steps = steps;
                steps.push(match kind {
                    CommandKind::Show => format!("show {}", name),
                    CommandKind::Set => format!("set {}", name),
                    CommandKind::Action => name.clone(),
                });
                return Ok(CommandPath { context, steps });
            }
            let Some(def) = self.def(context) else {
                continue;
            };
            for cmd in def.set {
                let SetTarget::Enter(child) = cmd.target else {
                    continue;
                };
                if seen.insert(child) {
                    let mut next = steps.clone();
                    next.push(format!("set {}", cmd.name));
                    queue.push_back((child, next));
                }
            }
        }

        Err(GraphError::CommandNotFound {
            command: command.to_string(),
        })
    }

    /// Counts for `show graph stats`.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            contexts: self.positions.len(),
            edges: self.edges.len(),
            max_depth: self.max_depth(),
            ..GraphStats::default()
        };
        for def in &self.defs {
            stats.show_commands += def.show.len();
            stats.set_commands += def.set.len();
            stats.action_commands += def.actions.len();
        }
        let mut visiting = HashSet::new();
        stats.paths = self.count_paths(ContextType::Root, &mut visiting);
        stats
    }

    fn count_paths(&self, context: ContextType, visiting: &mut HashSet<ContextType>) -> usize {
        if !visiting.insert(context) {
            return 0;
        }
        let below: usize = self
            .children_of(context)
            .into_iter()
            .map(|c| self.count_paths(c, visiting))
            .sum();
        visiting.remove(&context);
        1 + below
    }

    /// The hierarchy as a tree rooted at root, annotated with handler coverage.
    /// A context reachable from several parents appears under each of them.
    pub fn tree(&self, handlers: &dyn HandlerRegistry) -> GraphNode {
        let mut visiting = HashSet::new();
        self.node(ContextType::Root, None, handlers, &mut visiting)
    }

    fn node(
        &self,
        context: ContextType,
        via: Option<String>,
        handlers: &dyn HandlerRegistry,
        visiting: &mut HashSet<ContextType>,
    ) -> GraphNode {
        visiting.insert(context);
        let mut commands = Vec::new();
        let mut children = Vec::new();

        for kind in [CommandKind::Show, CommandKind::Set, CommandKind::Action] {
            for name in self.commands(context, kind) {
                commands.push(GraphCommand {
                    kind,
                    name: name.to_string(),
                    implemented: handlers.has_handler(context, kind, name),
                });
            }
        }

        if let Some(def) = self.def(context) {
            for cmd in def.set {
                let SetTarget::Enter(child) = cmd.target else {
                    continue;
                };
                if !visiting.contains(&child) {
                    children.push(self.node(child, Some(cmd.name.to_string()), handlers, visiting));
                }
            }
        }

        visiting.remove(&context);
        GraphNode {
            context,
            via,
            commands,
            children,
        }
    }
}

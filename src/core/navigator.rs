// src/core/navigator.rs

use crate::core::hierarchy::CommandGraph;
use crate::models::{Context, ContextType};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Cannot enter '{to}' from '{from}'. Reachable from here: {}", format_legal(.legal))]
    InvalidTransition {
        from: ContextType,
        to: ContextType,
        legal: Vec<ContextType>,
    },
    #[error("Already at the top level.")]
    AlreadyAtRoot,
}

fn format_legal(legal: &[ContextType]) -> String {
    if legal.is_empty() {
        return "nothing".to_string();
    }
    legal.iter().map(|c| c.tag()).collect::<Vec<_>>().join(", ")
}

type NavigationResult<T> = Result<T, NavigationError>;

/// State machine over the stack of entered contexts.
///
/// Every frame's type is a legal child of the frame below it (or of root for
/// the first frame), so the depth never exceeds the graph's maximum depth.
#[derive(Debug, Clone)]
pub struct Navigator {
    graph: Arc<CommandGraph>,
    stack: Vec<Context>,
}

impl Navigator {
    pub fn new(graph: Arc<CommandGraph>) -> Self {
        Self {
            graph,
            stack: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Arc<CommandGraph> {
        &self.graph
    }

    /// Enters a child context.
    ///
    /// # Errors
    /// [`NavigationError::InvalidTransition`] when the graph does not reach
    /// `context_type` from the current context.
    pub fn push(
        &mut self,
        context_type: ContextType,
        reference: impl Into<String>,
        display_name: Option<String>,
        detail: Value,
        selection_index: usize,
    ) -> NavigationResult<&Context> {
        let from = self.current_context_type();
        let legal = self.graph.children_of(from);
        if !legal.contains(&context_type) {
            return Err(NavigationError::InvalidTransition {
                from,
                to: context_type,
                legal,
            });
        }

        let frame = Context {
            context_type,
            reference: reference.into(),
            display_name,
            detail,
            selection_index,
        };
        log::debug!(
            "Entering {} '{}' (depth {})",
            frame.context_type,
            frame.reference,
            self.stack.len() + 1
        );
        self.stack.push(frame);
        self.stack.last().ok_or(NavigationError::AlreadyAtRoot)
    }

    /// Leaves the current context.
    ///
    /// # Errors
    /// [`NavigationError::AlreadyAtRoot`] on an empty stack.
    pub fn pop(&mut self) -> NavigationResult<Context> {
        let frame = self.stack.pop().ok_or(NavigationError::AlreadyAtRoot)?;
        log::debug!("Left {} '{}'", frame.context_type, frame.reference);
        Ok(frame)
    }

    pub fn reset_to_root(&mut self) {
        if !self.stack.is_empty() {
            log::debug!("Returning to root from depth {}", self.stack.len());
        }
        self.stack.clear();
    }

    pub fn current_context_type(&self) -> ContextType {
        self.stack
            .last()
            .map(|f| f.context_type)
            .unwrap_or(ContextType::Root)
    }

    pub fn current_frame(&self) -> Option<&Context> {
        self.stack.last()
    }

    /// Frames from the outermost to the current one.
    pub fn frames(&self) -> &[Context] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

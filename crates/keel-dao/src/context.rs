//! Execution contexts and the stack that makes an accessor re-entrant.
//!
//! Each `start_operation` pushes a fresh [`ExecutionContext`]; each
//! terminal operation pops it, so the caller sees exactly the state it had
//! before. The bottom context is a sentinel and is never popped.

use keel_core::{FilterChain, ParamBindings};

use crate::error::{DaoError, Result};

/// The builder state of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    /// Table the operation targets.
    pub working_table: Option<String>,
    /// Explicit predicates.
    pub filters: FilterChain,
    /// Named parameter bindings.
    pub params: ParamBindings,
    /// Key under which keyless bindings accumulate.
    pub global_params_key: Option<String>,
    /// Inline SELECT text.
    pub inline_sql: Option<String>,
    /// Named SQL resource, tried before the inline text.
    pub sql_resource: Option<String>,
    /// Procedures known for the working table, loaded on first call.
    pub procedures: Option<Vec<String>>,
}

impl ExecutionContext {
    /// Creates a fresh context for `table`.
    #[must_use]
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            working_table: Some(table.into()),
            ..Self::default()
        }
    }
}

/// LIFO stack of contexts, indexed by position.
#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<ExecutionContext>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    /// Creates a stack holding only the initial context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![ExecutionContext::default()],
        }
    }

    /// Number of contexts, including the initial one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The live context.
    #[must_use]
    pub fn current(&self) -> &ExecutionContext {
        // frames is never empty
        &self.frames[self.frames.len() - 1]
    }

    /// The live context, mutably.
    pub fn current_mut(&mut self) -> &mut ExecutionContext {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    /// Pushes a fresh context for `table`.
    pub fn push(&mut self, table: impl Into<String>) {
        self.frames.push(ExecutionContext::for_table(table));
    }

    /// Pops the live context and returns it. Fails on the initial context.
    pub fn pop(&mut self) -> Result<ExecutionContext> {
        if self.frames.len() <= 1 {
            return Err(DaoError::ContextUnderflow);
        }
        self.frames.pop().ok_or(DaoError::ContextUnderflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{Operator, ToSqlValue};

    #[test]
    fn test_initial_context_is_idle() {
        let stack = ContextStack::new();
        assert_eq!(stack.depth(), 1);
        assert!(stack.current().working_table.is_none());
    }

    #[test]
    fn test_push_pop_restores_previous_state() {
        let mut stack = ContextStack::new();
        stack.push("users");
        stack.current_mut().filters.open("id", true).unwrap();
        stack
            .current_mut()
            .filters
            .compare(Operator::Eq, 1_i64.to_sql_value())
            .unwrap();
        let before = stack.current().clone();

        stack.push("orders");
        assert_eq!(stack.depth(), 3);
        assert!(stack.current().filters.is_empty());

        let popped = stack.pop().unwrap();
        assert_eq!(popped.working_table.as_deref(), Some("orders"));
        assert_eq!(stack.current(), &before);
    }

    #[test]
    fn test_initial_context_cannot_be_popped() {
        let mut stack = ContextStack::new();
        assert!(matches!(stack.pop(), Err(DaoError::ContextUnderflow)));
        assert_eq!(stack.depth(), 1);
    }
}

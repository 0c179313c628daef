//! State shared by every parse and expansion of one compile unit.

use serde::Serialize;
use tracing::debug;

use crate::ast::{Program, Span};
use crate::macros::{Color, MacroRegistry, ScopeArena};

/// One macro expansion, recorded when tracing is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct ExpansionStep {
    pub macro_name: String,
    pub span: Span,
    /// The invocation's argument tokens, as text.
    pub input: String,
    pub color: Option<Color>,
    /// The fully compiled expansion; filled in once nested expansions are done.
    pub expansion: Option<Program>,
}

#[derive(Debug, Default)]
pub struct Session {
    pub scopes: ScopeArena,
    pub macros: MacroRegistry,
    next_color: u32,
    trace: Vec<ExpansionStep>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colors are numbered from 1 within a session.
    pub fn allocate_color(&mut self) -> Color {
        self.next_color += 1;
        let color = Color::new(self.next_color);
        debug!(color = color.value(), "allocated hygiene color");
        color
    }

    pub fn trace(&self) -> &[ExpansionStep] {
        &self.trace
    }

    pub(crate) fn begin_step(&mut self, step: ExpansionStep) -> usize {
        self.trace.push(step);
        self.trace.len() - 1
    }

    pub(crate) fn finish_step(&mut self, index: usize, color: Option<Color>, expansion: &Program) {
        if let Some(step) = self.trace.get_mut(index) {
            step.color = color;
            step.expansion = Some(expansion.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_start_at_one_per_session() {
        let mut a = Session::new();
        let mut b = Session::new();
        assert_eq!(a.allocate_color().value(), 1);
        assert_eq!(a.allocate_color().value(), 2);
        assert_eq!(b.allocate_color().value(), 1);
    }
}

//! # Macro System
//!
//! Declarative, pattern-matched macros over the host token stream.
//!
//! ## Pipeline
//!
//! 1. [`MacroParser`] reads `macro name { (pattern) => { body } ... }`
//!    declarations and captures every `name(...)` call to a visible macro as a
//!    raw token tree.
//! 2. The pattern matcher tries the declaration's alternatives in order and
//!    binds the invocation's tokens to `$name:kind` captures.
//! 3. The [`Expander`] instantiates the winning body and re-parses it under a
//!    [`Hygiene`] context, so bindings the body introduces get a fresh color
//!    and cannot capture or be captured by names at the call site.
//!
//! Splicing the result back into the tree is the job of
//! [`crate::compiler`].
//!
//! ## Scopes
//!
//! Visibility of macros and hygiene colors is tracked in a [`ScopeArena`].
//! A [`ScopeStack`] is a cheap snapshot of scope ids; marks written to a scope
//! after a snapshot was taken are still seen through it.

pub mod expander;
pub mod hygiene;
pub mod matcher;
pub mod parser;
pub mod scope;
pub mod tokentree;
pub mod types;

pub use expander::{Expander, Expansion};
pub use hygiene::{Hygiene, TokenScope};
pub use matcher::{Bindings, Fragment};
pub use parser::MacroParser;
pub use scope::{Color, ScopeArena, ScopeId, ScopeStack};
pub use types::{CaptureKind, MacroDeclaration, MacroId, MacroPattern, MacroPatternArgument, MacroRegistry};

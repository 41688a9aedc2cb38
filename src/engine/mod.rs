//! Rule-Driven Matching Engine
//!
//! The generic half of the crate: a stateful tokenizer that knows nothing
//! about XML. Grammars are tables of states and rules; input is a stream of
//! decoded code points; output is a stream of pre-text / match-text events
//! delivered to a [`TokenHandler`].
//!
//! ## Data Flow
//!
//! ```text
//! bytes --> Decoder --> Parser::accept --> candidate search --> events
//!                            |                                    |
//!                            v                                    v
//!                      state stack                          TokenHandler
//! ```
//!
//! ## Pieces
//!
//! - `rules` - grammar templates ([`State`], [`Rule`]) and the event protocol
//! - `matcher` - the longest-match candidate search with deferral
//! - `parser` - the engine instance: buffer, stack, transitions, byte API
//! - `diagnostics` - the append-only message sink

pub mod diagnostics;
mod matcher;
pub mod parser;
pub mod rules;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use parser::Parser;
pub use rules::{
    Destination, MatchContext, Rule, RuleCallback, RuleOptions, State, TokenHandler, TokenKind,
};

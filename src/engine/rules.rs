//! Grammar templates and the token event protocol.
//!
//! A grammar is a caller-owned slice of [`State`]s, each holding an ordered
//! list of [`Rule`]s. Registration deep-copies the whole table into the
//! parser, so one static template may initialize any number of instances.
//!
//! Rules carry their behavior in an option bitset plus a destination:
//! - `Destination::State(id)` switches to a named state (optionally pushing
//!   the current one first when the rule is marked `PUSH`);
//! - `Destination::Previous` pops the most recently pushed state, or swaps
//!   the current and saved states when combined with `PUSH`.
//!
//! Token events reach the handler through a layered callback resolution:
//! per-rule, then per-state, then the global [`TokenHandler`] impl itself.

use bitflags::bitflags;

use crate::error::Result;

bitflags! {
    /// Per-rule behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RuleOptions: u8 {
        /// Match triggers ASCII case-insensitively.
        const CASE_INSENSITIVE = 1 << 0;
        /// Never emit the pre-text event.
        const SUPPRESS_PRE = 1 << 1;
        /// Never emit the match-text event.
        const SUPPRESS_MATCH = 1 << 2;
        /// Emit the match-text event only when a pre-text event went out.
        const SUPPRESS_MATCH_IF_NO_PRE = 1 << 3;
        /// Save the current state on the stack before transitioning.
        const PUSH = 1 << 4;
    }
}

/// Where a rule sends the parser when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Switch to the named state.
    State(String),
    /// Restore the most recently pushed state (pop; swap when pushed too).
    Previous,
}

/// Which of the two event payloads a token carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Text preceding the trigger occurrence.
    Pre,
    /// The trigger text itself.
    Match,
}

/// Read-only view of the engine handed to token callbacks.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Id of the state whose rule fired (the active state at firing time).
    pub state: &'a str,
    /// Id of the most recently saved state, as it stood when the rule fired.
    ///
    /// Events are emitted before the stack transition runs, so for a pop
    /// rule inside a pushed sub-grammar this is the state that was active
    /// before the push — the entity-resolution anchor.
    pub previous: Option<&'a str>,
}

/// The global token consumer; the bottom layer of callback resolution.
pub trait TokenHandler {
    /// Receive one token event. Returning an error aborts the in-flight
    /// accept call; `NotReady`/`NotFound` are additionally recorded in the
    /// parser diagnostics.
    fn token(&mut self, ctx: &MatchContext<'_>, kind: TokenKind, text: &str) -> Result<()>;
}

/// Per-rule / per-state callback slot. Plain `fn` pointers keep templates
/// `Clone` without bounds on the handler type.
pub type RuleCallback<H> = fn(&mut H, &MatchContext<'_>, TokenKind, &str) -> Result<()>;

/// One trigger set + options + destination; an atomic grammar transition.
pub struct Rule<H> {
    pub(crate) triggers: Vec<String>,
    pub(crate) options: RuleOptions,
    pub(crate) destination: Destination,
    pub(crate) callback: Option<RuleCallback<H>>,
}

impl<H> Rule<H> {
    pub fn new(triggers: &[&str], destination: Destination) -> Rule<H> {
        Rule {
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            options: RuleOptions::empty(),
            destination,
            callback: None,
        }
    }

    /// Rule transitioning to a named state.
    pub fn to(triggers: &[&str], state: &str) -> Rule<H> {
        Rule::new(triggers, Destination::State(state.to_string()))
    }

    /// Pop rule (destination = previous).
    pub fn pop(triggers: &[&str]) -> Rule<H> {
        Rule::new(triggers, Destination::Previous)
    }

    pub fn with_options(mut self, options: RuleOptions) -> Rule<H> {
        self.options = options;
        self
    }

    pub fn with_callback(mut self, callback: RuleCallback<H>) -> Rule<H> {
        self.callback = Some(callback);
        self
    }

    #[inline]
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    #[inline]
    pub fn options(&self) -> RuleOptions {
        self.options
    }

    #[inline]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Whether this rule pops the state stack when it fires.
    #[inline]
    pub fn is_pop(&self) -> bool {
        self.destination == Destination::Previous
    }
}

// Manual impl: `H` itself need not be `Clone` (fn pointers always are).
impl<H> Clone for Rule<H> {
    fn clone(&self) -> Rule<H> {
        Rule {
            triggers: self.triggers.clone(),
            options: self.options,
            destination: self.destination.clone(),
            callback: self.callback,
        }
    }
}

/// A named mode with its own rule set; a position in the grammar.
pub struct State<H> {
    pub(crate) id: String,
    pub(crate) rules: Vec<Rule<H>>,
    pub(crate) callback: Option<RuleCallback<H>>,
}

impl<H> State<H> {
    pub fn new(id: &str) -> State<H> {
        State {
            id: id.to_string(),
            rules: Vec::new(),
            callback: None,
        }
    }

    /// Append a rule; earlier rules win full candidate ties.
    pub fn with_rule(mut self, rule: Rule<H>) -> State<H> {
        self.rules.push(rule);
        self
    }

    pub fn with_callback(mut self, callback: RuleCallback<H>) -> State<H> {
        self.callback = Some(callback);
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn rules(&self) -> &[Rule<H>] {
        &self.rules
    }
}

impl<H> Clone for State<H> {
    fn clone(&self) -> State<H> {
        State {
            id: self.id.clone(),
            rules: self.rules.clone(),
            callback: self.callback,
        }
    }
}

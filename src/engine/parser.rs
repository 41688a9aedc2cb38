//! The stateful matching engine.
//!
//! A [`Parser`] owns a private copy of a registered state table, an active
//! state, a LIFO stack of saved states, the token buffer, and a diagnostics
//! list. Input arrives either as decoded code points through [`Parser::accept`]
//! or as raw bytes through the buffer API ([`Parser::parse`] single-shot, or
//! `start_buffer` / `next_buffer` / `finish_buffer` for chunked streams).
//!
//! Each accepted code point re-runs the candidate search over the buffer.
//! When an exact candidate wins, the buffer is split into pre / match / rest,
//! the pre-text and match-text events are emitted (rule callback, else state
//! callback, else the global handler), and only then does the state
//! transition execute. A deferred winner takes no action at all.

use tracing::{debug, trace};

use crate::encoding::{Decoder, Encoding};
use crate::error::{Error, Result};

use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::matcher::best_candidate;
use super::rules::{Destination, MatchContext, RuleOptions, State, TokenHandler, TokenKind};

/// Reserved destination sentinel; not usable as a state id.
const PREVIOUS_ID: &str = "Previous";

/// A rule-driven stateful tokenizer, generic over the token handler.
pub struct Parser<H> {
    states: Vec<State<H>>,
    active: Option<usize>,
    stack: Vec<usize>,
    buffer: String,
    diagnostics: Diagnostics,
    decoder: Option<Decoder>,
    encoding: Option<Encoding>,
}

impl<H: TokenHandler> Parser<H> {
    /// Create an engine with no registered states. Every accept fails
    /// `NotReady` until [`register_states`](Parser::register_states) runs.
    pub fn new() -> Parser<H> {
        Parser {
            states: Vec::new(),
            active: None,
            stack: Vec::new(),
            buffer: String::new(),
            diagnostics: Diagnostics::new(),
            decoder: None,
            encoding: None,
        }
    }

    /// Register the grammar: deep-copy the state table and activate
    /// `initial`. The template stays caller-owned and may initialize any
    /// number of instances.
    ///
    /// Fails `InvalidArgument` for an empty table, a duplicate or reserved
    /// state id, a rule without triggers or with an empty trigger string, or
    /// a second registration; `NotFound` when `initial` or a rule
    /// destination names no state in the table.
    pub fn register_states(&mut self, table: &[State<H>], initial: &str) -> Result<()> {
        if !self.states.is_empty() {
            return Err(Error::invalid("states are already registered"));
        }
        if table.is_empty() {
            return Err(Error::invalid("state table is empty"));
        }
        for (index, state) in table.iter().enumerate() {
            if state.id == PREVIOUS_ID {
                return Err(Error::invalid(format!(
                    "state id {PREVIOUS_ID:?} is reserved"
                )));
            }
            if table[..index].iter().any(|s| s.id == state.id) {
                return Err(Error::invalid(format!("duplicate state id {:?}", state.id)));
            }
            for rule in &state.rules {
                if rule.triggers.is_empty() {
                    return Err(Error::invalid(format!(
                        "rule in state {:?} has no triggers",
                        state.id
                    )));
                }
                if rule.triggers.iter().any(String::is_empty) {
                    return Err(Error::invalid(format!(
                        "rule in state {:?} has an empty trigger",
                        state.id
                    )));
                }
                if let Destination::State(id) = &rule.destination {
                    if !table.iter().any(|s| &s.id == id) {
                        return Err(Error::not_found(format!(
                            "destination state {id:?} is not registered"
                        )));
                    }
                }
            }
        }
        let start = table.iter().position(|s| s.id == initial).ok_or_else(|| {
            Error::not_found(format!("initial state {initial:?} is not registered"))
        })?;
        self.states = table.to_vec();
        self.active = Some(start);
        debug!(states = table.len(), initial, "state table registered");
        Ok(())
    }

    /// Id of the active state, if any.
    #[inline]
    pub fn state(&self) -> Option<&str> {
        self.active.map(|i| self.states[i].id.as_str())
    }

    /// Id of the most recently saved state (the stack top), if any.
    #[inline]
    pub fn previous_state(&self) -> Option<&str> {
        self.stack.last().map(|&i| self.states[i].id.as_str())
    }

    /// Encoding resolved for the current or last byte stream.
    #[inline]
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Messages recorded so far.
    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[inline]
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Feed one decoded code point into the active state's rule set.
    ///
    /// Most calls just grow the token buffer. When a trigger completes, the
    /// pre-text and match-text events are emitted and the rule's transition
    /// runs; a handler error aborts the call before the transition and is
    /// returned to the caller.
    pub fn accept(&mut self, handler: &mut H, point: char) -> Result<()> {
        let current = self
            .active
            .ok_or_else(|| Error::not_ready("no active state"))?;
        self.buffer.push(point);

        let candidate = match best_candidate(&self.buffer, &self.states[current].rules) {
            Some(c) => c,
            None => return Ok(()),
        };
        if candidate.deferred {
            trace!(offset = candidate.offset, rule = candidate.rule, "deferred");
            return Ok(());
        }

        // Split buffer into pre / match / rest, keeping rest accumulated.
        let rest = self.buffer.split_off(candidate.offset + candidate.len);
        let matched = self.buffer.split_off(candidate.offset);
        let pre = std::mem::replace(&mut self.buffer, rest);

        let rule = &self.states[current].rules[candidate.rule];
        let options = rule.options;
        let destination = rule.destination.clone();
        let rule_callback = rule.callback;
        let state_callback = self.states[current].callback;

        trace!(
            state = %self.states[current].id,
            rule = candidate.rule,
            matched = %matched,
            pre = %pre,
            "rule fired"
        );

        let suppress_pre = pre.is_empty() || options.contains(RuleOptions::SUPPRESS_PRE);
        let suppress_match = options.contains(RuleOptions::SUPPRESS_MATCH)
            || (options.contains(RuleOptions::SUPPRESS_MATCH_IF_NO_PRE) && suppress_pre);

        let outcome = {
            let ctx = MatchContext {
                state: self.states[current].id.as_str(),
                previous: self.stack.last().map(|&i| self.states[i].id.as_str()),
            };
            let deliver = |handler: &mut H, kind: TokenKind, text: &str| -> Result<()> {
                if let Some(callback) = rule_callback {
                    return callback(handler, &ctx, kind, text);
                }
                if let Some(callback) = state_callback {
                    return callback(handler, &ctx, kind, text);
                }
                handler.token(&ctx, kind, text)
            };
            let mut outcome = Ok(());
            if !suppress_pre {
                outcome = deliver(handler, TokenKind::Pre, &pre);
            }
            if outcome.is_ok() && !suppress_match {
                outcome = deliver(handler, TokenKind::Match, &matched);
            }
            outcome
        };
        if let Err(err) = outcome {
            self.record_callback_failure(&err);
            return Err(err);
        }

        self.transition(current, options, destination)
    }

    /// Single-shot byte parse: open a stream, decode and accept every code
    /// point, close the stream.
    pub fn parse(&mut self, handler: &mut H, bytes: &[u8], encoding: Option<&str>) -> Result<()> {
        self.start_buffer(encoding)?;
        self.next_buffer(handler, bytes)?;
        self.finish_buffer()
    }

    /// Open a byte stream with an optional declared encoding label. The
    /// token buffer starts clean; fails `InvalidArgument` when a stream is
    /// already open and `Unsupported` for an unknown label.
    pub fn start_buffer(&mut self, encoding: Option<&str>) -> Result<()> {
        if self.decoder.is_some() {
            return Err(Error::invalid("a byte stream is already open"));
        }
        self.buffer.clear();
        self.encoding = None;
        self.decoder = Some(Decoder::new(encoding)?);
        Ok(())
    }

    /// Decode one chunk of the open stream and accept every resulting code
    /// point. Fails `NotReady` when no stream is open.
    pub fn next_buffer(&mut self, handler: &mut H, chunk: &[u8]) -> Result<()> {
        let text = match self.decoder.as_mut() {
            Some(decoder) => decoder.decode(chunk)?,
            None => return Err(Error::not_ready("no open byte stream")),
        };
        if self.encoding.is_none() {
            self.encoding = self.decoder.as_ref().and_then(|d| d.encoding());
            if let Some(encoding) = self.encoding {
                debug!(?encoding, "stream encoding resolved");
            }
        }
        for point in text.chars() {
            self.accept(handler, point)?;
        }
        Ok(())
    }

    /// Close the open byte stream, dropping any incomplete code unit carried
    /// between chunks. Text still sitting in the token buffer is not
    /// emitted. Fails `NotReady` when no stream is open.
    pub fn finish_buffer(&mut self) -> Result<()> {
        match self.decoder.take() {
            Some(mut decoder) => {
                decoder.finish();
                Ok(())
            }
            None => Err(Error::not_ready("no open byte stream")),
        }
    }

    fn record_callback_failure(&mut self, err: &Error) {
        match err {
            Error::NotFound(message) => self
                .diagnostics
                .add(DiagnosticKind::Error, format!("unexpected token: {message}")),
            Error::NotReady(message) => self.diagnostics.add(
                DiagnosticKind::Error,
                format!("unexpected termination: {message}"),
            ),
            _ => {}
        }
    }

    /// Apply a fired rule's destination: pop or swap for `Previous`, push
    /// then switch for a named state.
    fn transition(
        &mut self,
        current: usize,
        options: RuleOptions,
        destination: Destination,
    ) -> Result<()> {
        let push = options.contains(RuleOptions::PUSH);
        let next = match destination {
            Destination::Previous if push => match self.stack.last_mut() {
                // Swap: the saved state resumes, the current one replaces it.
                Some(top) => {
                    let saved = *top;
                    *top = current;
                    saved
                }
                None => {
                    self.active = None;
                    return Err(Error::not_found("state stack is empty"));
                }
            },
            Destination::Previous => match self.stack.pop() {
                Some(saved) => saved,
                None => {
                    self.active = None;
                    return Err(Error::not_found("state stack is empty"));
                }
            },
            Destination::State(id) => {
                let target = self
                    .states
                    .iter()
                    .position(|s| s.id == id)
                    .ok_or_else(|| Error::not_found(format!("state {id:?} is not registered")))?;
                if push {
                    self.stack.push(current);
                }
                target
            }
        };
        trace!(
            from = %self.states[current].id,
            to = %self.states[next].id,
            depth = self.stack.len(),
            "transition"
        );
        self.active = Some(next);
        Ok(())
    }
}

impl<H: TokenHandler> Default for Parser<H> {
    fn default() -> Parser<H> {
        Parser::new()
    }
}

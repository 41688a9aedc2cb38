//! Candidate search over the token buffer.
//!
//! Every accepted code point re-runs this search: each trigger of each rule
//! of the active state is located in the buffer, producing either an exact
//! candidate (the trigger occurs in full) or a deferred candidate (a buffer
//! suffix is a proper prefix of the trigger — the trigger may still complete
//! with more input). The winner is chosen by smallest offset, then longest
//! trigger, then exact over deferred, then registration order.
//!
//! The deferral rule is what lets one state host `<`, `<!`, `<!--` and
//! `<?xml` together: while the buffer holds just `<`, every longer trigger
//! posts a deferred candidate at the same offset that outranks the
//! one-character exact match, so the engine waits instead of firing early.

use memchr::{memchr_iter, memchr2_iter};

use super::rules::{Rule, RuleOptions};

/// One potential match found in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    /// Byte offset of the occurrence (or of the partial suffix).
    pub offset: usize,
    /// Bytes of the trigger actually present in the buffer.
    pub len: usize,
    /// Full trigger length; the prospective length a deferred candidate
    /// competes with.
    pub trigger_len: usize,
    /// True when the trigger has not completed yet.
    pub deferred: bool,
    /// Index of the owning rule in the active state.
    pub rule: usize,
}

impl Candidate {
    /// Deterministic ordering: smallest offset, then longest trigger, then
    /// exact over deferred. Equal candidates keep the incumbent (earlier
    /// registered rule).
    fn beats(&self, other: &Candidate) -> bool {
        if self.offset != other.offset {
            return self.offset < other.offset;
        }
        if self.trigger_len != other.trigger_len {
            return self.trigger_len > other.trigger_len;
        }
        !self.deferred && other.deferred
    }
}

/// Search the buffer against every trigger of every rule, returning the
/// winning candidate, if any.
pub(crate) fn best_candidate<H>(buffer: &str, rules: &[Rule<H>]) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for (rule_index, rule) in rules.iter().enumerate() {
        let ci = rule.options.contains(RuleOptions::CASE_INSENSITIVE);
        for trigger in &rule.triggers {
            let candidate = if let Some(offset) = find(buffer, trigger, ci) {
                Candidate {
                    offset,
                    len: trigger.len(),
                    trigger_len: trigger.len(),
                    deferred: false,
                    rule: rule_index,
                }
            } else if let Some(offset) = find_partial(buffer, trigger, ci) {
                Candidate {
                    offset,
                    len: buffer.len() - offset,
                    trigger_len: trigger.len(),
                    deferred: true,
                    rule: rule_index,
                }
            } else {
                continue;
            };
            if best.is_none_or(|b| candidate.beats(&b)) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// First full occurrence of `trigger` in `buffer`.
fn find(buffer: &str, trigger: &str, case_insensitive: bool) -> Option<usize> {
    if trigger.is_empty() || trigger.len() > buffer.len() {
        return None;
    }
    if !case_insensitive {
        return buffer.find(trigger);
    }
    // Locate candidate positions by first byte, then verify the slice.
    // ASCII letters match either case; everything else matches exactly.
    let first = trigger.as_bytes()[0];
    let haystack = buffer.as_bytes();
    let verify = |pos: usize| {
        buffer
            .get(pos..pos + trigger.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(trigger))
    };
    if first.is_ascii_alphabetic() {
        memchr2_iter(first.to_ascii_lowercase(), first.to_ascii_uppercase(), haystack)
            .find(|&pos| verify(pos))
    } else {
        memchr_iter(first, haystack).find(|&pos| verify(pos))
    }
}

/// Smallest offset whose suffix is a nonempty proper prefix of `trigger`,
/// i.e. a trigger occurrence cut off by the end of the buffer.
fn find_partial(buffer: &str, trigger: &str, case_insensitive: bool) -> Option<usize> {
    for (pos, _) in buffer.char_indices() {
        let suffix = &buffer[pos..];
        if suffix.len() >= trigger.len() {
            continue;
        }
        let matches = match trigger.get(..suffix.len()) {
            Some(prefix) if case_insensitive => prefix.eq_ignore_ascii_case(suffix),
            Some(prefix) => prefix == suffix,
            None => false,
        };
        if matches {
            return Some(pos);
        }
    }
    None
}

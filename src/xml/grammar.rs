//! The XML state table.
//!
//! One flat grammar drives the whole lexical layer. States host literal
//! triggers; longest-match deferral is what lets `<`, `</`, `<!`, `<!--`
//! and `<?xml` coexist in the same state. Almost every rule suppresses its
//! match text, so the builder mostly sees pre-text tokens: tag names,
//! attribute names, quoted values, entity names, free text. The notable
//! exceptions are `/>` (the emitted match is the self-close signal) and the
//! newline self-transitions (the emitted match is the soft-break signal).
//!
//! Quote states are pushed, not entered, so a closing quote returns to
//! wherever the value started (`="1"` and `= "1"` both work). The entity
//! state is pushed for the same reason: its pop rule fires with the pushing
//! state still visible as `MatchContext::previous`, which is what the
//! builder's entity resolution keys on.

use crate::engine::{MatchContext, Rule, RuleOptions, State, TokenKind};
use crate::error::Result;

use super::builder::TreeBuilder;

pub(crate) const SIGNATURE: &str = "Signature";
pub(crate) const TAG: &str = "Tag";
pub(crate) const TAG_NAME: &str = "TagName";
pub(crate) const ATTRIBUTE: &str = "Attribute";
pub(crate) const ATTRIBUTE_VALUE: &str = "AttributeValue";
pub(crate) const CLOSE_TAG: &str = "CloseTag";
pub(crate) const ENTITY: &str = "Entity";
pub(crate) const QUOTE: &str = "Quote";
pub(crate) const DOUBLE_QUOTE: &str = "DoubleQuote";
pub(crate) const COMMENT: &str = "Comment";
pub(crate) const DOCUMENT_TAG: &str = "DocumentTag";
pub(crate) const DOCUMENT_TYPE: &str = "DocumentType";
pub(crate) const DOCUMENT_ENTITY: &str = "DocumentEntity";
pub(crate) const DOCUMENT_ELEMENT: &str = "DocumentElement";
pub(crate) const DOCUMENT_ATTLIST: &str = "DocumentAttlist";

/// Single whitespace code points, matched one at a time.
const WHITESPACE: &[&str] = &[" ", "\t", "\n", "\r"];

/// Newline forms; the two-character CRLF form wins over its halves by
/// trigger length.
const NEWLINES: &[&str] = &["\r\n", "\n", "\r"];

/// Build the XML grammar table. Register with [`SIGNATURE`] as the initial
/// state; a template built once can initialize any number of parsers.
pub(crate) fn table() -> Vec<State<TreeBuilder>> {
    vec![
        // Document prologue: like Tag, plus the declaration opener.
        State::new(SIGNATURE)
            .with_rule(
                Rule::to(&["<?xml"], ATTRIBUTE).with_options(
                    RuleOptions::CASE_INSENSITIVE
                        | RuleOptions::SUPPRESS_PRE
                        | RuleOptions::SUPPRESS_MATCH,
                ),
            )
            .with_rule(
                Rule::to(&["<!--"], COMMENT)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(Rule::to(&["<!"], DOCUMENT_TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(&["</"], CLOSE_TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(&["<"], TAG_NAME).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(
                Rule::to(&["&"], ENTITY)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(
                Rule::to(NEWLINES, SIGNATURE)
                    .with_options(RuleOptions::SUPPRESS_MATCH_IF_NO_PRE),
            ),
        // Between markup: free text, comments, entities, tag openers.
        State::new(TAG)
            .with_rule(
                Rule::to(&["<!--"], COMMENT)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(Rule::to(&["<!"], DOCUMENT_TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(&["</"], CLOSE_TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(&["<"], TAG_NAME).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(
                Rule::to(&["&"], ENTITY)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(
                Rule::to(NEWLINES, TAG).with_options(RuleOptions::SUPPRESS_MATCH_IF_NO_PRE),
            ),
        // Open-tag name; pre-text is the element name.
        State::new(TAG_NAME)
            .with_rule(Rule::to(&["/>"], TAG))
            .with_rule(Rule::to(&[">"], TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(WHITESPACE, ATTRIBUTE).with_options(RuleOptions::SUPPRESS_MATCH)),
        // Attribute names; quotes are reachable here so `name = "v"` works.
        State::new(ATTRIBUTE)
            .with_rule(Rule::to(&["="], ATTRIBUTE_VALUE).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(
                Rule::to(&["\""], DOUBLE_QUOTE)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(
                Rule::to(&["'"], QUOTE)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(Rule::to(&["/>"], TAG))
            .with_rule(Rule::to(&["?>"], TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(&[">"], TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(WHITESPACE, ATTRIBUTE).with_options(RuleOptions::SUPPRESS_MATCH)),
        // After `=`; pre-text is an unquoted value.
        State::new(ATTRIBUTE_VALUE)
            .with_rule(
                Rule::to(&["\""], DOUBLE_QUOTE)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(
                Rule::to(&["'"], QUOTE)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            )
            .with_rule(Rule::to(&["/>"], TAG))
            .with_rule(Rule::to(&["?>"], TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(&[">"], TAG).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(Rule::to(WHITESPACE, ATTRIBUTE).with_options(RuleOptions::SUPPRESS_MATCH)),
        // Close-tag name; pre-text must match the open element.
        State::new(CLOSE_TAG)
            .with_rule(Rule::to(&[">"], TAG).with_options(RuleOptions::SUPPRESS_MATCH)),
        // Entity reference body, pushed from text or quoted values.
        State::new(ENTITY)
            .with_rule(Rule::pop(&[";"]).with_options(RuleOptions::SUPPRESS_MATCH)),
        // Quoted values return to whoever pushed them.
        State::new(QUOTE)
            .with_rule(Rule::pop(&["'"]).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(
                Rule::to(&["&"], ENTITY)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            ),
        State::new(DOUBLE_QUOTE)
            .with_rule(Rule::pop(&["\""]).with_options(RuleOptions::SUPPRESS_MATCH))
            .with_rule(
                Rule::to(&["&"], ENTITY)
                    .with_options(RuleOptions::PUSH | RuleOptions::SUPPRESS_MATCH),
            ),
        // Comments disappear entirely.
        State::new(COMMENT).with_rule(
            Rule::pop(&["-->"])
                .with_options(RuleOptions::SUPPRESS_PRE | RuleOptions::SUPPRESS_MATCH),
        ),
        // `<!` dispatch on the declaration keyword.
        State::new(DOCUMENT_TAG)
            .with_rule(
                Rule::to(&["DOCTYPE"], DOCUMENT_TYPE).with_options(
                    RuleOptions::CASE_INSENSITIVE
                        | RuleOptions::SUPPRESS_PRE
                        | RuleOptions::SUPPRESS_MATCH,
                ),
            )
            .with_rule(
                Rule::to(&["ENTITY"], DOCUMENT_ENTITY).with_options(
                    RuleOptions::CASE_INSENSITIVE
                        | RuleOptions::SUPPRESS_PRE
                        | RuleOptions::SUPPRESS_MATCH,
                ),
            )
            .with_rule(
                Rule::to(&["ELEMENT"], DOCUMENT_ELEMENT).with_options(
                    RuleOptions::CASE_INSENSITIVE
                        | RuleOptions::SUPPRESS_PRE
                        | RuleOptions::SUPPRESS_MATCH,
                ),
            )
            .with_rule(
                Rule::to(&["ATTLIST"], DOCUMENT_ATTLIST).with_options(
                    RuleOptions::CASE_INSENSITIVE
                        | RuleOptions::SUPPRESS_PRE
                        | RuleOptions::SUPPRESS_MATCH,
                ),
            )
            .with_rule(
                Rule::to(&[">"], TAG)
                    .with_options(RuleOptions::SUPPRESS_PRE | RuleOptions::SUPPRESS_MATCH),
            ),
        // DOCTYPE body runs to the first `>`, captured raw; internal
        // subsets are not bracket-matched.
        State::new(DOCUMENT_TYPE).with_rule(
            Rule::to(&[">"], TAG)
                .with_options(RuleOptions::SUPPRESS_MATCH)
                .with_callback(capture_doctype),
        ),
        // Recognized but semantically inert declarations.
        State::new(DOCUMENT_ENTITY).with_rule(
            Rule::to(&[">"], TAG)
                .with_options(RuleOptions::SUPPRESS_PRE | RuleOptions::SUPPRESS_MATCH),
        ),
        State::new(DOCUMENT_ELEMENT).with_rule(
            Rule::to(&[">"], TAG)
                .with_options(RuleOptions::SUPPRESS_PRE | RuleOptions::SUPPRESS_MATCH),
        ),
        State::new(DOCUMENT_ATTLIST).with_rule(
            Rule::to(&[">"], TAG)
                .with_options(RuleOptions::SUPPRESS_PRE | RuleOptions::SUPPRESS_MATCH),
        ),
    ]
}

/// Per-rule hook on the DOCTYPE terminator: the pre-text is the raw body.
fn capture_doctype(
    builder: &mut TreeBuilder,
    _ctx: &MatchContext<'_>,
    kind: TokenKind,
    text: &str,
) -> Result<()> {
    if kind == TokenKind::Pre {
        builder.record_doctype(text);
    }
    Ok(())
}

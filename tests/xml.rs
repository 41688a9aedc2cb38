//! End-to-end XML parsing through the public API.
//!
//! Organized by surface, from whole-buffer parsing to streamed chunks.
//! Each test feeds real bytes and checks the assembled document.

use pretty_assertions::assert_eq;

use statelex::{parse, parse_with_encoding, ByteOrder, Document, Error, NodeId, XmlParser};

// =============================================================================
// Test Helpers
// =============================================================================

fn root_of(doc: &Document) -> NodeId {
    doc.root().expect("document has a root")
}

fn name_of(doc: &Document, id: NodeId) -> &str {
    doc.node(id).expect("node exists").name()
}

fn value_of(doc: &Document, id: NodeId) -> &str {
    doc.node(id).expect("node exists").value()
}

/// Encode text as UTF-16 with a byte order mark.
fn utf16_bytes(text: &str, le: bool) -> Vec<u8> {
    let mut bytes = if le { vec![0xFF, 0xFE] } else { vec![0xFE, 0xFF] };
    for unit in text.encode_utf16() {
        let pair = if le { unit.to_le_bytes() } else { unit.to_be_bytes() };
        bytes.extend_from_slice(&pair);
    }
    bytes
}

/// Visitor collecting (name, depth) pairs in visit order.
struct Names(Vec<(String, usize)>);

impl statelex::Visitor for Names {
    fn node(&mut self, doc: &Document, id: NodeId, depth: usize) -> statelex::Result<()> {
        self.0.push((name_of(doc, id).to_string(), depth));
        Ok(())
    }
}

// =============================================================================
// Whole-Buffer Parsing
// =============================================================================

#[test]
fn parses_nested_elements_with_attributes() {
    let doc = parse(br#"<note id="7"><to>Tove</to><from>Jani</from></note>"#).unwrap();
    let root = root_of(&doc);
    assert_eq!(name_of(&doc, root), "note");
    assert_eq!(doc.node(root).unwrap().attribute("id"), Some("7"));

    let names: Vec<_> = doc
        .children(root)
        .map(|id| name_of(&doc, id).to_string())
        .collect();
    assert_eq!(names, vec!["to", "from"]);

    let to = doc.children(root).next().unwrap();
    assert_eq!(value_of(&doc, to), "Tove");
}

#[test]
fn resolves_entities_in_text_and_attributes() {
    let doc = parse(br#"<m q="a&quot;b">x &amp; y &#169;</m>"#).unwrap();
    let root = root_of(&doc);
    assert_eq!(doc.node(root).unwrap().attribute("q"), Some("a\"b"));
    assert_eq!(value_of(&doc, root), "x & y ©");
}

#[test]
fn comments_and_doctype_do_not_reach_the_tree() {
    let doc = parse(b"<!DOCTYPE note SYSTEM \"note.dtd\"><!-- draft --><note/>").unwrap();
    assert_eq!(doc.node_count(), 1);
    assert_eq!(name_of(&doc, root_of(&doc)), "note");
    assert_eq!(doc.doctype(), Some(" note SYSTEM \"note.dtd\""));
}

#[test]
fn declaration_attributes_land_on_the_document() {
    let doc = parse(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a/>"#).unwrap();
    assert_eq!(doc.attribute("version"), Some("1.0"));
    assert_eq!(doc.encoding(), Some("UTF-8"));
    assert_eq!(doc.attribute("standalone"), Some("yes"));
    assert_eq!(doc.attributes().len(), 3);
}

#[test]
fn newlines_collapse_to_single_spaces() {
    let doc = parse(b"<p>first\nsecond\r\n\nthird</p>").unwrap();
    assert_eq!(value_of(&doc, root_of(&doc)), "first second third");
}

#[test]
fn serializes_back_to_markup() {
    let doc = parse(br#"<a b="1">t<c/></a>"#).unwrap();
    assert_eq!(doc.to_xml(), r#"<a b="1">t<c/></a>"#);

    let doc = parse(br#"<?xml version="1.0"?><!DOCTYPE a><a/>"#).unwrap();
    assert_eq!(doc.to_xml(), r#"<?xml version="1.0"?><!DOCTYPE a><a/>"#);
}

// =============================================================================
// Malformed Input
// =============================================================================

#[test]
fn second_root_is_rejected_with_a_diagnostic() {
    let mut parser = XmlParser::new().unwrap();
    let outcome = parser.parse(b"<a/><b/>", None);
    assert!(matches!(outcome, Err(Error::NotReady(_))));

    let recorded = parser.diagnostics().as_slice();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].message.starts_with("unexpected termination"));
}

#[test]
fn mismatched_close_tag_is_rejected_with_a_diagnostic() {
    let mut parser = XmlParser::new().unwrap();
    let outcome = parser.parse(b"<a><b></a></a>", None);
    assert!(matches!(outcome, Err(Error::NotFound(_))));

    let recorded = parser.diagnostics().as_slice();
    assert!(recorded[0].message.starts_with("unexpected token"));
    assert!(recorded[0].message.contains("close tag"));
}

#[test]
fn stray_close_tag_is_rejected() {
    assert!(matches!(parse(b"</a>"), Err(Error::NotFound(_))));
}

#[test]
fn partial_documents_still_expose_what_was_built() {
    let mut parser = XmlParser::new().unwrap();
    assert!(parser.parse(b"<a><b></c>", None).is_err());
    let doc = parser.document();
    assert_eq!(name_of(doc, root_of(doc)), "a");
}

// =============================================================================
// Encodings
// =============================================================================

#[test]
fn utf16_little_endian_with_bom() {
    let bytes = utf16_bytes(r#"<a b="1"><c/></a>"#, true);
    let doc = parse(&bytes).unwrap();
    let root = root_of(&doc);
    assert_eq!(doc.node(root).unwrap().attribute("b"), Some("1"));
    assert_eq!(doc.byte_order(), Some(ByteOrder::LittleEndian));
}

#[test]
fn utf16_big_endian_with_bom() {
    let bytes = utf16_bytes("<a>\u{1D11E}</a>", false);
    let doc = parse(&bytes).unwrap();
    assert_eq!(value_of(&doc, root_of(&doc)), "\u{1D11E}");
    assert_eq!(doc.byte_order(), Some(ByteOrder::BigEndian));
}

#[test]
fn declared_latin1_maps_high_bytes() {
    let doc = parse_with_encoding(b"<a v=\"caf\xE9\"/>", Some("iso-8859-1")).unwrap();
    assert_eq!(doc.node(root_of(&doc)).unwrap().attribute("v"), Some("café"));
}

#[test]
fn byte_order_stays_unset_for_byte_encodings() {
    let doc = parse(b"<a/>").unwrap();
    assert_eq!(doc.byte_order(), None);
}

#[test]
fn unknown_declared_encoding_fails_up_front() {
    assert!(matches!(
        parse_with_encoding(b"<a/>", Some("shift-jis")),
        Err(Error::Unsupported(_))
    ));
}

// =============================================================================
// Streamed Chunks
// =============================================================================

#[test]
fn any_chunk_split_builds_the_same_document() {
    let bytes: &[u8] = br#"<?xml version="1.0"?><a b="1&amp;2">t<c d='4'/></a>"#;
    let whole = parse(bytes).unwrap().to_xml();

    for cut in 0..=bytes.len() {
        let mut parser = XmlParser::new().unwrap();
        parser.start(None).unwrap();
        parser.feed(&bytes[..cut]).unwrap();
        parser.feed(&bytes[cut..]).unwrap();
        parser.finish().unwrap();
        assert_eq!(parser.into_document().to_xml(), whole, "split at {cut}");
    }
}

#[test]
fn utf16_stream_feeds_in_unit_sized_chunks() {
    let bytes = utf16_bytes("<a><b/></a>", true);
    let mut parser = XmlParser::new().unwrap();
    parser.start(None).unwrap();
    for pair in bytes.chunks(2) {
        parser.feed(pair).unwrap();
    }
    parser.finish().unwrap();

    let doc = parser.into_document();
    assert_eq!(doc.children(root_of(&doc)).count(), 1);
    assert_eq!(doc.byte_order(), Some(ByteOrder::LittleEndian));
}

#[test]
fn odd_utf16_chunk_reports_buffer_size() {
    let mut parser = XmlParser::new().unwrap();
    parser.start(Some("utf-16le")).unwrap();
    assert!(matches!(
        parser.feed(&[b'<', 0x00, b'a']),
        Err(Error::BadBufferSize(_))
    ));
}

#[test]
fn stream_lifecycle_is_enforced() {
    let mut parser = XmlParser::new().unwrap();
    // no stream open yet
    assert!(matches!(parser.feed(b"<a/>"), Err(Error::NotReady(_))));
    assert!(matches!(parser.finish(), Err(Error::NotReady(_))));

    parser.start(None).unwrap();
    // a second start would lose the open stream
    assert!(matches!(parser.start(None), Err(Error::InvalidArgument(_))));

    parser.feed(b"<a/>").unwrap();
    parser.finish().unwrap();
    assert!(parser.document().root().is_some());
}

#[test]
fn text_pending_at_finish_is_never_emitted() {
    let mut parser = XmlParser::new().unwrap();
    parser.start(None).unwrap();
    parser.feed(b"<a>dangling").unwrap();
    parser.finish().unwrap();
    // "dangling" never saw a trigger, so it never reached the tree
    assert_eq!(value_of(parser.document(), root_of(parser.document())), "");
}

// =============================================================================
// Tree Traversal
// =============================================================================

#[test]
fn visit_walks_the_tree_in_document_order() {
    let doc = parse(b"<a><b><c/></b><d/></a>").unwrap();

    let mut deep = Names(Vec::new());
    doc.visit(&mut deep, true).unwrap();
    assert_eq!(
        deep.0,
        vec![
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("c".to_string(), 2),
            ("d".to_string(), 1),
        ]
    );

    let mut shallow = Names(Vec::new());
    doc.visit(&mut shallow, false).unwrap();
    assert_eq!(
        shallow.0,
        vec![
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("d".to_string(), 1),
        ]
    );
}

#[test]
fn repeated_visits_yield_the_same_sequence() {
    let doc = parse(b"<a><b><c/></b><d/></a>").unwrap();

    let mut runs = Vec::new();
    for _ in 0..3 {
        let mut names = Names(Vec::new());
        doc.visit(&mut names, true).unwrap();
        runs.push(names.0);
    }
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[test]
fn descendants_match_recursive_visit() {
    let doc = parse(b"<a><b><c/></b><d/></a>").unwrap();
    let names: Vec<_> = doc
        .descendants(root_of(&doc))
        .map(|id| name_of(&doc, id).to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
}

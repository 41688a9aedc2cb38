//! Encoding Detection and Code-Point Decoding
//!
//! Normalizes byte buffers into Unicode scalar values for the engine:
//! - UTF-16 LE/BE with surrogate-pair combination
//! - UTF-8, tolerant of legacy long-form leads up to 6 bytes
//! - Latin-1 and 7-bit ASCII (high bit cleared)
//!
//! Detection uses byte order marks plus a small set of 4-byte patterns for
//! BOM-less UTF-16; without any hint the decoder falls back to 7-bit ASCII.
//! Malformed units (unpaired surrogates, truncated or out-of-range UTF-8
//! sequences) are dropped non-fatally and decoding continues.

use tracing::debug;

use crate::error::{Error, Result};

/// A resolved or declared text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Latin1,
    Utf8,
    /// UTF-16 with the byte order still undecided (declared as plain
    /// "utf-16"); a byte order mark picks the order, little-endian otherwise.
    Utf16,
    Utf16Le,
    Utf16Be,
}

/// Byte order of a resolved UTF-16 stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl Encoding {
    /// Parse a declared encoding label (ASCII case-insensitive).
    pub fn from_label(label: &str) -> Option<Encoding> {
        let l = label.trim();
        if l.eq_ignore_ascii_case("utf-8") || l.eq_ignore_ascii_case("utf8") {
            Some(Encoding::Utf8)
        } else if l.eq_ignore_ascii_case("utf-16") || l.eq_ignore_ascii_case("utf16") {
            Some(Encoding::Utf16)
        } else if l.eq_ignore_ascii_case("utf-16le") || l.eq_ignore_ascii_case("utf16le") {
            Some(Encoding::Utf16Le)
        } else if l.eq_ignore_ascii_case("utf-16be") || l.eq_ignore_ascii_case("utf16be") {
            Some(Encoding::Utf16Be)
        } else if l.eq_ignore_ascii_case("ascii") || l.eq_ignore_ascii_case("us-ascii") {
            Some(Encoding::Ascii)
        } else if l.eq_ignore_ascii_case("latin-1")
            || l.eq_ignore_ascii_case("latin1")
            || l.eq_ignore_ascii_case("iso-8859-1")
        {
            Some(Encoding::Latin1)
        } else {
            None
        }
    }

    /// Detect an undeclared encoding from a byte order mark or initial bytes.
    pub fn detect(input: &[u8]) -> Encoding {
        if input.len() >= 2 {
            match (input[0], input[1]) {
                // UTF-16 LE BOM: 0xFF 0xFE
                (0xFF, 0xFE) => return Encoding::Utf16Le,
                // UTF-16 BE BOM: 0xFE 0xFF
                (0xFE, 0xFF) => return Encoding::Utf16Be,
                // UTF-8 BOM: 0xEF 0xBB 0xBF
                (0xEF, 0xBB) if input.len() >= 3 && input[2] == 0xBF => return Encoding::Utf8,
                _ => {}
            }
        }
        // BOM-less UTF-16: markup or whitespace interleaved with NUL bytes
        if input.len() >= 4 {
            let m = |b: u8| matches!(b, b'<' | b'?' | b'\t' | b'\n' | b'\r' | b' ');
            if input[0] == 0 && input[2] == 0 && m(input[1]) && m(input[3]) {
                return Encoding::Utf16Be;
            }
            if m(input[0]) && m(input[2]) && input[1] == 0 && input[3] == 0 {
                return Encoding::Utf16Le;
            }
        }
        Encoding::Ascii
    }

    /// The code-unit size in bytes.
    #[inline]
    pub fn unit_size(&self) -> usize {
        match self {
            Encoding::Utf16 | Encoding::Utf16Le | Encoding::Utf16Be => 2,
            _ => 1,
        }
    }

    /// The byte order of a resolved UTF-16 encoding, `None` otherwise.
    #[inline]
    pub fn byte_order(&self) -> Option<ByteOrder> {
        match self {
            Encoding::Utf16Le => Some(ByteOrder::LittleEndian),
            Encoding::Utf16Be => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }
}

/// Streaming byte-to-scalar decoder for one buffer stream.
///
/// Created per stream with an optional declared label; resolves the actual
/// encoding on the first chunk (consuming a leading BOM) and carries split
/// code units across chunk boundaries: a trailing UTF-16 high surrogate waits
/// for its low half, a split UTF-8 sequence waits for its continuations.
#[derive(Debug)]
pub struct Decoder {
    declared: Option<Encoding>,
    resolved: Option<Encoding>,
    /// UTF-16 high surrogate seen at the end of the previous chunk.
    pending_high: Option<u16>,
    /// Accumulated scalar value of an in-flight UTF-8 sequence.
    utf8_acc: u32,
    /// Continuation bytes still expected for the in-flight UTF-8 sequence.
    utf8_need: usize,
}

impl Decoder {
    /// Create a decoder; fails `Unsupported` on an unrecognized label.
    pub fn new(label: Option<&str>) -> Result<Decoder> {
        let declared = match label {
            Some(l) => Some(
                Encoding::from_label(l)
                    .ok_or_else(|| Error::Unsupported(format!("encoding label `{l}`")))?,
            ),
            None => None,
        };
        Ok(Decoder {
            declared,
            resolved: None,
            pending_high: None,
            utf8_acc: 0,
            utf8_need: 0,
        })
    }

    /// The encoding in use, once the first chunk resolved it.
    #[inline]
    pub fn encoding(&self) -> Option<Encoding> {
        self.resolved
    }

    /// Decode one chunk into scalar values.
    ///
    /// UTF-16 chunks must be non-empty and even-sized (`BadBufferSize`
    /// otherwise). Malformed units are dropped, never fatal.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String> {
        let mut data = chunk;
        let encoding = match self.resolved {
            Some(e) => e,
            None => {
                let e = self.resolve(&mut data);
                self.resolved = Some(e);
                debug!(encoding = ?e, declared = self.declared.is_some(), "encoding resolved");
                e
            }
        };

        if encoding.unit_size() == 2 && (chunk.is_empty() || chunk.len() % 2 != 0) {
            return Err(Error::BadBufferSize(format!(
                "{} byte(s) for a 16-bit encoding",
                chunk.len()
            )));
        }

        let mut out = String::with_capacity(data.len());
        match encoding {
            Encoding::Ascii => out.extend(data.iter().map(|&b| (b & 0x7F) as char)),
            Encoding::Latin1 => out.extend(data.iter().map(|&b| b as char)),
            Encoding::Utf8 => self.decode_utf8(data, &mut out),
            Encoding::Utf16Le => self.decode_utf16(data, true, &mut out),
            Encoding::Utf16 | Encoding::Utf16Be => self.decode_utf16(data, false, &mut out),
        }
        Ok(out)
    }

    /// End the stream, discarding any pending partial unit.
    pub fn finish(&mut self) {
        self.pending_high = None;
        self.utf8_need = 0;
    }

    /// Resolve the stream encoding on the first chunk and strip a leading
    /// BOM belonging to it. Plain "utf-16" resolves its byte order here.
    fn resolve(&self, data: &mut &[u8]) -> Encoding {
        let declared = match self.declared {
            Some(e) => e,
            None => Encoding::detect(data),
        };
        let resolved = match declared {
            Encoding::Utf16 => match (data.first(), data.get(1)) {
                (Some(0xFF), Some(0xFE)) => Encoding::Utf16Le,
                (Some(0xFE), Some(0xFF)) => Encoding::Utf16Be,
                _ => Encoding::Utf16Le,
            },
            e => e,
        };
        let bom: &[u8] = match resolved {
            Encoding::Utf16Le => &[0xFF, 0xFE],
            Encoding::Utf16Be => &[0xFE, 0xFF],
            Encoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            _ => &[],
        };
        if !bom.is_empty() && data.starts_with(bom) {
            *data = &data[bom.len()..];
        }
        resolved
    }

    fn decode_utf16(&mut self, data: &[u8], le: bool, out: &mut String) {
        let mut units: Vec<u16> = Vec::with_capacity(data.len() / 2 + 1);
        if let Some(high) = self.pending_high.take() {
            units.push(high);
        }
        units.extend(data.chunks_exact(2).map(|pair| {
            if le {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        }));
        // A trailing high surrogate may pair with the next chunk's first unit.
        if let Some(&last) = units.last() {
            if (0xD800..=0xDBFF).contains(&last) {
                self.pending_high = Some(last);
                units.pop();
            }
        }
        // decode_utf16 combines surrogate pairs and reports unpaired
        // surrogates per unit; those units are dropped and decoding continues.
        for result in char::decode_utf16(units) {
            if let Ok(ch) = result {
                out.push(ch);
            }
        }
    }

    fn decode_utf8(&mut self, data: &[u8], out: &mut String) {
        let mut i = 0;
        while i < data.len() {
            let b = data[i];
            if self.utf8_need > 0 {
                if b & 0xC0 == 0x80 {
                    self.utf8_acc = (self.utf8_acc << 6) | (b as u32 & 0x3F);
                    self.utf8_need -= 1;
                    if self.utf8_need == 0 {
                        // Legacy 5/6-byte forms and surrogate values land
                        // outside the scalar range and are dropped here.
                        if let Some(ch) = char::from_u32(self.utf8_acc) {
                            out.push(ch);
                        }
                    }
                    i += 1;
                } else {
                    // Premature termination: drop the partial sequence and
                    // reprocess this byte as a fresh lead.
                    self.utf8_need = 0;
                }
            } else {
                match utf8_sequence_len(b) {
                    0 => {} // stray continuation or 0xFE/0xFF lead: dropped
                    1 => out.push(b as char),
                    n => {
                        self.utf8_acc = (b & (0x7F >> n)) as u32;
                        self.utf8_need = n - 1;
                    }
                }
                i += 1;
            }
        }
    }
}

/// Total sequence length announced by a UTF-8 lead byte, accepting the
/// legacy 5- and 6-byte long forms; 0 for a byte that cannot lead.
#[inline]
fn utf8_sequence_len(b: u8) -> usize {
    match b {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        0xF8..=0xFB => 5,
        0xFC..=0xFD => 6,
        _ => 0,
    }
}

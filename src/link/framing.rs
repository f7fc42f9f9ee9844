//! Streaming frame reassembly for the link byte streams.
//!
//! A UART read returns whatever bytes happen to be in the FIFO — part of
//! a tag, several messages concatenated, or nothing. The reassembler
//! accumulates raw chunks per link and yields complete [`TaggedBlock`]s,
//! keeping any trailing partial message buffered for the next call.
//!
//! Two framing modes:
//!
//! - **Tagged** (compute link): messages delimited by literal open/close
//!   tag pairs. Extraction is greedy: whichever kind's close tag
//!   completes earliest in the accumulator is extracted first, which is
//!   exactly the order a byte-at-a-time stream forces — so classification
//!   is deterministic and invariant under re-chunking. Bytes before an
//!   opening tag are treated as line noise and discarded when a block is
//!   extracted; a stray close tag with no preceding open is consumed the
//!   same way. Tags on this wire never nest — the earliest-open/
//!   earliest-close pairing is intentional.
//! - **Lines** (sensor link): messages delimited by `\n`; the element
//!   after the last terminator stays buffered.
//!
//! Decoding is permissive (invalid UTF-8 is replaced, never an error)
//! and whitespace-only bodies yield no block.

use log::warn;

use super::{
    CMD_RESPONSE_CLOSE, CMD_RESPONSE_OPEN, LinkId, METRICS_CLOSE, METRICS_OPEN, TagKind,
    TaggedBlock,
};

/// Accumulator cap. A stream that exceeds this without producing a
/// complete block is flushed down to a small tail (protects against
/// memory exhaustion from a peer stuck mid-tag or emitting pure noise).
const MAX_ACCUMULATOR: usize = 16 * 1024;

/// Bytes retained after an overflow flush — long enough to hold any
/// partially-received tag marker.
const OVERFLOW_TAIL: usize = 16;

/// Recognised tag pairs, in deterministic iteration order.
const TAG_TABLE: [(TagKind, &str, &str); 2] = [
    (TagKind::Metrics, METRICS_OPEN, METRICS_CLOSE),
    (TagKind::CommandResponse, CMD_RESPONSE_OPEN, CMD_RESPONSE_CLOSE),
];

/// Framing discipline of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Open/close tag pairs (compute link).
    Tagged,
    /// Newline-terminated lines (sensor link).
    Lines,
}

/// Per-link streaming reassembler.
///
/// Owns the accumulator buffer for exactly one link; never shared
/// between tasks. `feed` may be called with arbitrarily-sized chunks,
/// including empty ones and chunks that split a tag marker — the emitted
/// block sequence is invariant under re-chunking.
pub struct FrameReassembler {
    source: LinkId,
    mode: FramingMode,
    buf: Vec<u8>,
}

impl FrameReassembler {
    pub fn new(source: LinkId, mode: FramingMode) -> Self {
        Self {
            source,
            mode,
            buf: Vec::new(),
        }
    }

    /// Reassembler for the tag-delimited compute link.
    pub fn tagged(source: LinkId) -> Self {
        Self::new(source, FramingMode::Tagged)
    }

    /// Reassembler for the line-delimited sensor link.
    pub fn lines(source: LinkId) -> Self {
        Self::new(source, FramingMode::Lines)
    }

    /// Append a raw chunk and extract every complete block it unlocks.
    ///
    /// Returns zero or more blocks in wire order. Leftover partial bytes
    /// stay buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<TaggedBlock> {
        self.buf.extend_from_slice(chunk);

        let blocks = match self.mode {
            FramingMode::Tagged => self.extract_tagged(),
            FramingMode::Lines => self.extract_lines(),
        };

        if self.buf.len() > MAX_ACCUMULATOR {
            warn!(
                "link[{}]: accumulator overflow ({} bytes, no complete block) — flushing",
                self.source,
                self.buf.len()
            );
            let tail_start = self.buf.len() - OVERFLOW_TAIL;
            self.buf.drain(..tail_start);
        }

        blocks
    }

    /// Discard any buffered partial message (device reset).
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes currently buffered (trailing partial message, if any).
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    // ── Tagged mode ───────────────────────────────────────────

    fn extract_tagged(&mut self) -> Vec<TaggedBlock> {
        let mut out = Vec::new();
        loop {
            // Among all kinds with a complete pair, take the one whose
            // close tag ends earliest (the greedy online order).
            let mut best: Option<(TagKind, String, usize)> = None;
            for (kind, open, close) in TAG_TABLE {
                if let Some((body, consumed)) = find_tag_pair(&self.buf, open, close) {
                    if best.as_ref().is_none_or(|(_, _, c)| consumed < *c) {
                        best = Some((kind, body, consumed));
                    }
                }
            }
            let Some((kind, body, consumed)) = best else {
                break;
            };
            self.buf.drain(..consumed);
            if !body.trim().is_empty() {
                out.push(TaggedBlock {
                    source: self.source,
                    kind,
                    body,
                });
            }
        }
        out
    }

    // ── Line mode ─────────────────────────────────────────────

    fn extract_lines(&mut self) -> Vec<TaggedBlock> {
        let mut out = Vec::new();
        while let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=nl).collect();
            let text = String::from_utf8_lossy(&line[..nl]);
            let text = text.trim();
            if !text.is_empty() {
                out.push(TaggedBlock {
                    source: self.source,
                    kind: TagKind::Line,
                    body: text.to_string(),
                });
            }
        }
        out
    }
}

/// Locate the first complete `open…close` span in `buf`.
///
/// Returns the decoded body (markers stripped) and the number of bytes
/// consumed — everything up to and including the close tag, so noise
/// before the opening tag is discarded with the block.
fn find_tag_pair(buf: &[u8], open: &str, close: &str) -> Option<(String, usize)> {
    let start = find_subslice(buf, open.as_bytes())?;
    let body_start = start + open.len();
    let close_rel = find_subslice(&buf[body_start..], close.as_bytes())?;
    let body_end = body_start + close_rel;
    let consumed = body_end + close.len();

    let body = String::from_utf8_lossy(&buf[body_start..body_end]).into_owned();
    Some((body, consumed))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::wrap_tagged;

    fn compute() -> FrameReassembler {
        FrameReassembler::tagged(LinkId::Compute)
    }

    fn sensor() -> FrameReassembler {
        FrameReassembler::lines(LinkId::Sensor)
    }

    #[test]
    fn whole_block_in_one_chunk() {
        let mut r = compute();
        let blocks = r.feed(b"<RPI_METRICS>CPU: 50%</RPI_METRICS>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, TagKind::Metrics);
        assert_eq!(blocks[0].body, "CPU: 50%");
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn tag_split_across_two_feeds_emits_once() {
        let mut r = compute();
        assert!(r.feed(b"<RPI_METRICS>half</RPI_MET").is_empty());
        let blocks = r.feed(b"RICS>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "half");
    }

    #[test]
    fn two_consecutive_blocks_in_order() {
        let mut r = compute();
        let blocks = r.feed(b"<RPI_METRICS>A</RPI_METRICS><RPI_METRICS>B</RPI_METRICS>");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, "A");
        assert_eq!(blocks[1].body, "B");
    }

    #[test]
    fn one_byte_at_a_time_matches_single_feed() {
        let wire = format!(
            "noise{}{}garbage",
            wrap_tagged(TagKind::Metrics, "M1"),
            wrap_tagged(TagKind::CommandResponse, "R1"),
        );

        let mut whole = compute();
        let expected = whole.feed(wire.as_bytes());

        let mut dribble = compute();
        let mut got = Vec::new();
        for b in wire.as_bytes() {
            got.extend(dribble.feed(core::slice::from_ref(b)));
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn noise_before_open_tag_is_discarded() {
        let mut r = compute();
        let blocks = r.feed(b"\xff\xfejunk<RPI_METRICS>ok</RPI_METRICS>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "ok");
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn stray_close_tag_consumed_as_noise() {
        let mut r = compute();
        let blocks = r.feed(b"</RPI_METRICS><RPI_METRICS>real</RPI_METRICS>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "real");
    }

    #[test]
    fn empty_body_yields_no_block() {
        let mut r = compute();
        assert!(r.feed(b"<RPI_METRICS>  \n </RPI_METRICS>").is_empty());
    }

    #[test]
    fn empty_chunk_is_harmless() {
        let mut r = compute();
        assert!(r.feed(b"").is_empty());
        assert!(r.feed(b"<RPI_METRICS>x").is_empty());
        assert!(r.feed(b"").is_empty());
        assert_eq!(r.feed(b"</RPI_METRICS>").len(), 1);
    }

    #[test]
    fn interleaved_kinds_emitted_in_wire_order() {
        let mut r = compute();
        let wire = format!(
            "{}{}",
            wrap_tagged(TagKind::Metrics, "M"),
            wrap_tagged(TagKind::CommandResponse, "R"),
        );
        let blocks = r.feed(wire.as_bytes());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, TagKind::Metrics);
        assert_eq!(blocks[1].kind, TagKind::CommandResponse);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let mut r = compute();
        let blocks = r.feed(b"<RPI_METRICS>ok\xff\xfeend</RPI_METRICS>");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].body.starts_with("ok"));
        assert!(blocks[0].body.ends_with("end"));
    }

    #[test]
    fn lines_split_and_keep_partial() {
        let mut r = sensor();
        let blocks = r.feed(b"Temp: 21\nBatt: 90\npart");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, "Temp: 21");
        assert_eq!(blocks[1].body, "Batt: 90");
        assert_eq!(r.pending(), 4);

        let blocks = r.feed(b"ial\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "partial");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut r = sensor();
        let blocks = r.feed(b"\n  \r\nreal line\r\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "real line");
    }

    #[test]
    fn overflow_flushes_but_recovers() {
        let mut r = compute();
        let noise = vec![b'x'; MAX_ACCUMULATOR + 100];
        assert!(r.feed(&noise).is_empty());
        assert!(r.pending() <= OVERFLOW_TAIL);

        let blocks = r.feed(b"<RPI_METRICS>alive</RPI_METRICS>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "alive");
    }

    #[test]
    fn reset_discards_partial() {
        let mut r = compute();
        r.feed(b"<RPI_METRICS>half");
        r.reset();
        assert_eq!(r.pending(), 0);
        assert!(r.feed(b"</RPI_METRICS>").is_empty());
    }
}

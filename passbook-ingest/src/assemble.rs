//! Block assembly: groups the classified line stream into transaction blocks.

use passbook_core::{RawLine, TransactionBlock};
use tracing::warn;

use crate::classify::{ClassifyContext, LineClassifier, LineKind, NoiseKind};

/// Number every line of every page, in document order.
pub fn raw_lines(pages: &[String]) -> impl Iterator<Item = RawLine> + '_ {
    pages.iter().enumerate().flat_map(|(page, text)| {
        text.lines()
            .enumerate()
            .map(move |(line, s)| RawLine::new(page, line, s))
    })
}

/// Lazily yields blocks in document order.
///
/// A block closes on the next start line, a terminator, a page boundary, or end of input.
/// Continuation lines with no open block are dropped with a warning.
pub struct BlockAssembler<'a, I> {
    classifier: &'a LineClassifier,
    lines: I,
    open: Option<TransactionBlock>,
    pending: Option<RawLine>,
    discarded: usize,
}

impl<'a, I> BlockAssembler<'a, I>
where
    I: Iterator<Item = RawLine>,
{
    pub fn new(classifier: &'a LineClassifier, lines: I) -> Self {
        Self {
            classifier,
            lines,
            open: None,
            pending: None,
            discarded: 0,
        }
    }

    /// Orphan continuation lines dropped so far.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl<I> Iterator for BlockAssembler<'_, I>
where
    I: Iterator<Item = RawLine>,
{
    type Item = TransactionBlock;

    fn next(&mut self) -> Option<TransactionBlock> {
        loop {
            let Some(line) = self.pending.take().or_else(|| self.lines.next()) else {
                return self.open.take();
            };

            if self.open.as_ref().is_some_and(|b| b.page != line.page) {
                self.pending = Some(line);
                return self.open.take();
            }

            let ctx = ClassifyContext {
                block_open: self.open.is_some(),
            };
            match self.classifier.classify(&line.text, ctx) {
                LineKind::Start { .. } => {
                    if let Some(done) = self.open.replace(TransactionBlock::new(line)) {
                        return Some(done);
                    }
                }
                LineKind::Continuation => match self.open.as_mut() {
                    Some(block) => block.push(line),
                    None => {
                        warn!(
                            page = line.page,
                            line = line.line,
                            text = %line.text.trim(),
                            "discarding continuation line outside any block"
                        );
                        self.discarded += 1;
                    }
                },
                LineKind::Noise(NoiseKind::Terminator) => {
                    if let Some(done) = self.open.take() {
                        return Some(done);
                    }
                }
                LineKind::Noise(_) => {}
            }
        }
    }
}

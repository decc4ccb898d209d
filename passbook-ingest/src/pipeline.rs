//! Per-document pipeline: page text in, validated transactions and rejections out.
//!
//! Pages are processed strictly in order; each call to `parse` owns its own balance cursor,
//! split-strategy state and occurrence counts, so documents can be parsed in parallel.

use passbook_core::{
    Checkpoint, Malformed, ParsedFields, ParsedStatement, ParserConfig, Phase, Rejection,
    TransactionBlock,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::assemble::{BlockAssembler, raw_lines};
use crate::builder::{CheckpointOutcome, TransactionBuilder};
use crate::classify::LineClassifier;
use crate::error::IngestError;
use crate::extract::FieldExtractor;
use crate::sign::SignResolver;
use crate::split::strategy_for;

enum Extracted {
    Checkpoint(Checkpoint),
    Fields(ParsedFields),
    /// With the block's printed balance, when one could still be read.
    Rejected(Malformed, Option<Decimal>),
}

pub struct StatementParser {
    config: ParserConfig,
    classifier: LineClassifier,
}

impl StatementParser {
    /// Compiles the configured patterns; a bad pattern fails here, not mid-document.
    pub fn new(config: ParserConfig) -> Result<Self, IngestError> {
        let classifier = LineClassifier::new(&config)?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one document. Malformed blocks become rejections; this never fails as a whole.
    pub fn parse(&self, account: &str, pages: &[String]) -> ParsedStatement {
        let mut phase = Phase::Init;
        debug!(%account, pages = pages.len(), %phase, "statement parse");

        let mut extractor = FieldExtractor::new(
            &self.config,
            self.classifier.dates().clone(),
            strategy_for(&self.config.split),
        );
        for (page, text) in pages.iter().enumerate() {
            extractor.observe_page(page, text);
        }

        phase = advance(phase, Phase::Parsing);
        let mut assembler = BlockAssembler::new(&self.classifier, raw_lines(pages));
        let extracted: Vec<(TransactionBlock, Extracted)> = assembler
            .by_ref()
            .map(|block| {
                let outcome = match extractor.balance_checkpoint(&block) {
                    Some(cp) => Extracted::Checkpoint(cp),
                    None => match extractor.extract(&block) {
                        Ok(fields) => Extracted::Fields(fields),
                        Err(malformed) => {
                            Extracted::Rejected(malformed, extractor.printed_balance(&block))
                        }
                    },
                };
                (block, outcome)
            })
            .collect();

        let mut statement = ParsedStatement::new(account);
        statement.discarded_lines = assembler.discarded();

        phase = advance(phase, Phase::Building);
        let resolver = SignResolver::new(self.config.tolerance);
        let mut builder = TransactionBuilder::new(account, &self.config);

        for (block, outcome) in extracted {
            match outcome {
                Extracted::Checkpoint(cp) => match builder.checkpoint(cp) {
                    CheckpointOutcome::Seeded => {
                        debug!(page = block.page, balance = %cp.balance, "opening balance");
                        statement.opening.get_or_insert(cp);
                    }
                    CheckpointOutcome::Matched => {}
                    CheckpointOutcome::Mismatch { expected } => warn!(
                        page = block.page,
                        lines = %block.line_range(),
                        %expected,
                        printed = %cp.balance,
                        "balance checkpoint disagrees with running balance; resyncing"
                    ),
                },
                Extracted::Fields(fields) => {
                    let built = resolver
                        .resolve(&fields, builder.previous_balance())
                        .and_then(|signed| builder.build(&fields, signed));
                    match built {
                        Ok(txn) => statement.transactions.push(txn),
                        Err(malformed) => {
                            builder.resync(fields.balance);
                            reject(&mut statement, &block, malformed);
                        }
                    }
                }
                Extracted::Rejected(malformed, balance) => {
                    if let Some(balance) = balance {
                        builder.resync(balance);
                    }
                    reject(&mut statement, &block, malformed);
                }
            }
        }

        advance(phase, Phase::Done);
        info!(
            %account,
            accepted = statement.transactions.len(),
            rejected = statement.rejections.len(),
            discarded_lines = statement.discarded_lines,
            "statement parsed"
        );
        statement
    }
}

fn advance(from: Phase, to: Phase) -> Phase {
    debug!(%from, %to, "phase");
    to
}

fn reject(statement: &mut ParsedStatement, block: &TransactionBlock, malformed: Malformed) {
    let rejection = Rejection::new(block, malformed);
    warn!(
        page = rejection.page,
        lines = %rejection.lines,
        reason = %rejection.reason,
        detail = %rejection.detail,
        "block rejected"
    );
    statement.rejections.push(rejection);
}

use super::{
    parse_payload, Correction, CorrectionOutcome, ItemRejection, OffsetUnit, Outcome,
    PayloadSource, ReconcileError, ReconcileReport, ReconcilerConfig,
};
use crate::anchor::AnchoredText;
use crate::edit::{EditError, TextEdit};
use std::ops::Range;
use tracing::{debug, info};

/// A correction whose anchor and offsets resolved to an absolute byte range
/// in the anchored text, and whose `original` was found there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub index: usize,
    pub correction: Correction,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Parse a raw model payload and reconcile every item in it.
    ///
    /// Only a payload that cannot be read as an array at all is an error;
    /// items that fail individually are reported in the outcome list.
    pub fn reconcile_payload(
        &self,
        anchored: &AnchoredText,
        raw: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        let parsed = parse_payload(raw)?;
        debug!(source = ?parsed.source, items = parsed.items.len(), "parsed correction payload");

        let slots = parsed
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.map_err(|rejection| rejected(index, rejection)))
            .collect();
        Ok(self.run(anchored, slots, Some(parsed.source)))
    }

    /// Apply already-parsed corrections as one pass.
    pub fn reconcile(
        &self,
        anchored: &AnchoredText,
        corrections: &[Correction],
    ) -> ReconcileReport {
        let slots = corrections.iter().cloned().map(Ok).collect();
        self.run(anchored, slots, None)
    }

    /// Resolve and validate without applying anything.
    pub fn resolve(
        &self,
        anchored: &AnchoredText,
        corrections: &[Correction],
    ) -> Vec<Result<Resolved, CorrectionOutcome>> {
        corrections
            .iter()
            .enumerate()
            .map(|(index, correction)| self.resolve_one(anchored, index, correction.clone()))
            .collect()
    }

    fn resolve_one(
        &self,
        anchored: &AnchoredText,
        index: usize,
        correction: Correction,
    ) -> Result<Resolved, CorrectionOutcome> {
        let text = anchored.as_str();
        let fail = |outcome: Outcome| CorrectionOutcome {
            index,
            anchor: Some(correction.anchor.to_string()),
            outcome,
        };

        let Some(paragraph) = anchored.map().paragraph_range(correction.anchor) else {
            return Err(fail(Outcome::AnchorNotFound {
                anchor: correction.anchor.to_string(),
            }));
        };

        let content = &text[paragraph.clone()];
        let local = match (
            self.local_offset(content, correction.start_offset),
            self.local_offset(content, correction.end_offset),
        ) {
            (Some(start), Some(end)) if start <= end => start..end,
            _ => {
                return Err(fail(Outcome::OffsetOutOfRange {
                    start: correction.start_offset as i64,
                    end: correction.end_offset as i64,
                }))
            }
        };

        let range = paragraph.start + local.start..paragraph.start + local.end;
        let found = &text[range.clone()];
        if found != correction.original {
            return Err(fail(Outcome::ValidationMismatch {
                expected: correction.original.clone(),
                found: found.to_string(),
            }));
        }

        Ok(Resolved {
            index,
            correction,
            range,
        })
    }

    /// Byte offset of a local offset inside the paragraph content, or `None`
    /// if it lies past the content or splits a character.
    fn local_offset(&self, content: &str, offset: usize) -> Option<usize> {
        match self.config.offset_unit {
            OffsetUnit::Bytes => (offset <= content.len() && content.is_char_boundary(offset))
                .then_some(offset),
            OffsetUnit::Chars => content
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(content.len()))
                .nth(offset),
        }
    }

    fn run(
        &self,
        anchored: &AnchoredText,
        slots: Vec<Result<Correction, CorrectionOutcome>>,
        source: Option<PayloadSource>,
    ) -> ReconcileReport {
        let mut outcomes: Vec<Option<CorrectionOutcome>> = vec![None; slots.len()];
        let mut ready = Vec::new();

        for (index, slot) in slots.into_iter().enumerate() {
            let resolved =
                slot.and_then(|correction| self.resolve_one(anchored, index, correction));
            match resolved {
                Ok(resolved) if resolved.correction.original == resolved.correction.suggested => {
                    outcomes[index] = Some(CorrectionOutcome {
                        index,
                        anchor: Some(resolved.correction.anchor.to_string()),
                        outcome: Outcome::NoChange,
                    });
                }
                Ok(resolved) => ready.push(resolved),
                Err(failed) => outcomes[index] = Some(failed),
            }
        }

        ready.sort_by_key(|resolved| (resolved.range.start, resolved.index));

        let mut text = anchored.as_str().to_string();
        let mut delta: isize = 0;
        // (absolute end, input index) of the last applied correction
        let mut previous: Option<(usize, usize)> = None;

        for resolved in ready {
            let Resolved {
                index,
                correction,
                range,
            } = resolved;

            // Comparing absolute positions is equivalent to comparing the
            // delta-adjusted start with the previous insertion's end.
            let outcome = match previous {
                Some((previous_end, conflicts_with)) if range.start < previous_end => {
                    Outcome::ConflictingRange { conflicts_with }
                }
                _ => {
                    let edit = TextEdit::new(
                        range.start.saturating_add_signed(delta),
                        range.end.saturating_add_signed(delta),
                        correction.suggested.as_str(),
                        correction.original.as_str(),
                    );
                    match edit.apply_to(&mut text) {
                        Ok(applied) => {
                            delta += applied.delta;
                            previous = Some((range.end, index));
                            Outcome::Applied {
                                start: applied.range.start,
                                end: applied.range.end,
                            }
                        }
                        Err(EditError::BeforeTextMismatch { found, .. }) => {
                            Outcome::ValidationMismatch {
                                expected: correction.original.clone(),
                                found,
                            }
                        }
                        Err(_) => Outcome::OffsetOutOfRange {
                            start: correction.start_offset as i64,
                            end: correction.end_offset as i64,
                        },
                    }
                }
            };

            outcomes[index] = Some(CorrectionOutcome {
                index,
                anchor: Some(correction.anchor.to_string()),
                outcome,
            });
        }

        let outcomes: Vec<CorrectionOutcome> = outcomes.into_iter().flatten().collect();
        for item in &outcomes {
            debug!(
                index = item.index,
                anchor = item.anchor.as_deref().unwrap_or("-"),
                outcome = item.outcome.label(),
                "correction outcome"
            );
        }

        let report = ReconcileReport {
            text,
            outcomes,
            source,
        };
        info!(
            total = report.outcomes.len(),
            applied = report.applied_count(),
            failed = report.failed_count(),
            "reconciled correction batch"
        );
        report
    }
}

fn rejected(index: usize, rejection: ItemRejection) -> CorrectionOutcome {
    let anchor = match &rejection {
        ItemRejection::UnknownAnchor { anchor } => Some(anchor.clone()),
        _ => None,
    };
    CorrectionOutcome {
        index,
        anchor,
        outcome: rejection.into(),
    }
}

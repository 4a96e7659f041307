use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::hash::{hash_document, StateHash};
use super::history::{FragmentLog, FragmentOutcome, FragmentRecord};
use super::interpreter::{FragmentInterpreter, InterpretError, StateContext};
use crate::config::{ReconcilerConfig, ValidationPolicy};
use crate::history::{validate, HandHistory, HandSettings, ValidationReport, Violation};
use crate::patch::{apply_patch, PatchError, PatchOperation};
use crate::replay::locate_earliest_change;

const LOG_TARGET: &str = "voice_hand_history::reconcile::reconciler";

/// Why a batch of operations was not committed.
#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageError {
    #[error("operation {index} failed: {error}")]
    Patch { index: usize, error: PatchError },
    #[error("patched document does not fit the hand shape: {message}")]
    Shape { message: String },
    #[error("patched document breaks {} invariant(s)", violations.len())]
    Invalid { violations: Vec<Violation> },
}

/// A batch that passed staging, with whatever validation had to say.
#[derive(Clone, Debug)]
pub struct Staged {
    pub document: HandHistory,
    pub report: ValidationReport,
}

/// Applies `operations` to a copy of `committed` and checks the result.
/// `committed` is never touched; a failure anywhere discards the copy.
pub fn stage(
    committed: &HandHistory,
    operations: &[PatchOperation],
    policy: ValidationPolicy,
) -> Result<Staged, StageError> {
    let value = serde_json::to_value(committed).map_err(|err| StageError::Shape {
        message: err.to_string(),
    })?;
    let patched = apply_patch(&value, operations)
        .into_result()
        .map_err(|(index, error)| StageError::Patch { index, error })?;
    let document: HandHistory =
        serde_json::from_value(patched).map_err(|err| StageError::Shape {
            message: err.to_string(),
        })?;

    let report = validate(&document);
    if policy == ValidationPolicy::Strict && report.has_errors() {
        return Err(StageError::Invalid {
            violations: report.errors().cloned().collect(),
        });
    }
    Ok(Staged { document, report })
}

/// Owns the committed document and the fragment log, and feeds fragments to
/// the interpreter one at a time. Both are replaced together at the end of a
/// step, so readers never see one without the other.
pub struct Reconciler {
    settings: HandSettings,
    document: HandHistory,
    hash: StateHash,
    log: FragmentLog,
    interpreter: Arc<dyn FragmentInterpreter>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        interpreter: Arc<dyn FragmentInterpreter>,
        settings: HandSettings,
        config: ReconcilerConfig,
    ) -> Self {
        let document = HandHistory::new(settings.clone());
        Self {
            hash: hash_document(&document),
            settings,
            document,
            log: FragmentLog::new(),
            interpreter,
            config,
        }
    }

    /// Starts from an existing document instead of a fresh one. A reset
    /// still goes back to a fresh hand built from the settings.
    pub fn with_document(mut self, document: HandHistory) -> Self {
        self.hash = hash_document(&document);
        self.document = document;
        self
    }

    pub fn document(&self) -> &HandHistory {
        &self.document
    }

    pub fn hash(&self) -> StateHash {
        self.hash
    }

    pub fn log(&self) -> &FragmentLog {
        &self.log
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn interpreter_name(&self) -> &str {
        self.interpreter.name()
    }

    /// Drops the hand and its fragment history.
    pub fn reset(&mut self) {
        self.document = HandHistory::new(self.settings.clone());
        self.hash = hash_document(&self.document);
        self.log = FragmentLog::new();
        info!(target: LOG_TARGET, hash = %self.hash.short(), "hand reset");
    }

    /// Runs one fragment through the interpreter and, if it yields a valid
    /// batch, commits it. The fragment lands in the log whatever happens.
    #[instrument(
        skip(self, fragment),
        level = "debug",
        target = LOG_TARGET,
        fields(sequence = self.log.next_sequence())
    )]
    pub async fn process(&mut self, fragment: impl Into<String>) -> FragmentRecord {
        let fragment = fragment.into();
        let sequence = self.log.next_sequence();
        let received_at = Utc::now();

        let outcome = match self.interpret(&fragment).await {
            Err(reason) => {
                warn!(
                    target: LOG_TARGET,
                    sequence,
                    %fragment,
                    error = %reason,
                    "interpreter failed; fragment kept without changes"
                );
                FragmentOutcome::InterpretFailed { reason }
            }
            Ok(operations) if operations.is_empty() => {
                debug!(target: LOG_TARGET, sequence, %fragment, "no operations for fragment");
                FragmentOutcome::NoOp
            }
            Ok(operations) => self.commit(sequence, &fragment, operations),
        };

        let record = FragmentRecord {
            sequence,
            fragment,
            received_at,
            outcome,
        };
        self.log.append(record.clone());
        record
    }

    /// Processes fragments in order, as a batch runner would.
    pub async fn process_all<I, S>(&mut self, fragments: I) -> Vec<FragmentRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut records = Vec::new();
        for fragment in fragments {
            records.push(self.process(fragment).await);
        }
        records
    }

    async fn interpret(&self, fragment: &str) -> Result<Vec<PatchOperation>, InterpretError> {
        let prior = self.log.fragments();
        let context = StateContext::from_hand(&self.document);
        let limit = self.config.interpreter_timeout;

        match timeout(limit, self.interpreter.interpret(fragment, &prior, &context)).await {
            Ok(result) => result,
            Err(_) => Err(InterpretError::Timeout(timeout_millis(limit))),
        }
    }

    fn commit(
        &mut self,
        sequence: u64,
        fragment: &str,
        operations: Vec<PatchOperation>,
    ) -> FragmentOutcome {
        let staged = match stage(&self.document, &operations, self.config.validation) {
            Ok(staged) => staged,
            Err(error) => {
                warn!(
                    target: LOG_TARGET,
                    sequence,
                    %fragment,
                    operations = operations.len(),
                    error = %error,
                    "batch rejected; committed hand unchanged"
                );
                return FragmentOutcome::Rejected { operations, error };
            }
        };

        for violation in &staged.report.violations {
            warn!(
                target: LOG_TARGET,
                sequence,
                severity = ?violation.severity(),
                %violation,
                "committed hand has a validation finding"
            );
        }

        let change = locate_earliest_change(&staged.document, &operations);
        self.document = staged.document;
        self.hash = hash_document(&self.document);
        info!(
            target: LOG_TARGET,
            sequence,
            operations = operations.len(),
            hash = %self.hash.short(),
            change = ?change,
            "batch committed"
        );

        FragmentOutcome::Committed {
            operations,
            state_hash: self.hash,
            change,
        }
    }
}

fn timeout_millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

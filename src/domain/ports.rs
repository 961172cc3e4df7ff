use crate::utils::error::Result;
use async_trait::async_trait;

/// The four-stage lifecycle every county parser implements.
///
/// The stages run parse -> validate -> save -> clean; `save` assumes
/// `validate` succeeded, and ordering beyond that is caller discipline
/// (see `ParserEngine` for the canonical driver).
#[async_trait]
pub trait Parser: Send {
    /// Source-specific input shape (file path, tagged path variants, ...).
    type Input: Send;
    /// What one parse call yields: a single record or a batch of rows.
    type Output: Send + Sync;

    /// Extract records from the input. Unrecognized paths or formats fail
    /// with a data-format error.
    async fn parse(&mut self, input: Self::Input) -> Result<Self::Output>;

    /// Check required fields, then per-field rules. The first failing rule
    /// produces a validation error naming the field; rules are not
    /// aggregated.
    async fn validate(&self, output: &Self::Output) -> Result<()>;

    /// Persist inside a transaction scope: commit on success, roll back
    /// and surface a database error on any failure.
    async fn save(&mut self, output: &Self::Output) -> Result<()>;

    /// Release any in-memory buffers or session handles. Idempotent; safe
    /// with nothing allocated.
    fn clean(&mut self);
}

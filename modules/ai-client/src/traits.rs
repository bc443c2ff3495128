use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// LabelClassifier Trait
// =============================================================================

/// Assigns exactly one label from a closed vocabulary to a piece of text.
///
/// Implementations return `Err` for transport failures and for answers that
/// are not in `labels`. They never retry and never enforce a deadline.
#[async_trait]
pub trait LabelClassifier: Send + Sync {
    async fn classify(&self, instructions: &str, text: &str, labels: &[&str]) -> Result<String>;
}

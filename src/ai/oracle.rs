//! The categorization oracle seam.
//!
//! The sorter only knows this trait. `OpenRouterClient` is the production
//! implementation; tests plug in scripted ones.

use async_trait::async_trait;
use serde::Serialize;

use crate::classifier::StructureSummary;
use crate::error::Result;

/// Everything the oracle is told about one sort
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    /// Top-level file names to place
    pub files: Vec<String>,
    /// Top-level folder names to place (already-categorized ones excluded)
    pub folders: Vec<String>,
    /// Existing folder structure, for context
    pub structure: StructureSummary,
    pub use_web_search: bool,
}

/// Proposes a categorization as free text.
///
/// The text is expected, but not trusted, to hold a `{files, folders}` JSON
/// object. A returned error means "no plan available".
#[async_trait]
pub trait CategorizationOracle: Send + Sync {
    async fn categorize(&self, api_key: &str, request: &OracleRequest) -> Result<String>;
}

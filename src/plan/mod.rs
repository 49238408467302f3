//! Categorization plan: the typed document and the salvage parser that
//! recovers it from unreliable oracle text.

pub mod document;
pub mod repair;
pub mod salvage;
pub mod scan;

pub use document::{CategorizationDocument, DuplicateItem, PlanEntry, PlanSection};
pub use salvage::{salvage_plan, SalvageReport, SalvageStage, StageText};

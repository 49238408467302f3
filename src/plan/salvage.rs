//! Staged recovery of a categorization plan from raw oracle text.
//!
//! Stages run in order and stop at the first success:
//! 1. targeted extraction of the plan object
//! 2. generic first-brace-to-last-brace extraction
//! 3. direct parse (both keys required)
//! 4. syntax repair and re-parse (one key is enough)
//! 5. reassembly from `"files"` / `"folders"` fragments of the original text
//! 6. an empty plan
//!
//! Nothing here fails: the worst case is an empty document.

use serde_json::Value;
use std::fmt;

use super::document::{CategorizationDocument, DuplicateItem, KeyRequirement};
use super::repair::repair_syntax;
use super::scan::{find_keyed_object, find_plan_object, first_to_last_brace};

/// Pipeline stage that produced (or was attempted for) a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalvageStage {
    RawResponse,
    Extracted,
    DirectParse,
    Repaired,
    Reassembled,
    EmptyFallback,
}

impl SalvageStage {
    /// Label used for diagnostic file names
    pub fn label(&self) -> &'static str {
        match self {
            SalvageStage::RawResponse => "raw_llm_response",
            SalvageStage::Extracted => "extracted_json",
            SalvageStage::DirectParse => "parsed_json",
            SalvageStage::Repaired => "fixed_json",
            SalvageStage::Reassembled => "manual_json",
            SalvageStage::EmptyFallback => "empty_json",
        }
    }
}

impl fmt::Display for SalvageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Intermediate text retained for diagnostics
#[derive(Debug, Clone)]
pub struct StageText {
    pub stage: SalvageStage,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SalvageReport {
    pub document: CategorizationDocument,
    /// Stage whose output became `document`
    pub stage: SalvageStage,
    pub trace: Vec<StageText>,
    pub duplicates: Vec<DuplicateItem>,
}

impl SalvageReport {
    pub fn recovered(&self) -> bool {
        self.stage != SalvageStage::EmptyFallback
    }
}

/// Recover a plan from `raw`, never failing.
pub fn salvage_plan(raw: &str) -> SalvageReport {
    let mut trace = vec![StageText {
        stage: SalvageStage::RawResponse,
        text: raw.to_string(),
    }];

    let (document, stage) = run_stages(raw, &mut trace);

    let duplicates = document.find_duplicates();
    for duplicate in &duplicates {
        tracing::warn!(
            section = %duplicate.section,
            item = %duplicate.item,
            first = %duplicate.first_destination,
            ignored = %duplicate.duplicate_destination,
            "Item listed under more than one destination, keeping the first"
        );
    }

    tracing::info!(
        stage = %stage,
        destinations = document.files.len() + document.folders.len(),
        items = document.item_count(),
        "Plan salvaged"
    );

    SalvageReport {
        document,
        stage,
        trace,
        duplicates,
    }
}

fn run_stages(raw: &str, trace: &mut Vec<StageText>) -> (CategorizationDocument, SalvageStage) {
    if let Some(extracted) = extract_candidate(raw) {
        trace.push(StageText {
            stage: SalvageStage::Extracted,
            text: extracted.to_string(),
        });

        if let Some(document) = parse_direct(extracted) {
            return (document, SalvageStage::DirectParse);
        }

        let repaired = repair_syntax(extracted);
        trace.push(StageText {
            stage: SalvageStage::Repaired,
            text: repaired.clone(),
        });
        if let Some(document) = parse_repaired(&repaired) {
            return (document, SalvageStage::Repaired);
        }
    } else {
        tracing::debug!("No brace-delimited object in oracle text");
    }

    if let Some(stitched) = stitch_fragments(raw) {
        trace.push(StageText {
            stage: SalvageStage::Reassembled,
            text: stitched.clone(),
        });
        if let Some(document) = parse_reassembled(&stitched) {
            return (document, SalvageStage::Reassembled);
        }
    }

    tracing::warn!("Oracle text was unrecoverable, using an empty plan");
    let document = CategorizationDocument::empty();
    trace.push(StageText {
        stage: SalvageStage::EmptyFallback,
        text: document.to_value().to_string(),
    });
    (document, SalvageStage::EmptyFallback)
}

/// Stages 1 and 2.
pub fn extract_candidate(text: &str) -> Option<&str> {
    find_plan_object(text).or_else(|| first_to_last_brace(text))
}

/// Stage 3: strict parse requiring both keys.
pub fn parse_direct(text: &str) -> Option<CategorizationDocument> {
    parse_with(text, KeyRequirement::Both)
}

/// Stage 4 parse: one key suffices, the other defaults to empty.
pub fn parse_repaired(text: &str) -> Option<CategorizationDocument> {
    parse_with(text, KeyRequirement::AtLeastOne)
}

fn parse_with(text: &str, requirement: KeyRequirement) -> Option<CategorizationDocument> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Plan text is not valid JSON");
            return None;
        }
    };
    match CategorizationDocument::from_value(&value, requirement) {
        Ok(document) => Some(document),
        Err(e) => {
            tracing::debug!(error = %e, "Plan JSON has the wrong shape");
            None
        }
    }
}

/// Stage 5: build `{"files": ..., "folders": ...}` from whichever keyed
/// objects appear in the original text.
pub fn stitch_fragments(raw: &str) -> Option<String> {
    let files = find_keyed_object(raw, "files");
    let folders = find_keyed_object(raw, "folders");
    if files.is_none() && folders.is_none() {
        return None;
    }

    Some(format!(
        "{{\n\"files\": {},\n\"folders\": {}\n}}",
        files.unwrap_or("{}"),
        folders.unwrap_or("{}")
    ))
}

/// Parse the stitched text, repairing it if the fragments themselves are sloppy.
fn parse_reassembled(stitched: &str) -> Option<CategorizationDocument> {
    parse_direct(stitched).or_else(|| parse_direct(&repair_syntax(stitched)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"files": {"Documents/Work": ["report.docx"], "Games/Skyrim/Mods": ["skyrim_mod.zip"]}, "folders": {"Games/Minecraft": ["Minecraft_Server"]}}"#;

    #[test]
    fn test_valid_json_is_returned_unchanged() {
        let report = salvage_plan(VALID);

        assert_eq!(report.stage, SalvageStage::DirectParse);
        let original: Value = serde_json::from_str(VALID).unwrap();
        assert_eq!(report.document.to_value(), original);
        assert_eq!(report.document.files[0].destination, "Documents/Work");
    }

    #[test]
    fn test_prose_wrapped_single_quotes_and_trailing_comma() {
        let raw = "Sure! Here is the plan you asked for:\n\
                   {'files': {'Documents': ['a.pdf', 'b.txt'],}, 'folders': {'Games': ['Minecraft']},}\n\
                   Let me know if you need anything else.";

        let report = salvage_plan(raw);

        assert_eq!(report.stage, SalvageStage::Repaired);
        assert_eq!(report.document.files[0].destination, "Documents");
        assert_eq!(report.document.files[0].items, vec!["a.pdf", "b.txt"]);
        assert_eq!(report.document.folders[0].items, vec!["Minecraft"]);
    }

    #[test]
    fn test_no_structure_yields_empty_document() {
        let report = salvage_plan("I'm sorry, I cannot help with that request.");

        assert_eq!(report.stage, SalvageStage::EmptyFallback);
        assert!(!report.recovered());
        assert!(report.document.is_empty());
        assert_eq!(report.trace.last().unwrap().stage, SalvageStage::EmptyFallback);
    }

    #[test]
    fn test_markdown_fenced_json() {
        let raw = format!("```json\n{}\n```", VALID);
        let report = salvage_plan(&raw);
        assert_eq!(report.stage, SalvageStage::DirectParse);
        assert_eq!(report.document.item_count(), 3);
    }

    #[test]
    fn test_one_key_after_repair_fills_the_other() {
        let raw = "{files: {'Music': ['song.mp3']}, note: 'only files'}";
        let report = salvage_plan(raw);

        assert_eq!(report.stage, SalvageStage::Repaired);
        assert_eq!(report.document.files[0].items, vec!["song.mp3"]);
        assert!(report.document.folders.is_empty());
    }

    #[test]
    fn test_truncated_text_reassembles_fragments() {
        // Output cut off mid-way through folders
        let raw = r#"{"files": {"Documents": ["a.pdf"]}, "folders": {"Games": ["Minecraft""#;

        let report = salvage_plan(raw);

        assert_eq!(report.stage, SalvageStage::Reassembled);
        assert_eq!(report.document.files[0].items, vec!["a.pdf"]);
        assert!(report.document.folders.is_empty());
    }

    #[test]
    fn test_duplicates_are_flagged_not_fatal() {
        let raw = r#"{"files": {"A": ["x.txt"], "B": ["x.txt"]}, "folders": {}}"#;
        let report = salvage_plan(raw);

        assert!(report.recovered());
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].first_destination, "A");
    }

    #[test]
    fn test_wrong_shape_falls_back_to_empty() {
        let raw = r#"{"files": ["a.txt"], "folders": "none"}"#;
        let report = salvage_plan(raw);
        assert_eq!(report.stage, SalvageStage::EmptyFallback);
        assert!(report.document.is_empty());
    }

    #[test]
    fn test_trace_keeps_intermediate_text() {
        let raw = "plan: {'files': {}, 'folders': {}}";
        let report = salvage_plan(raw);

        let stages: Vec<SalvageStage> = report.trace.iter().map(|t| t.stage).collect();
        assert_eq!(
            stages,
            vec![
                SalvageStage::RawResponse,
                SalvageStage::Extracted,
                SalvageStage::Repaired
            ]
        );
        assert_eq!(report.trace[0].text, raw);
    }

    #[test]
    fn test_stages_are_idempotent() {
        let extracted = extract_candidate(VALID).unwrap();
        assert_eq!(extract_candidate(extracted), Some(extracted));

        let once = repair_syntax("{'files': {},}");
        assert_eq!(repair_syntax(&once), once);
    }
}

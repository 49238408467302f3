//! Typed categorization plan.
//!
//! The oracle's JSON is treated as an untyped `serde_json::Value` until the
//! `files`/`folders` keys and their list-of-string shapes are confirmed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

pub const FILES_KEY: &str = "files";
pub const FOLDERS_KEY: &str = "folders";

/// One destination folder and the items planned for it, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub destination: String,
    pub items: Vec<String>,
}

/// Which item kind a plan section or duplicate refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSection {
    Files,
    Folders,
}

impl PlanSection {
    pub fn key(&self) -> &'static str {
        match self {
            PlanSection::Files => FILES_KEY,
            PlanSection::Folders => FOLDERS_KEY,
        }
    }
}

impl fmt::Display for PlanSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An item listed under more than one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateItem {
    pub section: PlanSection,
    pub item: String,
    pub first_destination: String,
    pub duplicate_destination: String,
}

/// Why an untyped value was not accepted as a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    NotAnObject,
    MissingKeys,
    SectionNotAnObject(PlanSection),
    ItemsNotAList { section: PlanSection, destination: String },
    ItemNotAString { section: PlanSection, destination: String },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::NotAnObject => write!(f, "top level is not an object"),
            ShapeError::MissingKeys => write!(f, "required keys are missing"),
            ShapeError::SectionNotAnObject(section) => {
                write!(f, "\"{}\" is not an object", section)
            }
            ShapeError::ItemsNotAList { section, destination } => {
                write!(f, "{}[\"{}\"] is not a list", section, destination)
            }
            ShapeError::ItemNotAString { section, destination } => {
                write!(f, "{}[\"{}\"] contains a non-string item", section, destination)
            }
        }
    }
}

/// How many of the two section keys must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRequirement {
    Both,
    AtLeastOne,
}

/// Validated categorization plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizationDocument {
    pub files: Vec<PlanEntry>,
    pub folders: Vec<PlanEntry>,
}

impl CategorizationDocument {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|e| e.items.is_empty())
            && self.folders.iter().all(|e| e.items.is_empty())
    }

    pub fn section(&self, section: PlanSection) -> &[PlanEntry] {
        match section {
            PlanSection::Files => &self.files,
            PlanSection::Folders => &self.folders,
        }
    }

    /// Total number of item slots in the plan (duplicates included)
    pub fn item_count(&self) -> usize {
        self.files
            .iter()
            .chain(self.folders.iter())
            .map(|e| e.items.len())
            .sum()
    }

    /// Convert an untyped JSON value, checking keys and shapes.
    ///
    /// A missing section (allowed by `AtLeastOne`) or a `null` one becomes empty.
    pub fn from_value(value: &Value, requirement: KeyRequirement) -> Result<Self, ShapeError> {
        let object = value.as_object().ok_or(ShapeError::NotAnObject)?;

        let has_files = object.contains_key(FILES_KEY);
        let has_folders = object.contains_key(FOLDERS_KEY);
        let keys_ok = match requirement {
            KeyRequirement::Both => has_files && has_folders,
            KeyRequirement::AtLeastOne => has_files || has_folders,
        };
        if !keys_ok {
            return Err(ShapeError::MissingKeys);
        }

        Ok(Self {
            files: parse_section(object.get(FILES_KEY), PlanSection::Files)?,
            folders: parse_section(object.get(FOLDERS_KEY), PlanSection::Folders)?,
        })
    }

    /// Render back to a JSON value (document order preserved)
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(FILES_KEY.to_string(), section_to_value(&self.files));
        root.insert(FOLDERS_KEY.to_string(), section_to_value(&self.folders));
        Value::Object(root)
    }

    /// Items listed under more than one destination within the same section.
    ///
    /// Only the first listing is honored during execution.
    pub fn find_duplicates(&self) -> Vec<DuplicateItem> {
        let mut duplicates = Vec::new();
        for section in [PlanSection::Files, PlanSection::Folders] {
            let mut first_seen: HashMap<&str, &str> = HashMap::new();
            for entry in self.section(section) {
                for item in &entry.items {
                    match first_seen.get(item.as_str()) {
                        Some(first) => duplicates.push(DuplicateItem {
                            section,
                            item: item.clone(),
                            first_destination: first.to_string(),
                            duplicate_destination: entry.destination.clone(),
                        }),
                        None => {
                            first_seen.insert(item, &entry.destination);
                        }
                    }
                }
            }
        }
        duplicates
    }
}

fn parse_section(value: Option<&Value>, section: PlanSection) -> Result<Vec<PlanEntry>, ShapeError> {
    let object = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(ShapeError::SectionNotAnObject(section)),
    };

    let mut entries = Vec::with_capacity(object.len());
    for (destination, items) in object {
        let list = items.as_array().ok_or_else(|| ShapeError::ItemsNotAList {
            section,
            destination: destination.clone(),
        })?;
        let items = list
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ShapeError::ItemNotAString {
                        section,
                        destination: destination.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.push(PlanEntry {
            destination: destination.clone(),
            items,
        });
    }
    Ok(entries)
}

fn section_to_value(entries: &[PlanEntry]) -> Value {
    let mut map = Map::new();
    for entry in entries {
        map.insert(
            entry.destination.clone(),
            Value::Array(entry.items.iter().cloned().map(Value::String).collect()),
        );
    }
    Value::Object(map)
}

use crate::ai::oracle::OracleRequest;
use crate::classifier::StructureSummary;

/// Sorting rules sent with every request
pub const SORTING_RULES: &str = r#"# SORTING RULES AND PRIORITIES

## Core Rules
1. Focus on file and folder NAMES, not just extensions: infer what each one likely contains
2. Build a logical hierarchy a person would find intuitive
3. Keep related content together (everything for one game goes together)
4. Keep the hierarchy balanced: at most 3 levels deep
5. Every file and folder MUST appear in your answer EXACTLY ONCE

## Games & Mods
- Game folders go into "Games/[Game Name]"
- Mods go under the game they belong to, e.g. "Games/Skyrim/Mods"
- Words like "mod", "addon", "patch", "texture", "skin", "dlc" usually mean a mod
- Save files go into "Games/[Game Name]/Saves"

## Archives
- Read archive names (.zip, .rar, .7z) for clues: "setup"/"install" means software,
  "mod"/"patch" means game content, version numbers usually mean software updates

## Torrents
- .torrent files go under "Torrents" by content: "Torrents/Games", "Torrents/Movies",
  "Torrents/TV Shows", "Torrents/Software", "Torrents/Music"

## Special Folders
- Development projects go into "Development/[Language or Framework]"
- Existing category folders (Documents, Pictures, Games, ...) are NOT to be moved
- Mixed-content folders are sorted by the majority of their likely content"#;

/// Response contract appended to every request
pub const RESPONSE_FORMAT: &str = r#"# RESPONSE FORMAT
Respond ONLY with a JSON object with two sections:
1. "files": maps destination paths to lists of files
2. "folders": maps destination paths to lists of folders

Example:
{
  "files": {
    "Games/Skyrim/Mods": ["skyrim_texture_pack.zip", "better_weapons.rar"],
    "Documents/Work": ["report.docx"],
    "Torrents/Games": ["doom.torrent"]
  },
  "folders": {
    "Games/Minecraft": ["Minecraft_Server"],
    "Development/Python": ["python_project"]
  }
}

Use forward slashes in paths, double quotes around keys and strings, and no trailing commas."#;

/// Hint added when the model can search the web
pub const WEB_SEARCH_HINT: &str = "You may search the web (for example nexusmods.com) to identify which game a mod belongs to.";

/// Render the existing-structure summary as `- path (sub1, sub2)` lines
pub fn format_structure(structure: &StructureSummary) -> String {
    if structure.is_empty() {
        return "No existing folders".to_string();
    }

    structure
        .iter()
        .map(|(path, subfolders)| {
            let children = if subfolders.is_empty() {
                "No subfolders".to_string()
            } else {
                subfolders.join(", ")
            };
            format!("- {} ({})", path, children)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user prompt for a categorization request
pub fn build_categorization_prompt(request: &OracleRequest) -> String {
    let files = if request.files.is_empty() {
        "No files to sort".to_string()
    } else {
        request.files.join(", ")
    };
    let folders = if request.folders.is_empty() {
        "No folders to sort".to_string()
    } else {
        request.folders.join(", ")
    };

    let mut prompt = format!(
        r#"You are a file organization expert. Create a logical folder hierarchy for the following files and folders.

# INPUT DATA
Files to categorize:
{}

Folders to categorize:
{}

Existing structure:
{}

{}
"#,
        files,
        folders,
        format_structure(&request.structure),
        SORTING_RULES
    );

    if request.use_web_search {
        prompt.push('\n');
        prompt.push_str(WEB_SEARCH_HINT);
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

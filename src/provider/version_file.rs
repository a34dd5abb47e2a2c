// ─── Version JSON ───
//
// Per-version metadata fetched from the manifest URL: client jar,
// libraries with OS rules, asset index pointer, and launch arguments.

use reqwest::Client;
use serde::Deserialize;

use crate::error::EngineResult;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    pub downloads: Option<DownloadsSection>,
    pub asset_index: Option<AssetIndexInfo>,
    pub assets: Option<String>,
    pub arguments: Option<ArgumentsSection>,
    /// Pre-1.13 versions carry a single space-separated argument string.
    pub minecraft_arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsSection {
    pub client: Option<ArtifactInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub sha1: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgumentsSection {
    #[serde(default)]
    pub game: Vec<ArgumentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentEntry {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<ArtifactInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactInfo {
    pub path: Option<String>,
    pub sha1: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: String,
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    pub name: Option<String>,
}

pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// Evaluate a rule list for the current OS. The last applicable rule
/// wins; an empty list allows.
fn rules_allow_current_os(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        let applies = match &rule.os {
            Some(os_rule) => os_rule
                .name
                .as_deref()
                .map(|name| name == current_os_name())
                .unwrap_or(true),
            None => true,
        };
        if applies {
            allowed = rule.action == "allow";
        }
    }
    allowed
}

impl LibraryEntry {
    pub fn is_allowed_for_current_os(&self) -> bool {
        rules_allow_current_os(&self.rules)
    }
}

impl VersionJson {
    /// Fetch a version JSON, returning the parsed form alongside the raw
    /// text so it can be stored byte-for-byte.
    pub async fn fetch(client: &Client, url: &str) -> EngineResult<(Self, String)> {
        let raw = client.get(url).send().await?.text().await?;
        let parsed: VersionJson = serde_json::from_str(&raw)?;
        Ok((parsed, raw))
    }

    /// Game arguments applicable to the current OS, in declaration
    /// order. Falls back to the legacy single-string form.
    pub fn game_args(&self) -> Vec<String> {
        if let Some(arguments) = &self.arguments {
            return extract_argument_values(&arguments.game);
        }

        self.minecraft_arguments
            .as_deref()
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn extract_argument_values(entries: &[ArgumentEntry]) -> Vec<String> {
    let mut values = Vec::new();
    for entry in entries {
        match entry {
            ArgumentEntry::Plain(value) => values.push(value.clone()),
            ArgumentEntry::Conditional { rules, value } => {
                if rules_allow_current_os(rules) {
                    match value {
                        ArgumentValue::Single(value) => values.push(value.clone()),
                        ArgumentValue::Many(many) => values.extend(many.iter().cloned()),
                    }
                }
            }
        }
    }
    values
}

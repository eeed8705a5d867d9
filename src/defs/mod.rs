//! Issue-definition dictionary.
//!
//! Scanner findings carry only a numeric type id; the human-readable name, description,
//! and remediation text live in a vendor knowledge base. The decoder itself is a pure
//! consumer of the [`DefinitionLookup`] trait injected at construction time - nothing in
//! this crate touches global state. Population happens here in the consumer layer: from a
//! JSON blob, from the knowledge-base entries inside a Burp Suite jar, or from the
//! dictionary bundled with the crate.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{Error::InvalidFile, Result};

/// Knowledge-base entries inside a Burp Suite jar live under this prefix.
const JAR_ISSUE_PREFIX: &str = "resources/KnowledgeBase/Issues/";

static EMBEDDED: OnceLock<DefinitionSet> = OnceLock::new();

/// A titled link attached to an issue definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReference {
    /// Link title
    #[serde(default)]
    pub title: String,
    /// Link target
    #[serde(default)]
    pub url: String,
}

/// One entry of the vendor issue knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueDefinition {
    /// Numeric issue type id, as stored in issue records
    pub type_index: u32,
    /// Display name
    pub name: String,
    /// Issue background text
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Remediation background text
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remediation: String,
    /// Short overview paragraph
    #[serde(skip_serializing_if = "String::is_empty")]
    pub web_intro: String,
    /// The severity the vendor typically assigns
    #[serde(skip_serializing_if = "String::is_empty")]
    pub typical_severity: String,
    /// Further-reading links
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<IssueReference>,
    /// CWE and similar classification links
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerability_classifications: Vec<IssueReference>,
}

/// Wrapper shape some knowledge-base exports use.
#[derive(Debug, Deserialize)]
struct DefinitionsExport {
    #[serde(default)]
    definitions: Vec<IssueDefinition>,
}

/// Resolves issue type ids to their definitions.
///
/// Implementations are injected into [`crate::ProjectReader`] at construction; the
/// decoder never resolves definitions any other way.
pub trait DefinitionLookup: Send + Sync {
    /// Returns the definition for the given type id, if known.
    fn lookup(&self, type_id: u32) -> Option<&IssueDefinition>;
}

/// A lookup that knows nothing; every type id resolves to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionLookup for NoDefinitions {
    fn lookup(&self, _type_id: u32) -> Option<&IssueDefinition> {
        None
    }
}

/// An owned id → definition mapping.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    defs: FxHashMap<u32, IssueDefinition>,
}

impl DefinitionSet {
    /// Builds a set from parsed definitions, dropping entries without id or name.
    #[must_use]
    pub fn from_definitions(definitions: Vec<IssueDefinition>) -> DefinitionSet {
        let mut defs = FxHashMap::default();
        for def in definitions {
            if def.type_index == 0 || def.name.is_empty() {
                continue;
            }
            defs.insert(def.type_index, def);
        }
        DefinitionSet { defs }
    }

    /// Parses a JSON blob holding either a definition array or an export object.
    ///
    /// # Errors
    /// Returns an error when the blob parses as neither shape or yields no usable
    /// definitions.
    pub fn from_json_slice(data: &[u8]) -> Result<DefinitionSet> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(InvalidFile("issue definitions JSON is empty".into()));
        }

        let definitions = match serde_json::from_slice::<Vec<IssueDefinition>>(data) {
            Ok(list) => list,
            Err(_) => serde_json::from_slice::<DefinitionsExport>(data)
                .map_err(|err| InvalidFile(format!("parse issue definitions JSON: {err}")))?
                .definitions,
        };

        let set = Self::from_definitions(definitions);
        if set.is_empty() {
            return Err(InvalidFile("no issue definitions found in JSON".into()));
        }
        Ok(set)
    }

    /// Loads the knowledge base out of a Burp Suite jar.
    ///
    /// Unparseable entries are skipped; only an archive without a single usable
    /// definition is an error.
    ///
    /// # Errors
    /// Returns an error when the jar cannot be opened or holds no definitions.
    pub fn from_jar(path: &Path) -> Result<DefinitionSet> {
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|err| InvalidFile(format!("open jar {}: {err}", path.display())))?;

        let mut definitions = Vec::new();
        for index in 0..archive.len() {
            let Ok(mut entry) = archive.by_index(index) else {
                continue;
            };
            if !entry.name().starts_with(JAR_ISSUE_PREFIX) || !entry.name().ends_with(".json") {
                continue;
            }

            let mut contents = String::new();
            if entry.read_to_string(&mut contents).is_err() {
                continue;
            }
            if let Ok(def) = serde_json::from_str::<IssueDefinition>(&contents) {
                definitions.push(def);
            }
        }

        let set = Self::from_definitions(definitions);
        if set.is_empty() {
            return Err(InvalidFile(format!(
                "no issue definitions found in jar: {}",
                path.display()
            )));
        }
        Ok(set)
    }

    /// The dictionary bundled with the crate.
    ///
    /// Parsed once per process; the blob ships inside the binary, so a parse failure is
    /// a build defect and degrades to an empty set with a warning rather than an error.
    pub fn embedded() -> &'static DefinitionSet {
        EMBEDDED.get_or_init(|| {
            match Self::from_json_slice(include_bytes!("embedded_definitions.json")) {
                Ok(set) => set,
                Err(err) => {
                    log::warn!("embedded issue definitions unusable: {err}");
                    DefinitionSet::default()
                }
            }
        })
    }

    /// Loads from the first Burp Suite jar found in common install paths, silently
    /// falling back to the embedded dictionary.
    #[must_use]
    pub fn auto_detect() -> DefinitionSet {
        match find_default_jar() {
            Some(jar) => match Self::from_jar(&jar) {
                Ok(set) => set,
                Err(err) => {
                    log::debug!("jar at {} unusable ({err}), using embedded", jar.display());
                    Self::embedded().clone()
                }
            },
            None => Self::embedded().clone(),
        }
    }

    /// Number of definitions held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns true when the set holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// All definitions sorted by type id.
    #[must_use]
    pub fn definitions(&self) -> Vec<&IssueDefinition> {
        let mut defs: Vec<&IssueDefinition> = self.defs.values().collect();
        defs.sort_by_key(|def| def.type_index);
        defs
    }
}

impl DefinitionLookup for DefinitionSet {
    fn lookup(&self, type_id: u32) -> Option<&IssueDefinition> {
        self.defs.get(&type_id)
    }
}

/// Looks for a Burp Suite jar in the usual install locations.
#[must_use]
pub fn find_default_jar() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        candidates.push(home.join("BurpSuitePro/burpsuite_pro.jar"));
        candidates.push(home.join("BurpSuiteCommunity/burpsuite_community.jar"));
    }
    candidates.push(PathBuf::from("/opt/BurpSuitePro/burpsuite_pro.jar"));
    candidates.push(PathBuf::from("/opt/BurpSuiteCommunity/burpsuite_community.jar"));

    candidates.into_iter().find(|path| path.is_file())
}

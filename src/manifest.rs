//! Marketplace manifest loading.
//!
//! The manifest is read once, checked for syntax and schema, and then
//! treated as immutable for the rest of the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::errors::{Result, ValidatorError};
use crate::fs_util::escapes_base;

/// Name of the directory that holds marketplace and plugin metadata.
pub const METADATA_DIR: &str = ".claude-plugin";

/// Default manifest location relative to the working directory.
pub const DEFAULT_MANIFEST_PATH: &str = ".claude-plugin/marketplace.json";

/// One plugin listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Unique plugin name.
    pub name: String,
    /// Where the plugin lives.
    pub source: PluginSource,
    /// Optional short description.
    pub description: Option<String>,
    /// Optional version string.
    pub version: Option<String>,
    /// Optional marketplace category.
    pub category: Option<String>,
    /// Search tags.
    pub tags: Vec<String>,
    /// `false` when the marketplace entry stands in for the plugin's own
    /// descriptor.
    pub strict: Option<bool>,
}

impl ManifestEntry {
    /// Relative plugin directory, or `None` for a remote source.
    #[must_use]
    pub fn local_path(&self) -> Option<&str> {
        match &self.source {
            PluginSource::Local(path) => Some(path),
            PluginSource::Remote(_) => None,
        }
    }
}

/// Location of a plugin listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PluginSource {
    /// Directory relative to the marketplace base directory.
    Local(String),
    /// Plugin fetched from elsewhere. Never resolved on disk.
    Remote(RemoteSource),
}

/// An object source such as `{ "source": "github", "repo": "owner/repo" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSource {
    /// Source type (`github`, `url`, `git`, ...).
    pub kind: String,
    /// Repository or URL, when the type declares one.
    pub location: Option<String>,
}

impl std::fmt::Display for RemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} source {loc}", self.kind),
            None => write!(f, "{} source", self.kind),
        }
    }
}

/// A parsed, schema-checked marketplace manifest.
#[derive(Debug, Clone)]
pub struct MarketplaceManifest {
    /// Marketplace name, if declared.
    pub name: Option<String>,
    /// Marketplace owner name, if declared.
    pub owner: Option<String>,
    /// `metadata.pluginRoot`: prefix applied to every source path.
    pub plugin_root: Option<String>,
    entries: Vec<ManifestEntry>,
    path: PathBuf,
}

impl MarketplaceManifest {
    /// Entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Look up an entry by name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the manifest lists no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path the manifest was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that entry source paths are relative to.
    ///
    /// A manifest stored under `.claude-plugin/` describes the repository
    /// one level up; otherwise sources are relative to the manifest's own
    /// directory. `metadata.pluginRoot` is appended when present.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let root = if parent.file_name().is_some_and(|n| n == METADATA_DIR) {
            match parent.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        } else {
            parent
        };
        match &self.plugin_root {
            Some(prefix) => root.join(prefix),
            None => root,
        }
    }

    /// `explicit` (from `--base-dir`) when given, otherwise [`Self::base_dir`].
    #[must_use]
    pub fn base_dir_or(&self, explicit: Option<&Path>) -> PathBuf {
        explicit.map_or_else(|| self.base_dir(), Path::to_path_buf)
    }
}

/// Document syntax of a manifest, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml`/`.yml` is YAML; anything else is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    owner: Option<RawOwner>,
    metadata: Option<RawMetadata>,
    plugins: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(rename = "pluginRoot")]
    plugin_root: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: Option<String>,
    #[serde(rename = "sourcePath")]
    source_path: Option<RawSource>,
    source: Option<RawSource>,
    description: Option<String>,
    version: Option<String>,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    strict: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawSource {
    Path(String),
    Object(Map<String, Value>),
}

/// Read a manifest from disk.
///
/// Fails with [`ValidatorError::Invocation`] when the file does not exist,
/// [`ValidatorError::ManifestParse`] on malformed JSON/YAML, and
/// [`ValidatorError::SchemaViolation`] when required fields are missing or
/// a plugin name is duplicated.
pub fn load(path: &Path) -> Result<MarketplaceManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ValidatorError::Invocation {
                message: format!("manifest not found: {}", path.display()),
            }
        } else {
            ValidatorError::InternalIo {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let manifest = parse(&content, DocumentFormat::from_path(path), path)?;
    debug!(
        path = %path.display(),
        plugins = manifest.len(),
        "loaded marketplace manifest"
    );
    Ok(manifest)
}

/// Parse manifest text. `path` is recorded for base-directory resolution
/// and error messages only.
pub fn parse(content: &str, format: DocumentFormat, path: &Path) -> Result<MarketplaceManifest> {
    let parse_error = |message: String| ValidatorError::ManifestParse {
        path: path.to_path_buf(),
        message,
    };
    let value: serde_json::Value = match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
        }
        DocumentFormat::Yaml => {
            serde_yaml_ng::from_str(content).map_err(|e| parse_error(e.to_string()))?
        }
    };

    if !value.is_object() {
        return Err(schema("manifest root must be an object"));
    }
    let raw: RawManifest = serde_json::from_value(value).map_err(|e| schema(e.to_string()))?;
    let raw_entries = raw
        .plugins
        .ok_or_else(|| schema("missing required field `plugins`"))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, value) in raw_entries.into_iter().enumerate() {
        let entry = check_entry(index, deserialize_entry(index, value)?)?;
        if !seen.insert(entry.name.clone()) {
            return Err(schema(format!("duplicate plugin name \"{}\"", entry.name)));
        }
        entries.push(entry);
    }

    Ok(MarketplaceManifest {
        name: raw.name,
        owner: raw.owner.and_then(|o| o.name),
        plugin_root: raw.metadata.and_then(|m| m.plugin_root),
        entries,
        path: path.to_path_buf(),
    })
}

fn deserialize_entry(index: usize, value: Value) -> Result<RawEntry> {
    let context = match value.get("name").and_then(Value::as_str) {
        Some(name) => format!("plugins[{index}] ({name})"),
        None => format!("plugins[{index}]"),
    };
    if !value.is_object() {
        return Err(schema(format!("{context}: entry must be an object")));
    }
    serde_json::from_value(value).map_err(|e| schema(format!("{context}: {e}")))
}

fn check_entry(index: usize, raw: RawEntry) -> Result<ManifestEntry> {
    let name = match raw.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Err(schema(format!("plugins[{index}]: missing required field `name`"))),
    };
    let context = format!("plugins[{index}] ({name})");
    let raw_source = match (raw.source_path, raw.source) {
        (Some(a), Some(b)) if a != b => {
            return Err(schema(format!("{context}: `sourcePath` and `source` disagree")));
        }
        (Some(s), _) | (None, Some(s)) => s,
        (None, None) => {
            return Err(schema(format!("{context}: missing required field `sourcePath`")));
        }
    };
    let source = match raw_source {
        RawSource::Path(path) => PluginSource::Local(check_local_path(&context, path)?),
        RawSource::Object(object) => PluginSource::Remote(check_remote(&context, &object)?),
    };
    Ok(ManifestEntry {
        name,
        source,
        description: raw.description,
        version: raw.version,
        category: raw.category,
        tags: raw.tags,
        strict: raw.strict,
    })
}

fn check_local_path(context: &str, path: String) -> Result<String> {
    if path.trim().is_empty() {
        return Err(schema(format!("{context}: source path must not be empty")));
    }
    let source = Path::new(&path);
    if source.is_absolute() {
        return Err(schema(format!("{context}: source path must be relative: \"{path}\"")));
    }
    if escapes_base(source) {
        return Err(schema(format!(
            "{context}: source path escapes the marketplace root: \"{path}\""
        )));
    }
    Ok(path)
}

/// Shape checks for object sources: `github` needs `repo`, `url` needs an
/// absolute URL with a host. Other source types are accepted as declared.
fn check_remote(context: &str, object: &Map<String, Value>) -> Result<RemoteSource> {
    let field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_owned);
    let Some(kind) = field("source") else {
        return Err(schema(format!(
            "{context}: source object must specify a string `source` type"
        )));
    };
    let location = match kind.as_str() {
        "github" => match field("repo") {
            Some(repo) if !repo.trim().is_empty() => Some(repo),
            _ => return Err(schema(format!("{context}: github source must specify `repo`"))),
        },
        "url" => {
            let Some(raw) = field("url") else {
                return Err(schema(format!("{context}: url source must specify `url`")));
            };
            match Url::parse(&raw) {
                Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Some(raw),
                _ => return Err(schema(format!("{context}: invalid source url \"{raw}\""))),
            }
        }
        _ => field("url").or_else(|| field("repo")),
    };
    Ok(RemoteSource { kind, location })
}

fn schema(message: impl Into<String>) -> ValidatorError {
    ValidatorError::SchemaViolation {
        message: message.into(),
    }
}

//! YAML frontmatter extraction for markdown sub-resources (commands,
//! skills, agents).

use std::collections::BTreeMap;

use serde_yaml_ng::Value;
use thiserror::Error;

/// Parsed frontmatter keys, sorted for stable iteration.
pub type Frontmatter = BTreeMap<String, Value>;

/// Why a frontmatter block could not be extracted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("missing frontmatter (file must start with `---`)")]
    Missing,
    #[error("frontmatter is not closed (no terminating `---` line)")]
    Unclosed,
    #[error("invalid YAML in frontmatter: {0}")]
    Yaml(String),
    #[error("frontmatter must be a YAML mapping")]
    NotMapping,
}

/// Extract the frontmatter between the leading `---` delimiters.
///
/// Returns `(metadata, body)`. The opening delimiter must be the first line.
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let first = lines.next().ok_or(FrontmatterError::Missing)?;
    if first.trim_end() != "---" {
        return Err(FrontmatterError::Missing);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            let metadata = parse_yaml(&content[yaml_start..offset])?;
            return Ok((metadata, &content[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(FrontmatterError::Unclosed)
}

/// Like [`parse_frontmatter`], but a file without a leading `---` yields an
/// empty map and the whole content as body.
pub fn parse_optional_frontmatter(content: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    match parse_frontmatter(content) {
        Err(FrontmatterError::Missing) => Ok((Frontmatter::new(), content)),
        other => other,
    }
}

fn parse_yaml(yaml: &str) -> Result<Frontmatter, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::new());
    }
    let value: Value =
        serde_yaml_ng::from_str(yaml).map_err(|e| FrontmatterError::Yaml(e.to_string()))?;
    match value {
        Value::Null => Ok(Frontmatter::new()),
        Value::Mapping(map) => Ok(map
            .into_iter()
            .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
            .collect()),
        _ => Err(FrontmatterError::NotMapping),
    }
}

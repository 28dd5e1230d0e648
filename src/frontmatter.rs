//! Front-matter splitting and schema validation.
//!
//! A document starts with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Hello
//! date: 2024-01-01
//! tags: [rust, notes]
//! ---
//!
//! Body markdown…
//! ```
//!
//! [`split`] separates that block from the body; [`parse`] checks the block
//! against a [`DocumentType`]'s required keys and deserializes it. Keys the
//! schema does not know are ignored and logged.

use crate::document::DocumentType;
use serde_yaml_ng::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("{file}: front-matter block is not terminated by `---`")]
    Unterminated { file: String },
    #[error("{file}: front-matter is not a key/value mapping")]
    NotAMapping { file: String },
    #[error("{file}: missing required field `{field}`")]
    MissingField { file: String, field: &'static str },
    #[error("{file}: invalid front-matter: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

/// A source file split at the end of its front-matter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// YAML between the fences; `None` when the file has no front-matter.
    pub yaml: Option<&'a str>,
    /// Everything after the closing fence.
    pub body: &'a str,
}

/// Split a source file into its front-matter and body.
pub fn split<'a>(source: &'a str, file: &str) -> Result<Split<'a>, FrontMatterError> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(rest) = strip_fence(text) else {
        return Ok(Split {
            yaml: None,
            body: source,
        });
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Ok(Split {
                yaml: Some(&rest[..offset]),
                body: &rest[offset + line.len()..],
            });
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated {
        file: file.to_string(),
    })
}

/// Strip an opening `---` line, returning the text after it.
fn strip_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("---")?;
    let rest = rest.trim_start_matches([' ', '\t']);
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Validate and deserialize front-matter for document type `F`.
///
/// Required keys must be present and non-null; type errors in any field are
/// reported with the file name.
pub fn parse<F: DocumentType>(yaml: Option<&str>, file: &str) -> Result<F, FrontMatterError> {
    let value: Value = match yaml {
        Some(text) if !text.trim().is_empty() => {
            serde_yaml_ng::from_str(text).map_err(|source| FrontMatterError::Yaml {
                file: file.to_string(),
                source,
            })?
        }
        _ => Value::Mapping(Default::default()),
    };

    let Value::Mapping(mapping) = &value else {
        return Err(FrontMatterError::NotAMapping {
            file: file.to_string(),
        });
    };

    for required in F::REQUIRED {
        let present = required
            .keys()
            .any(|key| mapping.get(key).is_some_and(|v| !v.is_null()));
        if !present {
            return Err(FrontMatterError::MissingField {
                file: file.to_string(),
                field: required.name,
            });
        }
    }

    let mut ignored = Vec::new();
    let fields = serde_ignored::deserialize(value, |path| ignored.push(path.to_string()))
        .map_err(|source| FrontMatterError::Yaml {
            file: file.to_string(),
            source,
        })?;

    if !ignored.is_empty() {
        warn!(file, fields = ?ignored, "ignoring unknown front-matter fields");
    }

    Ok(fields)
}

//! Front-matter parsing
//!
//! Content files start with an optional YAML block fenced by `---` lines.
//! The block must parse as a YAML mapping; anything else (no opening line,
//! no closing line, invalid YAML, a bare scalar) degrades to "no front
//! matter" and the whole file is treated as content.

use serde::de::DeserializeOwned;
use serde_yaml::Mapping;

/// Parsed front matter plus the body that follows it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matter {
    pub data: Mapping,
    pub content: String,
}

impl Matter {
    /// Split a document into its raw YAML block and body.
    ///
    /// Returns `None` when the document does not open with a `---` line or
    /// the closing `---` line is missing. The YAML slice keeps its trailing
    /// newline; the body starts on the line after the closing delimiter.
    pub fn split(input: &str) -> Option<(&str, &str)> {
        let mut lines = input.split_inclusive('\n');
        let first = lines.next()?;
        if first.trim_end() != "---" || !first.ends_with('\n') {
            return None;
        }

        let mut offset = first.len();
        for line in lines {
            if line.trim_end() == "---" {
                let yaml = &input[first.len()..offset];
                let body = &input[offset + line.len()..];
                return Some((yaml, body));
            }
            offset += line.len();
        }
        None
    }

    /// Parse front matter into an untyped mapping.
    ///
    /// Never fails: when the YAML block is missing, malformed, or not a
    /// mapping, the result has empty data and the entire input as content.
    pub fn parse(input: &str) -> Self {
        let Some((yaml, body)) = Self::split(input) else {
            return Self {
                data: Mapping::new(),
                content: input.to_string(),
            };
        };

        if yaml.trim().is_empty() {
            return Self {
                data: Mapping::new(),
                content: body.to_string(),
            };
        }

        match serde_yaml::from_str::<Mapping>(yaml) {
            Ok(data) => Self {
                data,
                content: body.to_string(),
            },
            Err(e) => {
                tracing::warn!("Failed to parse YAML front-matter, treating as content: {}", e);
                Self {
                    data: Mapping::new(),
                    content: input.to_string(),
                }
            }
        }
    }

    /// Parse front matter against a typed schema.
    ///
    /// Returns (data, body). A missing or empty YAML block yields the
    /// schema's default; a present block that fails to deserialize is a
    /// real error the caller decides how to surface.
    pub fn parse_as<T>(input: &str) -> Result<(T, &str), serde_yaml::Error>
    where
        T: DeserializeOwned + Default,
    {
        match Self::split(input) {
            Some((yaml, body)) if !yaml.trim().is_empty() => {
                let data: T = serde_yaml::from_str(yaml)?;
                Ok((data, body))
            }
            Some((_, body)) => Ok((T::default(), body)),
            None => Ok((T::default(), input)),
        }
    }
}

/// Update directives are the `TAG=VALUE` edits given on the command line.
///
/// They form an ordered list applied strictly left to right against the in-memory tag, so a
/// directive always sees the effects of the ones before it.
use crate::error::{Result, TagsortExpectedError};
use crate::id3tags::{is_known_frame, TagContainer, TITLE};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveValue {
    /// Blank value: remove the frame.
    Delete,
    /// `~TAG`: copy the current value of another frame.
    CopyFrom(String),
    Set(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDirective {
    pub tag: String,
    pub value: DirectiveValue,
}

impl fmt::Display for UpdateDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            DirectiveValue::Delete => write!(f, "{}=", self.tag),
            DirectiveValue::CopyFrom(source) => write!(f, "{}=~{}", self.tag, source),
            DirectiveValue::Set(value) => write!(f, "{}={}", self.tag, value),
        }
    }
}

impl UpdateDirective {
    pub fn parse(raw: &str) -> Result<UpdateDirective> {
        let splits: Vec<&str> = raw.split('=').collect();
        if splits.len() != 2 {
            return Err(TagsortExpectedError::InvalidUpdateSyntax {
                directive: raw.to_string(),
            }
            .into());
        }

        let tag = splits[0].trim();
        let value = splits[1];

        if !is_known_frame(tag) {
            return Err(TagsortExpectedError::UnknownTag { tag: tag.to_string() }.into());
        }

        let value = if value.is_empty() {
            DirectiveValue::Delete
        } else if let Some(source) = value.strip_prefix('~') {
            if !is_known_frame(source) {
                return Err(TagsortExpectedError::InvalidTagReference {
                    tag: tag.to_string(),
                    reference: source.to_string(),
                }
                .into());
            }
            DirectiveValue::CopyFrom(source.to_string())
        } else {
            DirectiveValue::Set(value.to_string())
        };

        Ok(UpdateDirective {
            tag: tag.to_string(),
            value,
        })
    }
}

/// Parse all directives up front; the first malformed one aborts.
pub fn parse_directives<S: AsRef<str>>(raw: &[S]) -> Result<Vec<UpdateDirective>> {
    raw.iter().map(|r| UpdateDirective::parse(r.as_ref())).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveEffects {
    /// Set when a directive wrote the title; the file is renamed to it after a successful save.
    pub rename_to: Option<String>,
}

pub fn apply_directives(tags: &mut dyn TagContainer, directives: &[UpdateDirective]) -> Result<DirectiveEffects> {
    let mut effects = DirectiveEffects::default();

    for directive in directives {
        let value = match &directive.value {
            DirectiveValue::Delete => {
                tracing::debug!("Deleting {} from {}", directive.tag, tags.path().display());
                tags.delete_frame(&directive.tag);
                continue;
            }
            DirectiveValue::CopyFrom(source) => match tags.get_text(source) {
                Some(v) => v,
                None => {
                    return Err(TagsortExpectedError::InvalidTagReference {
                        tag: directive.tag.clone(),
                        reference: source.clone(),
                    }
                    .into())
                }
            },
            DirectiveValue::Set(v) => v.clone(),
        };

        if directive.tag == TITLE {
            effects.rename_to = Some(value.clone());
        }
        tags.set_text(&directive.tag, &value);
    }

    Ok(effects)
}

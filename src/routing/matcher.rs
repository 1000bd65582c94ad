//! Path template matching.
//!
//! # Responsibilities
//! - Parse templates such as `/widgets/{id}` or `/files/{*rest}`
//! - Match a request path against a template
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Trailing slashes are significant (`/a/` does not match `/a`)
//! - `{name}` matches exactly one non-empty segment
//! - `{*name}` matches the remainder and must be the last segment

/// Template parse failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("path must start with '/'")]
    MissingLeadingSlash,
    #[error("unbalanced braces in segment {0:?}")]
    Unbalanced(String),
    #[error("parameter without a name")]
    EmptyParam,
    #[error("wildcard must be the last segment")]
    WildcardNotLast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    Wildcard,
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or(TemplateError::MissingLeadingSlash)?;

        let parts = split_segments(rest);
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => {
                    if inner.contains('{') || inner.contains('}') {
                        return Err(TemplateError::Unbalanced(part.to_string()));
                    }
                    match inner.strip_prefix('*') {
                        Some(name) => {
                            if name.is_empty() {
                                return Err(TemplateError::EmptyParam);
                            }
                            if i + 1 != parts.len() {
                                return Err(TemplateError::WildcardNotLast);
                            }
                            Segment::Wildcard
                        }
                        None if inner.is_empty() => return Err(TemplateError::EmptyParam),
                        None => Segment::Param,
                    }
                }
                None => {
                    if part.contains('{') || part.contains('}') {
                        return Err(TemplateError::Unbalanced(part.to_string()));
                    }
                    Segment::Literal(part.to_string())
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if `path` (without query) matches this template.
    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        let parts = split_segments(rest);

        for (i, segment) in self.segments.iter().enumerate() {
            let Some(part) = parts.get(i) else {
                return false;
            };
            match segment {
                Segment::Wildcard => return true,
                Segment::Param => {
                    if part.is_empty() {
                        return false;
                    }
                }
                Segment::Literal(lit) => {
                    if lit != part {
                        return false;
                    }
                }
            }
        }

        parts.len() == self.segments.len()
    }
}

/// `""` (the root path) has no segments; anything else splits on '/'.
fn split_segments(rest: &str) -> Vec<&str> {
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_template() {
        let t = PathTemplate::parse("/v1/widgets").unwrap();
        assert!(t.matches("/v1/widgets"));
        assert!(!t.matches("/v1/widgets/"));
        assert!(!t.matches("/v1/Widgets"));
        assert!(!t.matches("/v1"));
    }

    #[test]
    fn test_root_template() {
        let t = PathTemplate::parse("/").unwrap();
        assert!(t.matches("/"));
        assert!(!t.matches("/a"));
    }

    #[test]
    fn test_param_template() {
        let t = PathTemplate::parse("/widgets/{id}").unwrap();
        assert!(t.matches("/widgets/42"));
        assert!(!t.matches("/widgets/"));
        assert!(!t.matches("/widgets/42/parts"));
        assert_eq!(t.as_str(), "/widgets/{id}");
    }

    #[test]
    fn test_wildcard_template() {
        let t = PathTemplate::parse("/files/{*rest}").unwrap();
        assert!(t.matches("/files/a"));
        assert!(t.matches("/files/a/b/c"));
        assert!(!t.matches("/files"));
        assert!(!t.matches("/other/a"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PathTemplate::parse("widgets"), Err(TemplateError::MissingLeadingSlash));
        assert_eq!(PathTemplate::parse("/w/{}"), Err(TemplateError::EmptyParam));
        assert_eq!(PathTemplate::parse("/w/{*}"), Err(TemplateError::EmptyParam));
        assert_eq!(PathTemplate::parse("/w/{*a}/b"), Err(TemplateError::WildcardNotLast));
        assert!(matches!(PathTemplate::parse("/w/{id"), Err(TemplateError::Unbalanced(_))));
        assert!(matches!(PathTemplate::parse("/w/x{id}"), Err(TemplateError::Unbalanced(_))));
    }
}

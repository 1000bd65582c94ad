//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every path is a well-formed template
//! - Check methods are valid HTTP tokens
//! - Check filter and destination URLs are forwardable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FilterDocument → Result<(), Vec<ValidationError>>
//! - Runs before the document is turned into a routing table

use axum::http::Method;
use url::Url;

use crate::config::schema::FilterDocument;
use crate::routing::matcher::PathTemplate;

/// A single semantic problem in the filter document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{location}: invalid path template {path:?}: {reason}")]
    InvalidPath {
        location: String,
        path: String,
        reason: String,
    },
    #[error("{location}: invalid HTTP method {method:?}")]
    InvalidMethod { location: String, method: String },
    #[error("{location}: unsupported URL {url}: {reason}")]
    InvalidUrl {
        location: String,
        url: String,
        reason: &'static str,
    },
}

pub fn validate_document(document: &FilterDocument) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, filter) in document.prefilters.iter().enumerate() {
        let location = format!("Prefilters[{}]", i);
        check_url(&location, &filter.endpoint, &mut errors);
        for method in &filter.methods {
            if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    location: location.clone(),
                    method: method.clone(),
                });
            }
        }
        check_paths(&location, &filter.paths, &mut errors);
    }

    for (i, destination) in document.destinations.iter().enumerate() {
        let location = format!("Destinations[{}]", i);
        check_url(&location, &destination.destination_url, &mut errors);
        check_paths(&location, &destination.paths, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(location: &str, url: &Url, errors: &mut Vec<ValidationError>) {
    let reason = if url.scheme() != "http" {
        Some("only http URLs are supported")
    } else if url.host_str().is_none() {
        Some("missing host")
    } else {
        None
    };

    if let Some(reason) = reason {
        errors.push(ValidationError::InvalidUrl {
            location: location.to_string(),
            url: url.to_string(),
            reason,
        });
    }
}

fn check_paths(location: &str, paths: &[String], errors: &mut Vec<ValidationError>) {
    for path in paths {
        if let Err(e) = PathTemplate::parse(path) {
            errors.push(ValidationError::InvalidPath {
                location: location.to_string(),
                path: path.clone(),
                reason: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DestinationConfig, FilterConfig};

    fn filter(endpoint: &str, methods: &[&str], paths: &[&str]) -> FilterConfig {
        FilterConfig {
            endpoint: Url::parse(endpoint).unwrap(),
            secret_token: String::new(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_valid_document() {
        let doc = FilterDocument {
            prefilters: vec![filter("http://f.local/check", &["get", "POST"], &["/widgets/{id}"])],
            destinations: vec![DestinationConfig {
                destination_url: Url::parse("http://b.local:9000").unwrap(),
                paths: vec!["/widgets/{*rest}".into()],
            }],
        };
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let doc = FilterDocument {
            prefilters: vec![filter("https://f.local/check", &["G ET"], &["widgets", "/a/{id"])],
            destinations: vec![],
        };
        let errors = validate_document(&doc).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidUrl { .. }));
        assert!(matches!(errors[1], ValidationError::InvalidMethod { .. }));
    }
}

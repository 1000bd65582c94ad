//! The routing table: path templates to filter chains and destinations.
//!
//! # Responsibilities
//! - Store compiled templates with their allowed methods
//! - Resolve an inbound (method, path) to the template it matched
//! - Map a template to its ordered filters and its destination
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) template lookup via HashMap
//! - O(n) template scan for matching (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default; the caller picks the fallback

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{DestinationConfig, FilterConfig, FilterDocument};
use crate::config::validation::validate_document;
use crate::routing::matcher::PathTemplate;

#[derive(Debug)]
struct RegisteredRoute {
    template: PathTemplate,
    /// `None` accepts every method.
    methods: Option<Vec<Method>>,
}

impl RegisteredRoute {
    fn allows(&self, method: &Method) -> bool {
        match &self.methods {
            None => true,
            Some(methods) => methods.contains(method),
        }
    }

    fn allow_all(&mut self) {
        self.methods = None;
    }

    fn allow(&mut self, method: Method) {
        if let Some(methods) = &mut self.methods {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
    }
}

/// Result of looking a template up in the table.
#[derive(Debug, Clone, Copy)]
pub struct RouteLookup<'a> {
    /// Filters in declaration order. Empty when none apply.
    pub filters: &'a [Arc<FilterConfig>],
    /// Explicit destination for the template, else the default.
    pub destination: &'a Url,
}

/// Immutable mapping built from a filter document.
#[derive(Debug)]
pub struct RoutingTable {
    routes: Vec<RegisteredRoute>,
    route_index: HashMap<String, usize>,
    path_filters: HashMap<String, Vec<Arc<FilterConfig>>>,
    path_destinations: HashMap<String, Arc<DestinationConfig>>,
    default_destination: Url,
}

impl RoutingTable {
    /// Build a table from a filter document.
    ///
    /// The document is validated first, so every template and method seen
    /// during registration is well formed. Filters are registered under each
    /// of their paths in declaration order. When several destinations claim
    /// a path the last one wins.
    pub fn build(document: &FilterDocument, default_destination: Url) -> Result<Self, ConfigError> {
        validate_document(document).map_err(ConfigError::Validation)?;

        let mut table = Self {
            routes: Vec::new(),
            route_index: HashMap::new(),
            path_filters: HashMap::new(),
            path_destinations: HashMap::new(),
            default_destination,
        };

        for filter in &document.prefilters {
            let filter = Arc::new(filter.clone());
            for path in &filter.paths {
                let Some(route) = table.register(path) else {
                    continue;
                };

                if filter.methods.is_empty() {
                    route.allow_all();
                } else {
                    filter
                        .methods
                        .iter()
                        .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
                        .for_each(|m| route.allow(m));
                }

                table
                    .path_filters
                    .entry(path.clone())
                    .or_default()
                    .push(filter.clone());
            }
        }

        for destination in &document.destinations {
            let destination = Arc::new(destination.clone());
            for path in &destination.paths {
                let Some(route) = table.register(path) else {
                    continue;
                };
                route.allow_all();

                if let Some(previous) = table.path_destinations.insert(path.clone(), destination.clone()) {
                    tracing::debug!(
                        path = %path,
                        previous = %previous.destination_url,
                        current = %destination.destination_url,
                        "Destination overridden by later entry"
                    );
                }
            }
        }

        tracing::debug!(
            routes = table.routes.len(),
            filtered_paths = table.path_filters.len(),
            destinations = table.path_destinations.len(),
            "Routing table built"
        );

        Ok(table)
    }

    /// Find or create the route for `path`. `None` only if the template does
    /// not parse, which validation already rules out.
    fn register(&mut self, path: &str) -> Option<&mut RegisteredRoute> {
        let index = match self.route_index.get(path) {
            Some(&index) => index,
            None => {
                let template = PathTemplate::parse(path).ok()?;
                self.routes.push(RegisteredRoute {
                    template,
                    methods: Some(Vec::new()),
                });
                self.route_index.insert(path.to_string(), self.routes.len() - 1);
                self.routes.len() - 1
            }
        };
        self.routes.get_mut(index)
    }

    /// Resolve the template an inbound request matched, if any.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| route.template.matches(path) && route.allows(method))
            .map(|route| route.template.as_str())
    }

    /// Filters and destination for a template.
    pub fn lookup(&self, template: &str) -> RouteLookup<'_> {
        RouteLookup {
            filters: self.filters_for(template),
            destination: self.destination_for(template),
        }
    }

    /// Ordered filters registered for a template. Empty if none.
    pub fn filters_for(&self, template: &str) -> &[Arc<FilterConfig>] {
        self.path_filters
            .get(template)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Destination for a template, falling back to the default.
    pub fn destination_for(&self, template: &str) -> &Url {
        self.path_destinations
            .get(template)
            .map(|d| &d.destination_url)
            .unwrap_or(&self.default_destination)
    }

    pub fn default_destination(&self) -> &Url {
        &self.default_destination
    }

    /// Number of distinct registered templates.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

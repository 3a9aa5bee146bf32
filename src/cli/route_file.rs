use anyhow::{anyhow, Context, Result};
use http::Method;
use serde::Deserialize;
use std::path::Path;

use crate::context::handler;
use crate::dispatcher::Dispatcher;
use crate::runtime_config::RouterConfig;

/// Key under which every route's handler records its name.
pub const HANDLER_KEY: &str = "handler";

/// One entry of a route file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub method: String,
    pub pattern: String,
    pub handler: String,
}

/// Route definitions loaded from YAML:
///
/// ```yaml
/// routes:
///   - method: GET
///     pattern: /users/{id:int}
///     handler: get_user
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteFile {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl RouteFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse route file")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route file {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid route file {}", path.display()))
    }

    /// Register every route on a new dispatcher. Each route gets a single handler
    /// that stores its name under [`HANDLER_KEY`].
    pub fn build_dispatcher(&self, config: RouterConfig) -> Result<Dispatcher> {
        let dispatcher = Dispatcher::new(config);
        for route in &self.routes {
            let method = parse_method(&route.method)?;
            let name = route.handler.clone();
            dispatcher
                .register(
                    method,
                    &route.pattern,
                    vec![handler(move |c| c.keys().set(HANDLER_KEY, name.as_str()))],
                )
                .with_context(|| {
                    format!("Failed to register {} {}", route.method, route.pattern)
                })?;
        }
        Ok(dispatcher)
    }
}

pub fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow!("Invalid HTTP method '{}'", raw))
}

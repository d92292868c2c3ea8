#![allow(missing_docs)]

use std::collections::HashMap;

use crate::{params::BuiltIn, Identifier, Value};

/// Client-level configuration that feeds endpoint resolution.
///
/// ```
/// # use endpoint_rules::ClientConfig;
/// let config = ClientConfig::new()
///     .with_region("eu-central-1")
///     .with_use_fips(true)
///     .with_client_context_param("Accelerate", true);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    region: Option<String>,
    use_dual_stack: bool,
    use_fips: bool,
    endpoint_override: Option<String>,
    client_context_params: HashMap<Identifier, Value>,
}

impl ClientConfig {
    /// Create a default configuration: no region, no endpoint override, FIPS and dual-stack
    /// disabled.
    pub fn new() -> ClientConfig {
        ClientConfig::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> ClientConfig {
        self.region = Some(region.into());
        self
    }

    pub fn with_use_dual_stack(mut self, use_dual_stack: bool) -> ClientConfig {
        self.use_dual_stack = use_dual_stack;
        self
    }

    pub fn with_use_fips(mut self, use_fips: bool) -> ClientConfig {
        self.use_fips = use_fips;
        self
    }

    /// Send all requests to `endpoint`. Rule sets usually still validate it and may add path or
    /// signing properties.
    pub fn with_endpoint_override(mut self, endpoint: impl Into<String>) -> ClientConfig {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    /// Set a service-specific client context parameter (e.g., S3 `Accelerate`).
    pub fn with_client_context_param(
        mut self,
        name: impl Into<Identifier>,
        value: impl Into<Value>,
    ) -> ClientConfig {
        self.client_context_params.insert(name.into(), value.into());
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn use_dual_stack(&self) -> bool {
        self.use_dual_stack
    }

    pub fn use_fips(&self) -> bool {
        self.use_fips
    }

    pub fn endpoint_override(&self) -> Option<&str> {
        self.endpoint_override.as_deref()
    }

    pub fn client_context_param(&self, name: &str) -> Option<&Value> {
        self.client_context_params.get(name)
    }

    /// Value of a built-in parameter, if this configuration supplies it.
    pub fn built_in(&self, built_in: &BuiltIn) -> Option<Value> {
        match built_in {
            BuiltIn::Region => self.region.clone().map(Value::String),
            BuiltIn::UseFips => Some(Value::Boolean(self.use_fips)),
            BuiltIn::UseDualStack => Some(Value::Boolean(self.use_dual_stack)),
            BuiltIn::Endpoint => self.endpoint_override.clone().map(Value::String),
            BuiltIn::Other(_) => None,
        }
    }
}

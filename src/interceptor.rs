//! Request pipeline glue: assembling endpoint parameters and storing the resolved endpoint.
use std::{collections::HashMap, sync::Arc};

use crate::{
    params::BuiltIn, ClientConfig, Endpoint, Environment, Identifier, Record, Result, RuleSet,
    Value,
};

/// Anything that can turn endpoint parameters into an endpoint.
pub trait EndpointProvider: Send + Sync {
    /// Resolve endpoint for parameters assembled by [`ResolveEndpointInterceptor`].
    fn resolve_endpoint(&self, params: &Environment) -> Result<Endpoint>;
}

impl EndpointProvider for RuleSet {
    fn resolve_endpoint(&self, params: &Environment) -> Result<Endpoint> {
        self.resolve(params)
    }
}

/// Request whose members can be bound to context parameters.
pub trait ContextParamSource {
    /// Value of request member `name`, if set.
    fn member(&self, name: &str) -> Option<Value>;
}

impl ContextParamSource for Record {
    fn member(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl ContextParamSource for HashMap<String, Value> {
    fn member(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Request without members.
impl ContextParamSource for () {
    fn member(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Binds a request member to an endpoint parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContextParam {
    parameter: Identifier,
    member: String,
}

/// Per-service knowledge of where endpoint parameters come from.
#[derive(Debug, Clone, Default)]
pub struct ServiceEndpointMetadata {
    built_ins: Vec<(BuiltIn, Identifier)>,
    static_params: HashMap<String, Vec<(Identifier, Value)>>,
    context_params: HashMap<String, Vec<ContextParam>>,
    client_context_params: Vec<Identifier>,
}

impl ServiceEndpointMetadata {
    /// Create metadata with no parameter sources.
    pub fn new() -> ServiceEndpointMetadata {
        ServiceEndpointMetadata::default()
    }

    /// Metadata with built-in bindings taken from the rule set parameter declarations.
    pub fn from_rule_set(rule_set: &RuleSet) -> ServiceEndpointMetadata {
        rule_set
            .parameters()
            .built_ins()
            .fold(ServiceEndpointMetadata::new(), |metadata, (built_in, name)| {
                metadata.with_built_in(built_in.clone(), name.clone())
            })
    }

    /// Bind parameter `parameter` to a built-in value.
    pub fn with_built_in(
        mut self,
        built_in: BuiltIn,
        parameter: impl Into<Identifier>,
    ) -> ServiceEndpointMetadata {
        self.built_ins.push((built_in, parameter.into()));
        self
    }

    /// Set parameter to a fixed value for every request of `operation`.
    pub fn with_static_param(
        mut self,
        operation: impl Into<String>,
        parameter: impl Into<Identifier>,
        value: impl Into<Value>,
    ) -> ServiceEndpointMetadata {
        self.static_params
            .entry(operation.into())
            .or_default()
            .push((parameter.into(), value.into()));
        self
    }

    /// Take parameter from request member `member` for requests of `operation`.
    pub fn with_context_param(
        mut self,
        operation: impl Into<String>,
        parameter: impl Into<Identifier>,
        member: impl Into<String>,
    ) -> ServiceEndpointMetadata {
        self.context_params
            .entry(operation.into())
            .or_default()
            .push(ContextParam {
                parameter: parameter.into(),
                member: member.into(),
            });
        self
    }

    /// Recognize client context parameter `parameter`.
    pub fn with_client_context_param(
        mut self,
        parameter: impl Into<Identifier>,
    ) -> ServiceEndpointMetadata {
        self.client_context_params.push(parameter.into());
        self
    }

    fn static_params(&self, operation: &str) -> &[(Identifier, Value)] {
        self.static_params
            .get(operation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn context_params(&self, operation: &str) -> &[ContextParam] {
        self.context_params
            .get(operation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Per-request state shared between pipeline stages.
#[derive(Debug, Clone)]
pub struct ExecutionAttributes {
    operation_name: String,
    client_config: Arc<ClientConfig>,
    endpoint_discovered: bool,
    resolved_endpoint: Option<Endpoint>,
}

impl ExecutionAttributes {
    /// Attributes for one invocation of `operation_name`.
    pub fn new(operation_name: impl Into<String>, client_config: Arc<ClientConfig>) -> Self {
        ExecutionAttributes {
            operation_name: operation_name.into(),
            client_config,
            endpoint_discovered: false,
            resolved_endpoint: None,
        }
    }

    /// Mark that endpoint discovery already chose a host for this request. Endpoint resolution is
    /// then skipped.
    pub fn with_endpoint_discovered(mut self, discovered: bool) -> Self {
        self.endpoint_discovered = discovered;
        self
    }

    /// Name of the operation being invoked.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Configuration of the client issuing the request.
    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    /// `true` if endpoint discovery already picked a host.
    pub fn endpoint_discovered(&self) -> bool {
        self.endpoint_discovered
    }

    /// Endpoint chosen for this request, for the transport and signing stages.
    pub fn resolved_endpoint(&self) -> Option<&Endpoint> {
        self.resolved_endpoint.as_ref()
    }
}

/// Resolves endpoint for each outgoing request.
pub struct ResolveEndpointInterceptor {
    provider: Arc<dyn EndpointProvider>,
    metadata: Arc<ServiceEndpointMetadata>,
}

impl ResolveEndpointInterceptor {
    /// Create an interceptor resolving through `provider`.
    pub fn new(
        provider: Arc<dyn EndpointProvider>,
        metadata: Arc<ServiceEndpointMetadata>,
    ) -> ResolveEndpointInterceptor {
        ResolveEndpointInterceptor { provider, metadata }
    }

    /// Resolve endpoint for `request` and store it in `attributes`.
    ///
    /// Does nothing if endpoint discovery already resolved a host. Errors are returned to the
    /// caller unchanged, including rule-defined messages.
    pub fn modify_request<R: ContextParamSource + ?Sized>(
        &self,
        request: &R,
        attributes: &mut ExecutionAttributes,
    ) -> Result<()> {
        if attributes.endpoint_discovered {
            log::debug!(target: "endpoint_rules",
                        operation = attributes.operation_name.as_str();
                        "endpoint discovered, skipping resolution");
            return Ok(());
        }

        let params = self.endpoint_params(request, attributes);
        let endpoint = self.provider.resolve_endpoint(&params).map_err(|err| {
            log::warn!(target: "endpoint_rules",
                       operation = attributes.operation_name.as_str();
                       "failed to resolve endpoint: {err}");
            err
        })?;

        log::debug!(target: "endpoint_rules",
                    operation = attributes.operation_name.as_str(),
                    url = endpoint.url();
                    "resolved endpoint");
        attributes.resolved_endpoint = Some(endpoint);
        Ok(())
    }

    /// Assemble endpoint parameters for `request`.
    ///
    /// Layers are applied in order, later layers overriding earlier ones: built-ins, static
    /// operation parameters, request context parameters, client context parameters.
    pub fn endpoint_params<R: ContextParamSource + ?Sized>(
        &self,
        request: &R,
        attributes: &ExecutionAttributes,
    ) -> Environment {
        let config = attributes.client_config();
        let operation = attributes.operation_name();
        let mut params = HashMap::new();

        for (built_in, name) in &self.metadata.built_ins {
            if let Some(value) = config.built_in(built_in) {
                params.insert(name.clone(), value);
            }
        }

        for (name, value) in self.metadata.static_params(operation) {
            params.insert(name.clone(), value.clone());
        }

        for binding in self.metadata.context_params(operation) {
            if let Some(value) = request.member(&binding.member) {
                params.insert(binding.parameter.clone(), value);
            }
        }

        for name in &self.metadata.client_context_params {
            if let Some(value) = config.client_context_param(name) {
                params.insert(name.clone(), value.clone());
            }
        }

        Environment::from(params)
    }
}

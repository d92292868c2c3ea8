#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    environment::Scope, params::Parameters, wire::RuleSetWire, Endpoint, Expr, Identifier, Result,
};

/// Compiled endpoint rule set: parameter declarations and a tree of rules.
///
/// Rule sets are immutable and can be shared across threads behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RuleSetWire")]
pub struct RuleSet {
    version: String,
    parameters: Parameters,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a new rule set.
    ///
    /// Fails with [`Error::InvalidRuleSet`](crate::Error::InvalidRuleSet) if a parameter default
    /// doesn't match the parameter type.
    pub fn new(
        version: impl Into<String>,
        parameters: Parameters,
        rules: Vec<Rule>,
    ) -> Result<RuleSet> {
        parameters.validate()?;
        Ok(RuleSet {
            version: version.into(),
            parameters,
            rules,
        })
    }

    /// Parse rule set from its JSON document.
    pub fn from_json(json: &str) -> Result<RuleSet> {
        let wire: RuleSetWire = serde_json::from_str(json)?;
        wire.compile()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Top-level rules.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// A list of conditions (all must be truthy) and an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub(crate) conditions: Vec<Condition>,
    pub(crate) kind: RuleKind,
    pub(crate) documentation: Option<String>,
}

/// Outcome of a rule whose conditions all hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Resolve to an endpoint.
    Endpoint(EndpointTemplate),
    /// Fail with the message. The expression must evaluate to a string.
    Error(Expr),
    /// Descend into nested rules. A tree that matches none of its rules fails the resolution.
    Tree(Vec<Rule>),
}

impl Rule {
    pub fn endpoint(conditions: Vec<Condition>, endpoint: EndpointTemplate) -> Rule {
        Rule::new(conditions, RuleKind::Endpoint(endpoint))
    }

    pub fn error(conditions: Vec<Condition>, message: Expr) -> Rule {
        Rule::new(conditions, RuleKind::Error(message))
    }

    pub fn tree(conditions: Vec<Condition>, rules: Vec<Rule>) -> Rule {
        Rule::new(conditions, RuleKind::Tree(rules))
    }

    fn new(conditions: Vec<Condition>, kind: RuleKind) -> Rule {
        Rule {
            conditions,
            kind,
            documentation: None,
        }
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Rule {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }
}

/// Single condition of a rule.
///
/// A condition holds if its expression evaluates to a truthy value. When `assign` is set, the value
/// is bound under that name for the following conditions, the outcome, and nested rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub(crate) expr: Expr,
    pub(crate) assign: Option<Identifier>,
}

impl Condition {
    pub fn new(expr: Expr) -> Condition {
        Condition { expr, assign: None }
    }

    /// Bind the condition value to `name`.
    pub fn assign(mut self, name: impl Into<Identifier>) -> Condition {
        self.assign = Some(name.into());
        self
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn assigned_name(&self) -> Option<&Identifier> {
        self.assign.as_ref()
    }
}

impl From<Expr> for Condition {
    fn from(expr: Expr) -> Self {
        Condition::new(expr)
    }
}

/// Endpoint outcome. Every part is an expression evaluated against the rule scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    url: Expr,
    headers: BTreeMap<String, Vec<Expr>>,
    properties: BTreeMap<Identifier, Expr>,
}

impl EndpointTemplate {
    /// Endpoint with the given URL expression (usually a template) and no headers or properties.
    pub fn new(url: Expr) -> EndpointTemplate {
        EndpointTemplate {
            url,
            headers: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: Expr) -> EndpointTemplate {
        self.headers.entry(name.into()).or_default().push(value);
        self
    }

    /// Set a property.
    pub fn with_property(mut self, name: impl Into<Identifier>, value: Expr) -> EndpointTemplate {
        self.properties.insert(name.into(), value);
        self
    }

    pub(crate) fn eval(&self, scope: &Scope<'_>) -> Result<Endpoint> {
        let url = self.url.eval(scope)?.expect_string()?.to_owned();

        let headers = self
            .headers
            .iter()
            .map(|(name, values)| {
                let values = values
                    .iter()
                    .map(|value| Ok(value.eval(scope)?.expect_string()?.to_owned()))
                    .collect::<Result<Vec<_>>>()?;
                Ok((name.clone(), values))
            })
            .collect::<Result<_>>()?;

        let properties = self
            .properties
            .iter()
            .map(|(name, value)| Ok((name.clone(), value.eval(scope)?)))
            .collect::<Result<_>>()?;

        Ok(Endpoint {
            url,
            headers,
            properties,
        })
    }
}

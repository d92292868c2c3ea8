use serde::Serialize;

use crate::{
    environment::Scope,
    rules::{Condition, Rule, RuleKind, RuleSet},
    Endpoint, Environment, Error, Expr, Result, Value, ValueType,
};

/// Resolve endpoint for the supplied parameters.
///
/// Parameters are bound against the rule set declarations first (defaults, required checks), then
/// rules are evaluated in order and the first rule whose conditions all hold decides the outcome.
///
/// # Examples
/// ```
/// # use endpoint_rules::{resolve_endpoint, Environment, RuleSet};
/// let rule_set = RuleSet::from_json(r#"{
///     "version": "1.0",
///     "parameters": {"Region": {"type": "String", "builtIn": "AWS::Region"}},
///     "rules": [
///         {
///             "type": "endpoint",
///             "conditions": [{"fn": "isSet", "argv": [{"ref": "Region"}]}],
///             "endpoint": {"url": "https://service.{Region}.amazonaws.com"}
///         },
///         {"type": "error", "conditions": [], "error": "Region must be set"}
///     ]
/// }"#)?;
///
/// let endpoint = resolve_endpoint(&rule_set, &Environment::new().with("Region", "us-west-2"))?;
/// assert_eq!(endpoint.url(), "https://service.us-west-2.amazonaws.com");
///
/// let err = resolve_endpoint(&rule_set, &Environment::new()).unwrap_err();
/// assert_eq!(err.to_string(), "Region must be set");
/// # Ok::<(), endpoint_rules::Error>(())
/// ```
pub fn resolve_endpoint(rule_set: &RuleSet, environment: &Environment) -> Result<Endpoint> {
    rule_set.resolve_with_visitor(environment, &mut NoopEvalVisitor)
}

/// Resolve endpoint and record evaluation trace.
///
/// The trace is returned even if resolution fails, which is the main use of it.
pub fn resolve_endpoint_with_trace(
    rule_set: &RuleSet,
    environment: &Environment,
) -> (Result<Endpoint>, ResolutionTrace) {
    let mut visitor = TraceVisitor::default();
    let result = rule_set.resolve_with_visitor(environment, &mut visitor);
    (result, visitor.trace)
}

/// Evaluate a bare rule tree against `environment`.
///
/// Unlike [`resolve_endpoint`], no parameter declarations are applied: every name the rules
/// reference must be bound in `environment`.
pub fn evaluate_rules(rules: &[Rule], environment: &Environment) -> Result<Endpoint> {
    eval_rules(rules, &Scope::new(environment), &mut NoopEvalVisitor)
}

impl RuleSet {
    /// Resolve endpoint for the supplied parameters. See [`resolve_endpoint`].
    pub fn resolve(&self, environment: &Environment) -> Result<Endpoint> {
        resolve_endpoint(self, environment)
    }

    fn resolve_with_visitor<V: EvalVisitor>(
        &self,
        environment: &Environment,
        visitor: &mut V,
    ) -> Result<Endpoint> {
        let environment = self.parameters().bind(environment)?;
        let result = eval_rules(self.rules(), &Scope::new(&environment), visitor);

        match &result {
            Ok(endpoint) => {
                log::debug!(target: "endpoint_rules",
                            endpoint:serde = endpoint;
                            "resolved endpoint");
            }
            Err(err) if err.is_rule_defined() => {
                log::debug!(target: "endpoint_rules",
                            "rule set rejected parameters: {err}");
            }
            Err(err) => {
                log::debug!(target: "endpoint_rules",
                            "endpoint resolution failed: {err}");
            }
        }

        result
    }
}

fn eval_rules<V: EvalVisitor>(
    rules: &[Rule],
    scope: &Scope<'_>,
    visitor: &mut V,
) -> Result<Endpoint> {
    for (index, rule) in rules.iter().enumerate() {
        visitor.on_rule_enter(index, rule);
        let result = eval_rule(rule, scope, visitor);
        visitor.on_rule_exit(&result);

        if let Some(endpoint) = result? {
            return Ok(endpoint);
        }
    }

    Err(Error::NoRuleMatched)
}

/// Evaluate single rule. Returns `Ok(None)` if any of the conditions doesn't hold.
fn eval_rule<V: EvalVisitor>(
    rule: &Rule,
    parent: &Scope<'_>,
    visitor: &mut V,
) -> Result<Option<Endpoint>> {
    let mut scope = parent.child();

    for condition in &rule.conditions {
        let value = condition.expr.eval(&scope);
        visitor.on_condition(condition, &value);

        let value = value?;
        if !value.is_truthy() {
            log::trace!(target: "endpoint_rules",
                        condition:display = condition.expr,
                        documentation = rule.documentation.as_deref();
                        "condition does not hold, skipping rule");
            return Ok(None);
        }
        if let Some(name) = &condition.assign {
            scope.bind(name.clone(), value);
        }
    }

    match &rule.kind {
        RuleKind::Endpoint(endpoint) => endpoint.eval(&scope).map(Some),
        RuleKind::Error(message) => Err(error_message(message, &scope)),
        RuleKind::Tree(rules) => eval_rules(rules, &scope, visitor).map(Some),
    }
}

fn error_message(message: &Expr, scope: &Scope<'_>) -> Error {
    match message.eval(scope) {
        Ok(Value::String(message)) => Error::RuleDefined(message),
        Ok(other) => Error::type_mismatch(&[ValueType::String], other.ty()),
        Err(err) => err,
    }
}

/// Observer of rule evaluation.
///
/// All methods have empty default implementations, so [`NoopEvalVisitor`] compiles down to plain
/// evaluation.
pub(crate) trait EvalVisitor {
    /// Called before evaluating a rule's conditions. `index` is the position among siblings.
    #[allow(unused_variables)]
    #[inline]
    fn on_rule_enter(&mut self, index: usize, rule: &Rule) {}

    /// Called with the result of each evaluated condition.
    #[allow(unused_variables)]
    #[inline]
    fn on_condition(&mut self, condition: &Condition, result: &Result<Value>) {}

    /// Called after a rule is done. `Ok(None)` means a condition didn't hold.
    #[allow(unused_variables)]
    #[inline]
    fn on_rule_exit(&mut self, result: &Result<Option<Endpoint>>) {}
}

pub(crate) struct NoopEvalVisitor;

impl EvalVisitor for NoopEvalVisitor {}

/// Record of the rules visited during one resolution, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTrace {
    /// Visited rules. Nested rules follow their parent.
    pub rules: Vec<RuleTrace>,
}

/// Evaluation of a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTrace {
    /// Position of the rule in the tree: index among top-level rules, then among children of
    /// each nested tree.
    pub path: Vec<usize>,
    /// Rule's documentation string, if any.
    pub documentation: Option<String>,
    /// Conditions that were evaluated. Conditions after the first failing one are not present.
    pub conditions: Vec<ConditionTrace>,
    /// How the rule ended.
    pub outcome: RuleOutcome,
}

/// Evaluated condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionTrace {
    /// Rendered condition expression.
    pub condition: String,
    /// Condition value, or the error message if evaluation failed.
    pub result: std::result::Result<Value, String>,
}

/// How a rule ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOutcome {
    /// A condition did not hold.
    Skipped,
    /// The rule (or a nested one) produced an endpoint.
    Resolved,
    /// The rule failed resolution with the error.
    Failed(String),
}

#[derive(Default)]
struct TraceVisitor {
    trace: ResolutionTrace,
    /// Indices into `trace.rules` of the rules currently being evaluated.
    stack: Vec<usize>,
}

impl EvalVisitor for TraceVisitor {
    fn on_rule_enter(&mut self, index: usize, rule: &Rule) {
        let mut path = match self.stack.last() {
            Some(&parent) => self.trace.rules[parent].path.clone(),
            None => Vec::new(),
        };
        path.push(index);

        self.stack.push(self.trace.rules.len());
        self.trace.rules.push(RuleTrace {
            path,
            documentation: rule.documentation.clone(),
            conditions: Vec::new(),
            outcome: RuleOutcome::Skipped,
        });
    }

    fn on_condition(&mut self, condition: &Condition, result: &Result<Value>) {
        if let Some(&current) = self.stack.last() {
            self.trace.rules[current].conditions.push(ConditionTrace {
                condition: condition.expr.to_string(),
                result: result.clone().map_err(|err| err.to_string()),
            });
        }
    }

    fn on_rule_exit(&mut self, result: &Result<Option<Endpoint>>) {
        if let Some(current) = self.stack.pop() {
            self.trace.rules[current].outcome = match result {
                Ok(None) => RuleOutcome::Skipped,
                Ok(Some(_)) => RuleOutcome::Resolved,
                Err(err) => RuleOutcome::Failed(err.to_string()),
            };
        }
    }
}

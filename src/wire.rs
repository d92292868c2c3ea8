//! JSON representation of rule sets.
//!
//! Wire types mirror the document structure and are compiled into the typed rule tree. Anything
//! that deserializes but doesn't make sense as a rule (unknown function, wrong arity, malformed
//! template) fails compilation with [`Error::InvalidRuleSet`].
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    functions::Function,
    params::Parameters,
    rules::{Condition, EndpointTemplate, Rule, RuleKind, RuleSet},
    Error, Expr, Result,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RuleSetWire {
    version: String,
    #[serde(default)]
    parameters: Parameters,
    rules: Vec<RuleWire>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RuleWire {
    Endpoint {
        #[serde(default)]
        conditions: Vec<ConditionWire>,
        endpoint: EndpointWire,
        #[serde(default)]
        documentation: Option<String>,
    },
    Error {
        #[serde(default)]
        conditions: Vec<ConditionWire>,
        error: ExprWire,
        #[serde(default)]
        documentation: Option<String>,
    },
    Tree {
        #[serde(default)]
        conditions: Vec<ConditionWire>,
        rules: Vec<RuleWire>,
        #[serde(default)]
        documentation: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ConditionWire {
    #[serde(rename = "fn")]
    function: String,
    argv: Vec<ExprWire>,
    #[serde(default)]
    assign: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EndpointWire {
    url: ExprWire,
    #[serde(default)]
    headers: BTreeMap<String, Vec<ExprWire>>,
    #[serde(default)]
    properties: BTreeMap<String, ExprWire>,
}

/// Expression. Order of variants matters: objects are references or function calls when they
/// have the corresponding keys, and record literals otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExprWire {
    Ref {
        #[serde(rename = "ref")]
        reference: String,
    },
    Call {
        #[serde(rename = "fn")]
        function: String,
        argv: Vec<ExprWire>,
    },
    Boolean(bool),
    Integer(i64),
    String(String),
    Array(Vec<ExprWire>),
    Record(BTreeMap<String, ExprWire>),
}

impl RuleSetWire {
    pub(crate) fn compile(self) -> Result<RuleSet> {
        let rules = self
            .rules
            .into_iter()
            .map(RuleWire::compile)
            .collect::<Result<_>>()?;
        RuleSet::new(self.version, self.parameters, rules)
    }
}

impl TryFrom<RuleSetWire> for RuleSet {
    type Error = Error;

    fn try_from(wire: RuleSetWire) -> Result<RuleSet> {
        wire.compile()
    }
}

impl RuleWire {
    fn compile(self) -> Result<Rule> {
        let (conditions, kind, documentation) = match self {
            RuleWire::Endpoint {
                conditions,
                endpoint,
                documentation,
            } => (conditions, RuleKind::Endpoint(endpoint.compile()?), documentation),
            RuleWire::Error {
                conditions,
                error,
                documentation,
            } => (conditions, RuleKind::Error(error.compile()?), documentation),
            RuleWire::Tree {
                conditions,
                rules,
                documentation,
            } => {
                let rules = rules
                    .into_iter()
                    .map(RuleWire::compile)
                    .collect::<Result<_>>()?;
                (conditions, RuleKind::Tree(rules), documentation)
            }
        };

        Ok(Rule {
            conditions: conditions
                .into_iter()
                .map(ConditionWire::compile)
                .collect::<Result<_>>()?,
            kind,
            documentation,
        })
    }
}

impl ConditionWire {
    fn compile(self) -> Result<Condition> {
        let expr = compile_call(&self.function, self.argv)?;
        Ok(Condition {
            expr,
            assign: self.assign.map(Into::into),
        })
    }
}

impl EndpointWire {
    fn compile(self) -> Result<EndpointTemplate> {
        let mut endpoint = EndpointTemplate::new(self.url.compile()?);
        for (name, values) in self.headers {
            for value in values {
                endpoint = endpoint.with_header(name.clone(), value.compile()?);
            }
        }
        for (name, value) in self.properties {
            endpoint = endpoint.with_property(name, value.compile()?);
        }
        Ok(endpoint)
    }
}

impl ExprWire {
    fn compile(self) -> Result<Expr> {
        Ok(match self {
            ExprWire::Ref { reference } => Expr::reference(reference),
            ExprWire::Call { function, argv } => compile_call(&function, argv)?,
            ExprWire::Boolean(b) => Expr::boolean(b),
            ExprWire::Integer(n) => Expr::integer(n),
            ExprWire::String(s) => Expr::template(&s)?,
            ExprWire::Array(items) => Expr::array(
                items
                    .into_iter()
                    .map(ExprWire::compile)
                    .collect::<Result<_>>()?,
            ),
            ExprWire::Record(fields) => Expr::record(
                fields
                    .into_iter()
                    .map(|(name, value)| Ok((name.into(), value.compile()?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

fn compile_call(name: &str, argv: Vec<ExprWire>) -> Result<Expr> {
    let function = Function::from_name(name)
        .ok_or_else(|| Error::InvalidRuleSet(format!("unknown function `{name}`")))?;
    let args = argv
        .into_iter()
        .map(ExprWire::compile)
        .collect::<Result<_>>()?;
    Expr::call(function, args)
}

#[cfg(test)]
mod tests {
    use crate::{
        rules::{Condition, EndpointTemplate, Rule, RuleKind},
        Error, Expr, Function, RuleSet,
    };

    #[test]
    fn compiles_rules() {
        let rule_set = RuleSet::from_json(
            r#"{
                "version": "1.0",
                "parameters": {
                    "Region": {"type": "String", "builtIn": "AWS::Region"}
                },
                "rules": [
                    {
                        "type": "endpoint",
                        "documentation": "regional",
                        "conditions": [
                            {"fn": "isSet", "argv": [{"ref": "Region"}]},
                            {"fn": "aws.partition", "argv": [{"ref": "Region"}], "assign": "PartitionResult"}
                        ],
                        "endpoint": {
                            "url": "https://service.{Region}.{PartitionResult#dnsSuffix}",
                            "headers": {"x-region": [{"ref": "Region"}]},
                            "properties": {}
                        }
                    },
                    {
                        "type": "error",
                        "conditions": [],
                        "error": "Region must be set"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(rule_set.version(), "1.0");
        assert_eq!(rule_set.rules().len(), 2);

        let expected = Rule::endpoint(
            vec![
                Expr::call(Function::IsSet, vec![Expr::reference("Region")])
                    .unwrap()
                    .into(),
                Condition::new(
                    Expr::call(Function::Partition, vec![Expr::reference("Region")]).unwrap(),
                )
                .assign("PartitionResult"),
            ],
            EndpointTemplate::new(
                Expr::template("https://service.{Region}.{PartitionResult#dnsSuffix}").unwrap(),
            )
            .with_header("x-region", Expr::reference("Region")),
        )
        .with_documentation("regional");
        assert_eq!(rule_set.rules()[0], expected);
        assert!(matches!(rule_set.rules()[1].kind(), RuleKind::Error(_)));
    }

    #[test]
    fn nested_tree() {
        let rule_set = RuleSet::from_json(
            r#"{
                "version": "1.0",
                "rules": [{
                    "type": "tree",
                    "conditions": [],
                    "rules": [{"type": "endpoint", "conditions": [], "endpoint": {"url": "https://a"}}]
                }]
            }"#,
        )
        .unwrap();
        let RuleKind::Tree(rules) = rule_set.rules()[0].kind() else {
            panic!("expected tree");
        };
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn record_literal_is_not_a_call() {
        let rule_set = RuleSet::from_json(
            r#"{
                "version": "1.0",
                "rules": [{
                    "type": "endpoint",
                    "conditions": [],
                    "endpoint": {
                        "url": "https://a",
                        "properties": {"authSchemes": [{"name": "sigv4", "disableDoubleEncoding": true}]}
                    }
                }]
            }"#,
        );
        assert!(rule_set.is_ok());
    }

    #[test]
    fn unknown_function() {
        let result = RuleSet::from_json(
            r#"{
                "version": "1.0",
                "rules": [{"type": "error", "conditions": [{"fn": "nope", "argv": []}], "error": "x"}]
            }"#,
        );
        assert!(matches!(result, Err(Error::InvalidRuleSet(msg)) if msg.contains("nope")));
    }

    #[test]
    fn wrong_arity() {
        let result = RuleSet::from_json(
            r#"{
                "version": "1.0",
                "rules": [{"type": "error", "conditions": [{"fn": "not", "argv": [true, false]}], "error": "x"}]
            }"#,
        );
        assert!(matches!(result, Err(Error::InvalidRuleSet(_))));
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            RuleSet::from_json(r#"{"version": "1.0", "rules": [{"type": "bogus"}]}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn deserialize_through_serde() {
        let rule_set: RuleSet = serde_json::from_str(
            r#"{"version": "1.0", "rules": [{"type": "error", "error": "unsupported"}]}"#,
        )
        .unwrap();
        assert_eq!(rule_set.rules().len(), 1);
    }
}

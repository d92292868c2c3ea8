//! Parameter declarations of a rule set.
#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Environment, Error, Identifier, Result, Value, ValueType};

/// Type of a rule set parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    #[serde(rename = "String", alias = "string")]
    String,
    #[serde(rename = "Boolean", alias = "boolean")]
    Boolean,
    /// Array of strings.
    #[serde(rename = "StringArray", alias = "stringArray")]
    StringArray,
}

impl ParameterType {
    /// Check that `value` conforms to the type. `None` is accepted by every type.
    pub fn check(self, value: &Value) -> Result<()> {
        const STRING: &[ValueType] = &[ValueType::String];
        const BOOLEAN: &[ValueType] = &[ValueType::Boolean];
        const ARRAY: &[ValueType] = &[ValueType::Array];

        match (self, value) {
            (_, Value::None) => Ok(()),
            (ParameterType::String, Value::String(_)) => Ok(()),
            (ParameterType::Boolean, Value::Boolean(_)) => Ok(()),
            (ParameterType::StringArray, Value::Array(items)) => {
                match items.iter().find(|item| !matches!(item, Value::String(_))) {
                    Some(item) => Err(Error::type_mismatch(STRING, item.ty())),
                    None => Ok(()),
                }
            }
            (ParameterType::String, other) => Err(Error::type_mismatch(STRING, other.ty())),
            (ParameterType::Boolean, other) => Err(Error::type_mismatch(BOOLEAN, other.ty())),
            (ParameterType::StringArray, other) => Err(Error::type_mismatch(ARRAY, other.ty())),
        }
    }
}

/// Value the request pipeline supplies for every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuiltIn {
    /// `AWS::Region`
    Region,
    /// `AWS::UseFIPS`
    UseFips,
    /// `AWS::UseDualStack`
    UseDualStack,
    /// `SDK::Endpoint`, the endpoint override configured on the client.
    Endpoint,
    /// Built-in this crate doesn't supply. Parameters bound to it are left unset.
    Other(String),
}

impl BuiltIn {
    /// Name of the built-in as used in rule sets.
    pub fn name(&self) -> &str {
        match self {
            BuiltIn::Region => "AWS::Region",
            BuiltIn::UseFips => "AWS::UseFIPS",
            BuiltIn::UseDualStack => "AWS::UseDualStack",
            BuiltIn::Endpoint => "SDK::Endpoint",
            BuiltIn::Other(name) => name,
        }
    }
}

impl From<String> for BuiltIn {
    fn from(name: String) -> Self {
        match name.as_str() {
            "AWS::Region" => BuiltIn::Region,
            "AWS::UseFIPS" => BuiltIn::UseFips,
            "AWS::UseDualStack" => BuiltIn::UseDualStack,
            "SDK::Endpoint" => BuiltIn::Endpoint,
            _ => BuiltIn::Other(name),
        }
    }
}

impl From<BuiltIn> for String {
    fn from(built_in: BuiltIn) -> Self {
        built_in.name().to_owned()
    }
}

impl std::fmt::Display for BuiltIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(rename = "type")]
    ty: ParameterType,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    built_in: Option<BuiltIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    documentation: Option<String>,
}

impl Parameter {
    /// Optional parameter of type `ty` without default.
    pub fn new(ty: ParameterType) -> Parameter {
        Parameter {
            ty,
            required: false,
            default: None,
            built_in: None,
            documentation: None,
        }
    }

    pub fn required(mut self) -> Parameter {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Parameter {
        self.default = Some(default.into());
        self
    }

    pub fn with_built_in(mut self, built_in: BuiltIn) -> Parameter {
        self.built_in = Some(built_in);
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Parameter {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn ty(&self) -> ParameterType {
        self.ty
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn built_in(&self) -> Option<&BuiltIn> {
        self.built_in.as_ref()
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }
}

/// Parameters declared by a rule set, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    parameters: BTreeMap<Identifier, Parameter>,
}

impl Parameters {
    pub fn new() -> Parameters {
        Parameters::default()
    }

    /// Declare parameter `name`, replacing a previous declaration.
    pub fn with(mut self, name: impl Into<Identifier>, parameter: Parameter) -> Parameters {
        self.parameters.insert(name.into(), parameter);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Parameter)> {
        self.parameters.iter()
    }

    /// Parameters bound to a built-in.
    pub fn built_ins(&self) -> impl Iterator<Item = (&BuiltIn, &Identifier)> {
        self.parameters
            .iter()
            .filter_map(|(name, parameter)| Some((parameter.built_in.as_ref()?, name)))
    }

    /// Check that defaults match the declared types.
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, parameter) in &self.parameters {
            if let Some(default) = &parameter.default {
                parameter.ty.check(default).map_err(|err| {
                    Error::InvalidRuleSet(format!("invalid default for parameter `{name}`: {err}"))
                })?;
            }
        }
        Ok(())
    }

    /// Produce the environment the rules are evaluated in.
    ///
    /// Every declared parameter is bound: to the supplied value, to its default, or to
    /// [`Value::None`]. Supplied values for undeclared names are dropped.
    pub fn bind(&self, supplied: &Environment) -> Result<Environment> {
        for (name, value) in supplied.iter() {
            if !self.parameters.contains_key(name.as_str()) {
                log::debug!(target: "endpoint_rules",
                            parameter = name,
                            value:serde = value;
                            "ignoring undeclared parameter");
            }
        }

        self.parameters
            .iter()
            .map(|(name, parameter)| {
                let value = match supplied.get(name) {
                    Some(value) if !value.is_none() => value.clone(),
                    _ => parameter.default.clone().unwrap_or(Value::None),
                };
                if value.is_none() && parameter.required {
                    return Err(Error::MissingRequiredParameter(name.clone()));
                }
                parameter.ty.check(&value)?;
                Ok((name.clone(), value))
            })
            .collect()
    }
}

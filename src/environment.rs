#![allow(missing_docs)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Identifier, Value};

/// Immutable name→value bindings available during one resolution.
///
/// # Examples
/// ```
/// # use endpoint_rules::Environment;
/// let environment = Environment::new()
///     .with("Region", "us-west-2")
///     .with("UseFIPS", false);
/// assert_eq!(environment.get("Region").and_then(|v| v.as_str()), Some("us-west-2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    values: HashMap<Identifier, Value>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Environment {
        Environment::default()
    }

    /// Return a new environment with `name` bound to `value`, replacing a previous binding.
    pub fn with(mut self, name: impl Into<Identifier>, value: impl Into<Value>) -> Environment {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<Identifier, Value>> for Environment {
    fn from(values: HashMap<Identifier, Value>) -> Self {
        Environment { values }
    }
}

impl<K: Into<Identifier>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Environment {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Lookup scope for a single rule.
///
/// Bindings made by a rule's conditions (`assign`) are visible to the rest of that rule, its
/// outcome, and nested rules. They never leak into sibling rules and never modify the
/// [`Environment`].
pub(crate) struct Scope<'a> {
    environment: &'a Environment,
    parent: Option<&'a Scope<'a>>,
    locals: Vec<(Identifier, Value)>,
}

impl<'a> Scope<'a> {
    pub fn new(environment: &'a Environment) -> Scope<'a> {
        Scope {
            environment,
            parent: None,
            locals: Vec::new(),
        }
    }

    pub fn child(&self) -> Scope<'_> {
        Scope {
            environment: self.environment,
            parent: Some(self),
            locals: Vec::new(),
        }
    }

    pub fn bind(&mut self, name: Identifier, value: Value) {
        self.locals.push((name, value));
    }

    /// Look up `name`, innermost binding first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let local = self
            .locals
            .iter()
            .rev()
            .find(|(local, _)| local.as_str() == name)
            .map(|(_, value)| value);
        match (local, self.parent) {
            (Some(value), _) => Some(value),
            (None, Some(parent)) => parent.get(name),
            (None, None) => self.environment.get(name),
        }
    }
}

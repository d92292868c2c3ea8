//! Names used by the engine: parameters, record fields, and rule-local bindings.
use std::{borrow::Borrow, sync::Arc};

use serde::{Deserialize, Serialize};

/// `Identifier` is an immutable name that can be cloned cheaply.
///
/// Equality and hashing are by string content, so a `HashMap<Identifier, _>` can be queried with
/// a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Identifier(Arc<str>);

impl Identifier {
    /// Create a new identifier.
    pub fn new(name: impl Into<Arc<str>>) -> Identifier {
        Identifier(name.into())
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T: Into<Arc<str>>> From<T> for Identifier {
    fn from(value: T) -> Identifier {
        Identifier(value.into())
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for Identifier {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl log::kv::ToValue for Identifier {
    fn to_value(&self) -> log::kv::Value {
        log::kv::Value::from_display(self)
    }
}

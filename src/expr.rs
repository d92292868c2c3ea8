//! Expression AST.
//!
//! Expressions are validated on construction (function arity, templates, literal `getAttr`
//! paths), so evaluation only fails on runtime conditions: type mismatches, unresolved
//! references, and missing attributes.
#![allow(missing_docs)]

use std::fmt::Write as _;

use crate::{
    environment::Scope,
    functions::{AttrPath, Function},
    Error, Identifier, Result, Value,
};

/// Expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Literal),
    /// Reference to a parameter or a rule-local binding.
    Ref(Identifier),
    Call(FnCall),
}

/// Literal value. Strings are templates and may reference other values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    String(Template),
    Boolean(bool),
    Integer(i64),
    Array(Vec<Expr>),
    Record(Vec<(Identifier, Expr)>),
}

/// Function application. Arity is checked on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnCall {
    function: Function,
    args: Vec<Expr>,
}

impl FnCall {
    /// Create a new function call, checking arity.
    pub fn new(function: Function, args: Vec<Expr>) -> Result<FnCall> {
        if args.len() != function.arity() {
            return Err(Error::InvalidRuleSet(format!(
                "{function} expects {} arguments, got {}",
                function.arity(),
                args.len()
            )));
        }

        // Literal paths are validated early so that a typo fails when the rule set is built
        // rather than when a rare branch is taken.
        if function == Function::GetAttr {
            if let Expr::Literal(Literal::String(template)) = &args[1] {
                if let Some(path) = template.as_static() {
                    AttrPath::parse(path)?;
                }
            }
        }

        Ok(FnCall { function, args })
    }

    pub fn function(&self) -> Function {
        self.function
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    fn eval(&self, scope: &Scope<'_>) -> Result<Value> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.eval(scope))
            .collect::<Result<Vec<_>>>()?;
        self.function.call(&args)
    }
}

impl Expr {
    /// Reference to a parameter or rule-local binding.
    pub fn reference(name: impl Into<Identifier>) -> Expr {
        Expr::Ref(name.into())
    }

    /// String template, e.g., `"https://service.{Region}.amazonaws.com"`.
    ///
    /// Fails if the template is malformed.
    pub fn template(template: &str) -> Result<Expr> {
        Ok(Expr::Literal(Literal::String(Template::parse(template)?)))
    }

    pub fn boolean(value: bool) -> Expr {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn integer(value: i64) -> Expr {
        Expr::Literal(Literal::Integer(value))
    }

    pub fn array(items: Vec<Expr>) -> Expr {
        Expr::Literal(Literal::Array(items))
    }

    pub fn record(fields: Vec<(Identifier, Expr)>) -> Expr {
        Expr::Literal(Literal::Record(fields))
    }

    /// Function call. Fails if the number of arguments doesn't match the function arity.
    pub fn call(function: Function, args: Vec<Expr>) -> Result<Expr> {
        Ok(Expr::Call(FnCall::new(function, args)?))
    }

    pub(crate) fn eval(&self, scope: &Scope<'_>) -> Result<Value> {
        match self {
            Expr::Literal(literal) => literal.eval(scope),
            Expr::Ref(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnresolvedReference(name.clone())),
            Expr::Call(call) => call.eval(scope),
        }
    }
}

impl Literal {
    fn eval(&self, scope: &Scope<'_>) -> Result<Value> {
        Ok(match self {
            Literal::String(template) => Value::String(template.eval(scope)?),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.eval(scope))
                    .collect::<Result<_>>()?,
            ),
            Literal::Record(fields) => Value::Record(
                fields
                    .iter()
                    .map(|(name, expr)| Ok((name.clone(), expr.eval(scope)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// String template.
///
/// `{Name}` interpolates a string value, `{Name#path}` interpolates `getAttr(Name, "path")`.
/// `{{` and `}}` produce literal braces. Interpolated values must be strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Static(String),
    Dynamic { source: String, expr: Expr },
}

impl Template {
    /// Parse `template`.
    pub fn parse(template: &str) -> Result<Template> {
        let invalid = |reason: &str| {
            Error::InvalidRuleSet(format!("invalid template `{template}`: {reason}"))
        };

        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = template.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().map(|&(_, c)| c) == Some('}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let rest = &template[i + 1..];
                    let end = rest.find('}').ok_or_else(|| invalid("unclosed `{`"))?;
                    let source = &rest[..end];
                    let expr = Template::parse_dynamic(source).ok_or_else(|| {
                        invalid("interpolation must be `{name}` or `{name#path}`")
                    })??;
                    if !text.is_empty() {
                        parts.push(TemplatePart::Static(std::mem::take(&mut text)));
                    }
                    parts.push(TemplatePart::Dynamic {
                        source: source.to_owned(),
                        expr,
                    });
                    // Skip the interpolation and the closing brace.
                    for _ in 0..=source.chars().count() {
                        chars.next();
                    }
                }
                '}' => return Err(invalid("unmatched `}`")),
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Static(text));
        }

        Ok(Template { parts })
    }

    /// Parse the inside of `{...}`. Returns `None` if it is not a valid interpolation.
    fn parse_dynamic(source: &str) -> Option<Result<Expr>> {
        let (name, path) = match source.split_once('#') {
            Some((name, path)) => (name, Some(path)),
            None => (source, None),
        };
        let is_name = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !is_name(name) || path.is_some_and(str::is_empty) {
            return None;
        }

        let reference = Expr::reference(name);
        Some(match path {
            None => Ok(reference),
            Some(path) => Expr::call(
                Function::GetAttr,
                vec![
                    reference,
                    Expr::Literal(Literal::String(Template {
                        parts: vec![TemplatePart::Static(path.to_owned())],
                    })),
                ],
            ),
        })
    }

    /// Return the template text if it has no interpolations.
    pub fn as_static(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [TemplatePart::Static(s)] => Some(s),
            _ => None,
        }
    }

    fn eval(&self, scope: &Scope<'_>) -> Result<String> {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Static(s) => result.push_str(s),
                TemplatePart::Dynamic { expr, .. } => {
                    result.push_str(expr.eval(scope)?.expect_string()?);
                }
            }
        }
        Ok(result)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('"')?;
        for part in &self.parts {
            match part {
                TemplatePart::Static(s) => {
                    f.write_str(&s.replace('{', "{{").replace('}', "}}"))?
                }
                TemplatePart::Dynamic { source, .. } => write!(f, "{{{source}}}")?,
            }
        }
        f.write_char('"')
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{literal}"),
            Expr::Ref(name) => write!(f, "{name}"),
            Expr::Call(call) => {
                write!(f, "{}(", call.function)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_char(')')
            }
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::String(template) => write!(f, "{template}"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Array(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Literal::Record(fields) => {
                f.write_char('{')?;
                for (i, (name, expr)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {expr}")?;
                }
                f.write_char('}')
            }
        }
    }
}

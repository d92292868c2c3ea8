//! Endpoint rules engine for service client libraries.
//!
//! # Overview
//!
//! Client libraries pick, per request, which network endpoint to send the request to. The decision
//! is described by a [`RuleSet`]: an ordered tree of rules, each with a list of conditions and an
//! outcome. Rules are evaluated in order against an [`Environment`] of parameters (region, FIPS and
//! dual-stack flags, request members), and the first rule whose conditions all hold produces an
//! [`Endpoint`] or an error.
//!
//! Conditions and outcomes are expressions over a small typed value model ([`Value`]) and a
//! closed library of pure functions ([`Function`]): `isSet`, `booleanEquals`, `getAttr`,
//! `aws.parseArn`, `aws.partition`, and friends.
//!
//! Rule sets are usually loaded from their JSON document with [`RuleSet::from_json`] and shared
//! through a [`ProviderRegistry`]. [`ResolveEndpointInterceptor`] assembles parameters for each
//! request and stores the resolved endpoint in [`ExecutionAttributes`].
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! [`Error::RuleDefined`] is produced when the rule set explicitly rejects the parameters (e.g.,
//! FIPS requested in a partition that doesn't support it). Its message is meant for the user and
//! should be surfaced as-is. All other errors indicate a defect in the rule set or in the way it
//! is invoked.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `endpoint_rules` target. Per-rule evaluation is logged at `trace` level.
//!
//! # Examples
//!
//! Examples can be found in the `demos` directory of the crate repository.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod arn;
mod config;
mod environment;
mod error;
mod eval;
mod expr;
mod functions;
mod identifier;
mod interceptor;
mod params;
mod partitions;
mod registry;
mod rules;
mod value;
mod wire;

pub use arn::Arn;
pub use config::ClientConfig;
pub use environment::Environment;
pub use error::{Error, Result};
pub use eval::{
    evaluate_rules, resolve_endpoint, resolve_endpoint_with_trace, ConditionTrace,
    ResolutionTrace, RuleOutcome, RuleTrace,
};
pub use expr::{Expr, FnCall, Literal, Template};
pub use functions::Function;
pub use identifier::Identifier;
pub use interceptor::{
    ContextParamSource, EndpointProvider, ExecutionAttributes, ResolveEndpointInterceptor,
    ServiceEndpointMetadata,
};
pub use params::{BuiltIn, Parameter, ParameterType, Parameters};
pub use partitions::{PartitionOutputs, Partitions};
pub use registry::ProviderRegistry;
pub use rules::{Condition, EndpointTemplate, Rule, RuleKind, RuleSet};
pub use value::{Endpoint, Record, Value, ValueType};

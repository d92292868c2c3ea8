//! Partition metadata backing the `aws.partition` function.
//!
//! The built-in table is embedded at compile time and parsed once on first use.
use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Value};

/// Partition that does not match any region is resolved through this one.
const DEFAULT_PARTITION: &str = "aws";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionsWire {
    partitions: Vec<PartitionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionWire {
    id: String,
    region_regex: String,
    #[serde(default)]
    regions: HashMap<String, OutputsOverride>,
    outputs: PartitionOutputs,
}

/// Partition attributes returned by `aws.partition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PartitionOutputs {
    pub name: String,
    pub dns_suffix: String,
    pub dual_stack_dns_suffix: String,
    #[serde(rename = "supportsFIPS")]
    pub supports_fips: bool,
    pub supports_dual_stack: bool,
    pub implicit_global_region: String,
}

/// Per-region overrides of partition outputs. Missing fields are inherited from the partition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputsOverride {
    dns_suffix: Option<String>,
    dual_stack_dns_suffix: Option<String>,
    #[serde(rename = "supportsFIPS")]
    supports_fips: Option<bool>,
    supports_dual_stack: Option<bool>,
}

impl PartitionOutputs {
    fn with_override(&self, o: &OutputsOverride) -> PartitionOutputs {
        PartitionOutputs {
            name: self.name.clone(),
            dns_suffix: o.dns_suffix.clone().unwrap_or_else(|| self.dns_suffix.clone()),
            dual_stack_dns_suffix: o
                .dual_stack_dns_suffix
                .clone()
                .unwrap_or_else(|| self.dual_stack_dns_suffix.clone()),
            supports_fips: o.supports_fips.unwrap_or(self.supports_fips),
            supports_dual_stack: o.supports_dual_stack.unwrap_or(self.supports_dual_stack),
            implicit_global_region: self.implicit_global_region.clone(),
        }
    }
}

impl From<PartitionOutputs> for Value {
    fn from(outputs: PartitionOutputs) -> Value {
        Value::Record(
            [
                ("name".into(), outputs.name.into()),
                ("dnsSuffix".into(), outputs.dns_suffix.into()),
                (
                    "dualStackDnsSuffix".into(),
                    outputs.dual_stack_dns_suffix.into(),
                ),
                ("supportsFIPS".into(), outputs.supports_fips.into()),
                ("supportsDualStack".into(), outputs.supports_dual_stack.into()),
                (
                    "implicitGlobalRegion".into(),
                    outputs.implicit_global_region.into(),
                ),
            ]
            .into(),
        )
    }
}

#[derive(Debug)]
struct Partition {
    id: String,
    region_regex: Regex,
    regions: HashMap<String, OutputsOverride>,
    outputs: PartitionOutputs,
}

/// Ordered list of partitions.
#[derive(Debug)]
pub struct Partitions {
    partitions: Vec<Partition>,
}

impl Partitions {
    /// Parse partition table from JSON.
    pub fn from_json(json: &str) -> Result<Partitions> {
        let wire: PartitionsWire = serde_json::from_str(json)
            .map_err(|err| Error::InvalidPartitionData(err.to_string()))?;

        let partitions = wire
            .partitions
            .into_iter()
            .map(|partition| {
                let region_regex = Regex::new(&partition.region_regex).map_err(|err| {
                    Error::InvalidPartitionData(format!(
                        "invalid region regex for partition {}: {err}",
                        partition.id
                    ))
                })?;
                Ok(Partition {
                    id: partition.id,
                    region_regex,
                    regions: partition.regions,
                    outputs: partition.outputs,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Partitions { partitions })
    }

    /// Built-in partition table.
    pub fn builtin() -> Result<&'static Partitions> {
        static BUILTIN: OnceLock<Result<Partitions>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                let partitions = Partitions::from_json(include_str!("partitions.json"));
                match &partitions {
                    Ok(p) => log::debug!(target: "endpoint_rules",
                                         count = p.partitions.len();
                                         "loaded built-in partitions"),
                    Err(err) => log::warn!(target: "endpoint_rules",
                                           "failed to load built-in partitions: {err}"),
                }
                partitions
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Find partition for `region`.
    ///
    /// Explicitly listed regions are checked first, then region regexes in order. Regions that
    /// don't match anything fall back to the `aws` partition.
    pub fn resolve(&self, region: &str) -> Option<PartitionOutputs> {
        let explicit = self.partitions.iter().find_map(|partition| {
            partition
                .regions
                .get(region)
                .map(|o| partition.outputs.with_override(o))
        });
        if explicit.is_some() {
            return explicit;
        }

        self.partitions
            .iter()
            .find(|partition| partition.region_regex.is_match(region))
            .or_else(|| {
                self.partitions
                    .iter()
                    .find(|partition| partition.id == DEFAULT_PARTITION)
            })
            .map(|partition| partition.outputs.clone())
    }
}

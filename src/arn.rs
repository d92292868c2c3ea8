//! Amazon Resource Name parser.
use serde::Serialize;

/// Parsed ARN: `arn:partition:service:region:account-id:resource`.
///
/// `Arn` can only be constructed by [`Arn::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arn {
    partition: String,
    service: String,
    region: String,
    account_id: String,
    resource: Vec<String>,
}

impl Arn {
    /// Parse `arn`, returning `None` if it is not a structurally valid ARN.
    ///
    /// The resource part is split into segments on `/` if it contains one, otherwise on `:`.
    /// Mixed-separator resources are not split further: `outpost/op-01:bucket` yields
    /// `["outpost", "op-01:bucket"]`. Empty segments are preserved.
    ///
    /// ```
    /// # use endpoint_rules::Arn;
    /// let arn = Arn::parse("arn:aws:s3:us-west-2:123456789012:accesspoint/my-ap").unwrap();
    /// assert_eq!(arn.service(), "s3");
    /// assert_eq!(arn.resource(), ["accesspoint", "my-ap"]);
    ///
    /// assert_eq!(Arn::parse("arn:aws:s3"), None);
    /// ```
    pub fn parse(arn: &str) -> Option<Arn> {
        let mut parts = arn.splitn(6, ':');
        let (
            Some("arn"),
            Some(partition),
            Some(service),
            Some(region),
            Some(account_id),
            Some(resource),
        ) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        )
        else {
            return None;
        };

        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return None;
        }

        let separator = if resource.contains('/') { '/' } else { ':' };

        Some(Arn {
            partition: partition.to_owned(),
            service: service.to_owned(),
            region: region.to_owned(),
            account_id: account_id.to_owned(),
            resource: resource.split(separator).map(str::to_owned).collect(),
        })
    }

    /// Partition, e.g. `aws` or `aws-cn`.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Service namespace, e.g. `s3`.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region; empty for global resources.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Account id; may be empty.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Resource segments.
    pub fn resource(&self) -> &[String] {
        &self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::Arn;

    #[test]
    fn iam_role() {
        let arn = Arn::parse("arn:aws:iam::123456789012:role/test").unwrap();
        assert_eq!(arn.partition(), "aws");
        assert_eq!(arn.service(), "iam");
        assert_eq!(arn.region(), "");
        assert_eq!(arn.account_id(), "123456789012");
        assert_eq!(arn.resource(), ["role", "test"]);
    }

    #[test]
    fn round_trip_fields() {
        for (partition, service, region, account) in [
            ("aws", "s3", "us-west-2", "123456789012"),
            ("aws-cn", "sqs", "cn-north-1", ""),
            ("aws-us-gov", "s3-outposts", "", "999"),
        ] {
            let text = format!("arn:{partition}:{service}:{region}:{account}:res");
            let arn = Arn::parse(&text).unwrap();
            let rendered = format!(
                "arn:{}:{}:{}:{}:res",
                arn.partition(),
                arn.service(),
                arn.region(),
                arn.account_id()
            );
            assert_eq!(rendered, text);
        }
    }

    #[test]
    fn colon_resource() {
        let arn = Arn::parse("arn:aws:sns:us-east-1:123456789012:topic:subscription").unwrap();
        assert_eq!(arn.resource(), ["topic", "subscription"]);
    }

    #[test]
    fn slash_wins_over_colon() {
        let arn = Arn::parse("arn:aws:s3:us-west-2:123:outpost/op-01:bucket").unwrap();
        assert_eq!(arn.resource(), ["outpost", "op-01:bucket"]);
    }

    #[test]
    fn empty_segments_preserved() {
        let arn = Arn::parse("arn:aws:s3:::/bucket//key").unwrap();
        assert_eq!(arn.resource(), ["", "bucket", "", "key"]);
    }

    #[test]
    fn invalid() {
        assert_eq!(Arn::parse(""), None);
        assert_eq!(Arn::parse("arn"), None);
        assert_eq!(Arn::parse("arn:aws:s3:us-west-2:123"), None);
        assert_eq!(Arn::parse("arn:aws:s3:us-west-2:123:"), None);
        assert_eq!(Arn::parse("urn:aws:s3:us-west-2:123:bucket"), None);
        assert_eq!(Arn::parse("arn::s3:us-west-2:123:bucket"), None);
        assert_eq!(Arn::parse("arn:aws::us-west-2:123:bucket"), None);
        assert_eq!(Arn::parse("not an arn at all"), None);
    }
}

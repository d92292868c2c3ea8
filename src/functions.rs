//! Library of functions available to rule sets.
//!
//! Every function is pure and has a fixed arity. Each argument position declares the value types
//! it accepts. Arguments are checked before the function is applied, so function bodies only
//! deal with well-typed values.
use std::{net::IpAddr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::{partitions::Partitions, Arn, Error, Identifier, Record, Result, Value, ValueType};

const STRING: &[ValueType] = &[ValueType::String];
const BOOLEAN: &[ValueType] = &[ValueType::Boolean];
const INTEGER: &[ValueType] = &[ValueType::Integer];
const INDEXABLE: &[ValueType] = &[ValueType::Record, ValueType::Array];

/// Closed set of functions the engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    /// `isSet(value)`: `true` if value is not `None`.
    #[serde(rename = "isSet")]
    IsSet,
    /// `not(bool)`
    #[serde(rename = "not")]
    Not,
    /// `booleanEquals(bool, bool)`
    #[serde(rename = "booleanEquals")]
    BooleanEquals,
    /// `stringEquals(string, string)`
    #[serde(rename = "stringEquals")]
    StringEquals,
    /// `getAttr(record | array, path)`: navigate `a.b[2]`-style paths.
    #[serde(rename = "getAttr")]
    GetAttr,
    /// `substring(string, start, stop, reverse)`
    #[serde(rename = "substring")]
    Substring,
    /// `parseArn(string)`: parse ARN into a record, or `None`.
    #[serde(rename = "aws.parseArn", alias = "parseArn")]
    ParseArn,
    /// `parseURL(string)`: parse URL into a record, or `None`.
    #[serde(rename = "parseURL")]
    ParseUrl,
    /// `uriEncode(string)`: RFC 3986 percent-encoding.
    #[serde(rename = "uriEncode")]
    UriEncode,
    /// `isValidHostLabel(string, allowSubDomains)`
    #[serde(rename = "isValidHostLabel")]
    IsValidHostLabel,
    /// `aws.partition(region)`: partition attributes of a region, or `None`.
    #[serde(rename = "aws.partition")]
    Partition,
    /// `aws.isVirtualHostableS3Bucket(string, allowSubDomains)`
    #[serde(rename = "aws.isVirtualHostableS3Bucket")]
    IsVirtualHostableS3Bucket,
}

impl Function {
    /// All functions.
    pub const ALL: &'static [Function] = &[
        Function::IsSet,
        Function::Not,
        Function::BooleanEquals,
        Function::StringEquals,
        Function::GetAttr,
        Function::Substring,
        Function::ParseArn,
        Function::ParseUrl,
        Function::UriEncode,
        Function::IsValidHostLabel,
        Function::Partition,
        Function::IsVirtualHostableS3Bucket,
    ];

    /// Look up function by the name used in rule sets.
    pub fn from_name(name: &str) -> Option<Function> {
        match name {
            // parseArn is accepted without namespace too.
            "parseArn" => Some(Function::ParseArn),
            _ => Function::ALL.iter().copied().find(|f| f.name() == name),
        }
    }

    /// Name of the function as used in rule sets.
    pub fn name(self) -> &'static str {
        match self {
            Function::IsSet => "isSet",
            Function::Not => "not",
            Function::BooleanEquals => "booleanEquals",
            Function::StringEquals => "stringEquals",
            Function::GetAttr => "getAttr",
            Function::Substring => "substring",
            Function::ParseArn => "aws.parseArn",
            Function::ParseUrl => "parseURL",
            Function::UriEncode => "uriEncode",
            Function::IsValidHostLabel => "isValidHostLabel",
            Function::Partition => "aws.partition",
            Function::IsVirtualHostableS3Bucket => "aws.isVirtualHostableS3Bucket",
        }
    }

    /// Argument types accepted by the function, one entry per position.
    pub fn signature(self) -> &'static [&'static [ValueType]] {
        match self {
            Function::IsSet => &[ValueType::ANY],
            Function::Not => &[BOOLEAN],
            Function::BooleanEquals => &[BOOLEAN, BOOLEAN],
            Function::StringEquals => &[STRING, STRING],
            Function::GetAttr => &[INDEXABLE, STRING],
            Function::Substring => &[STRING, INTEGER, INTEGER, BOOLEAN],
            Function::ParseArn => &[STRING],
            Function::ParseUrl => &[STRING],
            Function::UriEncode => &[STRING],
            Function::IsValidHostLabel => &[STRING, BOOLEAN],
            Function::Partition => &[STRING],
            Function::IsVirtualHostableS3Bucket => &[STRING, BOOLEAN],
        }
    }

    /// Number of arguments the function takes.
    pub fn arity(self) -> usize {
        self.signature().len()
    }

    /// Check argument types and apply the function.
    pub fn call(self, args: &[Value]) -> Result<Value> {
        let signature = self.signature();
        if args.len() != signature.len() {
            return Err(Error::InvalidRuleSet(format!(
                "{} expects {} arguments, got {}",
                self.name(),
                signature.len(),
                args.len()
            )));
        }
        for (arg, accepted) in args.iter().zip(signature.iter().copied()) {
            if !accepted.contains(&arg.ty()) {
                log::trace!(target: "endpoint_rules",
                            function = self.name(),
                            found:display = arg.ty();
                            "argument type mismatch");
                return Err(Error::type_mismatch(accepted, arg.ty()));
            }
        }

        match self {
            Function::IsSet => Ok(Value::Boolean(!args[0].is_none())),
            Function::Not => Ok(Value::Boolean(!args[0].expect_bool()?)),
            Function::BooleanEquals => Ok(Value::Boolean(
                args[0].expect_bool()? == args[1].expect_bool()?,
            )),
            Function::StringEquals => Ok(Value::Boolean(
                args[0].expect_string()? == args[1].expect_string()?,
            )),
            Function::GetAttr => {
                let path = AttrPath::parse(args[1].expect_string()?)?;
                path.get(&args[0])
            }
            Function::Substring => Ok(substring(
                args[0].expect_string()?,
                args[1].expect_integer()?,
                args[2].expect_integer()?,
                args[3].expect_bool()?,
            )
            .map_or(Value::None, |s| Value::String(s.to_owned()))),
            Function::ParseArn => Ok(parse_arn(args[0].expect_string()?)),
            Function::ParseUrl => Ok(parse_url(args[0].expect_string()?)),
            Function::UriEncode => Ok(Value::String(uri_encode(args[0].expect_string()?))),
            Function::IsValidHostLabel => Ok(Value::Boolean(is_valid_host_label(
                args[0].expect_string()?,
                args[1].expect_bool()?,
            ))),
            Function::Partition => {
                let region = args[0].expect_string()?;
                if region.is_empty() {
                    return Ok(Value::None);
                }
                Ok(Partitions::builtin()?.resolve(region).into())
            }
            Function::IsVirtualHostableS3Bucket => Ok(Value::Boolean(
                is_virtual_hostable_s3_bucket(args[0].expect_string()?, args[1].expect_bool()?),
            )),
        }
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed `getAttr` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrPath(Vec<PathPart>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPart {
    Key(Identifier),
    Index(usize),
}

impl AttrPath {
    /// Parse `a.b[2]`-style path.
    pub fn parse(path: &str) -> Result<AttrPath> {
        let invalid = || Error::InvalidRuleSet(format!("invalid attribute path `{path}`"));

        let mut parts = Vec::new();
        for (i, component) in path.split('.').enumerate() {
            let (key, index) = match component.find('[') {
                Some(start) => {
                    let index = component[start..]
                        .strip_prefix('[')
                        .and_then(|rest| rest.strip_suffix(']'))
                        .and_then(|index| index.parse::<usize>().ok())
                        .ok_or_else(invalid)?;
                    (&component[..start], Some(index))
                }
                None => (component, None),
            };

            // Path must start with a key; `a.[0]` is the same as `a[0]`.
            if key.is_empty() && (i == 0 || index.is_none()) {
                return Err(invalid());
            }
            if !key.is_empty() {
                parts.push(PathPart::Key(key.into()));
            }
            if let Some(index) = index {
                parts.push(PathPart::Index(index));
            }
        }

        Ok(AttrPath(parts))
    }

    /// Follow the path from `value`.
    ///
    /// A missing record field is an error. Indexing past the end of an array yields `None`.
    pub fn get(&self, value: &Value) -> Result<Value> {
        let mut current = value;
        for part in &self.0 {
            match part {
                PathPart::Key(key) => {
                    current = current
                        .expect_record()?
                        .get(key)
                        .ok_or_else(|| Error::AttributeNotFound(key.clone()))?;
                }
                PathPart::Index(index) => match current.expect_array()?.get(*index) {
                    Some(v) => current = v,
                    None => return Ok(Value::None),
                },
            }
        }
        Ok(current.clone())
    }
}

fn substring(s: &str, start: i64, stop: i64, reverse: bool) -> Option<&str> {
    if !s.is_ascii() {
        return None;
    }
    let len = s.len();
    let start = usize::try_from(start).ok()?;
    let stop = usize::try_from(stop).ok()?;
    if start >= stop || stop > len {
        return None;
    }
    if reverse {
        Some(&s[len - stop..len - start])
    } else {
        Some(&s[start..stop])
    }
}

fn parse_arn(s: &str) -> Value {
    let Some(arn) = Arn::parse(s) else {
        return Value::None;
    };
    let record: Record = [
        ("partition".into(), arn.partition().into()),
        ("service".into(), arn.service().into()),
        ("region".into(), arn.region().into()),
        ("accountId".into(), arn.account_id().into()),
        (
            "resourceId".into(),
            Value::Array(arn.resource().iter().map(|s| s.as_str().into()).collect()),
        ),
    ]
    .into();
    Value::Record(record)
}

fn parse_url(s: &str) -> Value {
    let Ok(url) = Url::parse(s) else {
        return Value::None;
    };
    if url.query().is_some() || url.fragment().is_some() {
        return Value::None;
    }
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Value::None;
    }

    // `url` normalizes the path (e.g., an empty path becomes "/"), so authority and path are
    // sliced from the input text.
    let Some(rest) = s.get(scheme.len()..).and_then(|rest| rest.strip_prefix("://")) else {
        return Value::None;
    };
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    if rest.contains('\\') || !authority_matches_host(authority, url.host_str()) {
        return Value::None;
    }

    let is_ip = match url.host() {
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => domain.parse::<IpAddr>().is_ok(),
        None => return Value::None,
    };

    let normalized_path = {
        let mut p = String::with_capacity(path.len() + 2);
        if !path.starts_with('/') {
            p.push('/');
        }
        p.push_str(path);
        if !p.ends_with('/') {
            p.push('/');
        }
        p
    };

    Value::Record(
        [
            ("scheme".into(), scheme.into()),
            ("authority".into(), authority.into()),
            ("path".into(), path.into()),
            ("normalizedPath".into(), normalized_path.into()),
            ("isIp".into(), is_ip.into()),
        ]
        .into(),
    )
}

/// `true` if the host in `authority` (after any userinfo, before any port) is the host `url`
/// parsed.
fn authority_matches_host(authority: &str, host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, rest)| rest);
    match host_port.get(..host.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(host) => {
            let port = &host_port[host.len()..];
            port.is_empty() || port.starts_with(':')
        }
        _ => false,
    }
}

fn uri_encode(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut encoded = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(b));
        } else {
            encoded.push('%');
            encoded.push(char::from(HEX[usize::from(b >> 4)]));
            encoded.push(char::from(HEX[usize::from(b & 0xf)]));
        }
    }
    encoded
}

fn host_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z\d][a-zA-Z\d\-]{0,62}$").expect("valid host label regex"))
}

fn is_valid_host_label(s: &str, allow_sub_domains: bool) -> bool {
    if allow_sub_domains {
        s.split('.').all(|label| host_label_regex().is_match(label))
    } else {
        host_label_regex().is_match(s)
    }
}

fn s3_bucket_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z\d][a-z\d\-]{1,61}[a-z\d]$").expect("valid bucket regex"))
}

fn ipv4_like_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").expect("valid ipv4 regex"))
}

fn is_virtual_hostable_s3_bucket(s: &str, allow_sub_domains: bool) -> bool {
    if allow_sub_domains {
        !ipv4_like_regex().is_match(s)
            && s.split('.').all(|label| s3_bucket_label_regex().is_match(label))
    } else {
        s3_bucket_label_regex().is_match(s)
    }
}

#[cfg(test)]
mod tests {
    use super::{AttrPath, Function};
    use crate::{Error, Value, ValueType};

    fn call(f: Function, args: Vec<Value>) -> Value {
        f.call(&args).unwrap()
    }

    #[test]
    fn names_round_trip() {
        for f in Function::ALL {
            assert_eq!(Function::from_name(f.name()), Some(*f));
        }
        assert_eq!(Function::from_name("parseArn"), Some(Function::ParseArn));
        assert_eq!(Function::from_name("aws.nope"), None);
    }

    #[test]
    fn is_set_tests_absence_not_falsiness() {
        assert_eq!(call(Function::IsSet, vec![Value::None]), false.into());
        assert_eq!(call(Function::IsSet, vec![false.into()]), true.into());
        assert_eq!(call(Function::IsSet, vec!["".into()]), true.into());
    }

    #[test]
    fn not() {
        assert_eq!(call(Function::Not, vec![true.into()]), false.into());
        assert!(matches!(
            Function::Not.call(&[Value::None]),
            Err(Error::TypeMismatch {
                found: ValueType::None,
                ..
            })
        ));
    }

    #[test]
    fn boolean_equals_is_strict() {
        assert_eq!(
            call(Function::BooleanEquals, vec![true.into(), true.into()]),
            true.into()
        );
        assert_eq!(
            call(Function::BooleanEquals, vec![true.into(), false.into()]),
            false.into()
        );
        assert!(matches!(
            Function::BooleanEquals.call(&[true.into(), "true".into()]),
            Err(Error::TypeMismatch {
                expected: [ValueType::Boolean],
                found: ValueType::String
            })
        ));
    }

    #[test]
    fn string_equals() {
        assert_eq!(
            call(Function::StringEquals, vec!["a".into(), "a".into()]),
            true.into()
        );
        assert_eq!(
            call(Function::StringEquals, vec!["a".into(), "A".into()]),
            false.into()
        );
        assert!(Function::StringEquals
            .call(&["a".into(), Value::None])
            .is_err());
    }

    #[test]
    fn wrong_arity() {
        assert!(matches!(
            Function::IsSet.call(&[]),
            Err(Error::InvalidRuleSet(_))
        ));
    }

    #[test]
    fn get_attr() {
        let arn = call(
            Function::ParseArn,
            vec!["arn:aws:s3-outposts:us-west-2:123:outpost/op-01/bucket/b".into()],
        );
        assert_eq!(
            call(Function::GetAttr, vec![arn.clone(), "region".into()]),
            "us-west-2".into()
        );
        assert_eq!(
            call(Function::GetAttr, vec![arn.clone(), "resourceId[1]".into()]),
            "op-01".into()
        );
        assert_eq!(
            call(Function::GetAttr, vec![arn.clone(), "resourceId[9]".into()]),
            Value::None
        );
        assert!(matches!(
            Function::GetAttr.call(&[arn.clone(), "nope".into()]),
            Err(Error::AttributeNotFound(key)) if key.as_str() == "nope"
        ));
        assert!(matches!(
            Function::GetAttr.call(&[arn, "region[0]".into()]),
            Err(Error::TypeMismatch {
                expected: [ValueType::Array],
                found: ValueType::String
            })
        ));
    }

    #[test]
    fn get_attr_nested() {
        let value: Value = serde_json::from_str(r#"{"a": {"b": [10, {"c": "deep"}]}}"#).unwrap();
        assert_eq!(
            AttrPath::parse("a.b[1].c").unwrap().get(&value).unwrap(),
            "deep".into()
        );
        assert_eq!(
            AttrPath::parse("a.b[0]").unwrap().get(&value).unwrap(),
            Value::Integer(10)
        );
    }

    #[test]
    fn invalid_attr_paths() {
        for path in ["", "a..b", "a[", "a[x]", "a[-1]", "[0]"] {
            assert!(
                matches!(AttrPath::parse(path), Err(Error::InvalidRuleSet(_))),
                "{path:?} should be invalid"
            );
        }
        // `]` without `[` is part of the key.
        assert!(AttrPath::parse("a]").is_ok());
    }

    #[test]
    fn substring() {
        let sub = |s: &str, start: i64, stop: i64, reverse: bool| {
            call(
                Function::Substring,
                vec![s.into(), start.into(), stop.into(), reverse.into()],
            )
        };
        assert_eq!(sub("abcdefg", 0, 4, false), "abcd".into());
        assert_eq!(sub("abcdefg", 0, 4, true), "defg".into());
        assert_eq!(sub("abcdefg", 1, 3, true), "ef".into());
        assert_eq!(sub("abcdefg", 0, 7, false), "abcdefg".into());
        assert_eq!(sub("abcdefg", 0, 8, false), Value::None);
        assert_eq!(sub("abcdefg", 4, 4, false), Value::None);
        assert_eq!(sub("abcdefg", 5, 2, false), Value::None);
        assert_eq!(sub("abcdefg", -1, 2, false), Value::None);
        assert_eq!(sub("\u{1F600}abcdef", 0, 2, false), Value::None);
    }

    #[test]
    fn parse_arn() {
        let value = call(
            Function::ParseArn,
            vec!["arn:aws:iam::123456789012:role/test".into()],
        );
        let expected: Value = serde_json::from_str(
            r#"{
                "partition": "aws",
                "service": "iam",
                "region": "",
                "accountId": "123456789012",
                "resourceId": ["role", "test"]
            }"#,
        )
        .unwrap();
        assert_eq!(value, expected);

        assert_eq!(
            call(Function::ParseArn, vec!["not:an:arn".into()]),
            Value::None
        );
    }

    #[test]
    fn parse_url() {
        let value = call(
            Function::ParseUrl,
            vec!["https://example.com:8443/base/path".into()],
        );
        let expected: Value = serde_json::from_str(
            r#"{
                "scheme": "https",
                "authority": "example.com:8443",
                "path": "/base/path",
                "normalizedPath": "/base/path/",
                "isIp": false
            }"#,
        )
        .unwrap();
        assert_eq!(value, expected);

        let value = call(Function::ParseUrl, vec!["http://127.0.0.1".into()]);
        let record = value.as_record().unwrap();
        assert_eq!(record.get("path"), Some(&"".into()));
        assert_eq!(record.get("normalizedPath"), Some(&"/".into()));
        assert_eq!(record.get("isIp"), Some(&true.into()));

        let value = call(Function::ParseUrl, vec!["https://[::1]:443/".into()]);
        assert_eq!(value.as_record().unwrap().get("isIp"), Some(&true.into()));

        let value = call(Function::ParseUrl, vec!["https://user@Example.COM/x".into()]);
        assert_eq!(
            value.as_record().unwrap().get("authority"),
            Some(&"user@Example.COM".into())
        );

        for invalid in [
            "example.com",
            "https://example.com/?query=1",
            "https://example.com/#fragment",
            "ftp://example.com/",
            "https://example.com\\foo",
            "https://example.com/a\\b",
            "https://exam\tple.com/",
            "",
        ] {
            assert_eq!(
                call(Function::ParseUrl, vec![invalid.into()]),
                Value::None,
                "{invalid:?}"
            );
        }
    }

    #[test]
    fn uri_encode() {
        assert_eq!(
            call(Function::UriEncode, vec!["a b/c?d=e&f~g_h.i-j".into()]),
            "a%20b%2Fc%3Fd%3De%26f~g_h.i-j".into()
        );
        assert_eq!(
            call(Function::UriEncode, vec!["\u{e9}".into()]),
            "%C3%A9".into()
        );
    }

    #[test]
    fn is_valid_host_label() {
        let check = |s: &str, sub: bool| {
            call(Function::IsValidHostLabel, vec![s.into(), sub.into()])
                .as_bool()
                .unwrap()
        };
        assert!(check("us-west-2", false));
        assert!(check("a", false));
        assert!(!check("", false));
        assert!(!check("-leading", false));
        assert!(!check("has.dot", false));
        assert!(check("has.dot", true));
        assert!(!check("has..dot", true));
        assert!(!check(&"a".repeat(64), false));
    }

    #[test]
    fn partition() {
        let value = call(Function::Partition, vec!["cn-north-1".into()]);
        let record = value.as_record().unwrap();
        assert_eq!(record.get("name"), Some(&"aws-cn".into()));
        assert_eq!(record.get("dnsSuffix"), Some(&"amazonaws.com.cn".into()));
        assert_eq!(record.get("supportsFIPS"), Some(&true.into()));

        assert_eq!(call(Function::Partition, vec!["".into()]), Value::None);
    }

    #[test]
    fn is_virtual_hostable_s3_bucket() {
        let check = |s: &str, sub: bool| {
            call(
                Function::IsVirtualHostableS3Bucket,
                vec![s.into(), sub.into()],
            )
            .as_bool()
            .unwrap()
        };
        assert!(check("my-bucket", false));
        assert!(!check("My-Bucket", false));
        assert!(!check("ab", false));
        assert!(!check("my.bucket", false));
        assert!(check("abc.bucket", true));
        assert!(!check("192.168.1.1", true));
        assert!(!check("bucket-", false));
    }
}

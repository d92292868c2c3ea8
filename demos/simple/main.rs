use std::sync::Arc;

use endpoint_rules::{
    ClientConfig, ExecutionAttributes, ProviderRegistry, Record, ResolveEndpointInterceptor,
    ServiceEndpointMetadata, Value,
};

const RULE_SET: &str = r#"{
    "version": "1.0",
    "parameters": {
        "Region": {"type": "String", "builtIn": "AWS::Region"},
        "UseFIPS": {"type": "Boolean", "builtIn": "AWS::UseFIPS", "required": true, "default": false},
        "Bucket": {"type": "String"}
    },
    "rules": [
        {
            "type": "endpoint",
            "conditions": [
                {"fn": "isSet", "argv": [{"ref": "Region"}]},
                {"fn": "isSet", "argv": [{"ref": "Bucket"}]},
                {"fn": "aws.partition", "argv": [{"ref": "Region"}], "assign": "PartitionResult"},
                {"fn": "booleanEquals", "argv": [{"ref": "UseFIPS"}, false]}
            ],
            "endpoint": {"url": "https://{Bucket}.storage.{Region}.{PartitionResult#dnsSuffix}"}
        },
        {"type": "error", "conditions": [], "error": "Region and Bucket must be set, FIPS is not supported"}
    ]
}"#;

pub fn main() {
    env_logger::init();

    ProviderRegistry::global().register_json("storage", RULE_SET);
    let rule_set = ProviderRegistry::global().rule_set("storage").unwrap();

    let metadata = ServiceEndpointMetadata::from_rule_set(&rule_set)
        .with_context_param("GetObject", "Bucket", "Bucket");
    let interceptor = ResolveEndpointInterceptor::new(rule_set, Arc::new(metadata));

    let config = Arc::new(ClientConfig::new().with_region("eu-central-1"));
    let request = Record::from([("Bucket".into(), Value::from("my-bucket"))]);

    let mut attributes = ExecutionAttributes::new("GetObject", config);
    match interceptor.modify_request(&request, &mut attributes) {
        Ok(()) => println!("Endpoint: {:?}", attributes.resolved_endpoint()),
        Err(err) => println!("Error: {err}"),
    }
}

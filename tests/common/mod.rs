use chrono::{DateTime, Utc};
use sale_codec::{Config, Sale};
use std::env;

/// Schema document exactly as the Java payments app registers it.
#[allow(dead_code)]
pub const REGISTERED_SCHEMA: &str = r#"{"type":"record","name":"Sale","namespace":"io.confluent.examples.datacontract.pojo.avro","fields":[{"name":"order_id","type":"int"},{"name":"product_id","type":"int"},{"name":"customer_id","type":"int"},{"name":"confirmation_code","type":"string"},{"name":"cc_number","type":"string"},{"name":"expiration","type":"string"},{"name":"amount","type":"double"},{"name":"ts","type":{"type":"long","logicalType":"timestamp-millis"}}]}"#;

#[allow(dead_code)]
pub fn example_ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00.123456789Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[allow(dead_code)]
pub fn example_sale() -> Sale {
    Sale::builder()
        .order_id(1)
        .product_id(42)
        .customer_id(7)
        .confirmation_code("ABC123")
        .cc_number("4111111111111111")
        .expiration("12/29")
        .amount(19.99)
        .ts(example_ts())
        .build()
        .unwrap()
}

/// Get test configuration from environment variables
#[allow(dead_code)]
pub fn get_test_config() -> Config {
    // Use TEST_ prefix for test environment variables
    Config::from_lookup(|name| match name {
        "BOOTSTRAP_SERVERS" => Some(
            env::var("TEST_KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
        ),
        "SECURITY_PROTOCOL" => Some(
            env::var("TEST_KAFKA_SECURITY_PROTOCOL").unwrap_or_else(|_| "PLAINTEXT".to_string()),
        ),
        "SASL_MECHANISM" => Some("PLAIN".to_string()),
        "NUM_PARTITIONS" => Some("1".to_string()),
        "REPLICATION_FACTOR" => Some("1".to_string()),
        other => Some(env::var(format!("TEST_{}", other)).unwrap_or_else(|_| "test".to_string())),
    })
    .expect("test configuration is complete")
}

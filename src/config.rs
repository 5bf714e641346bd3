//! Connection settings loaded from environment variables.
//!
//! Every credential is required. Loading stops at the first missing or
//! empty variable so the process never starts half configured.

use std::fmt;

use rdkafka::ClientConfig;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub schema_registry: SchemaRegistryConfig,
    pub encryption: EncryptionConfig,
    pub topic: TopicConfig,
}

#[derive(Clone)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub security_protocol: String,
    pub sasl_mechanism: String,
    pub sasl_username: String,
    pub sasl_password: String,
}

#[derive(Clone)]
pub struct SchemaRegistryConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Key-management credentials for the field-level encryption executor.
#[derive(Clone)]
pub struct EncryptionConfig {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    pub partitions: i32,
    pub replication_factor: i32,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            replication_factor: default_replication_factor(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| {
                Error::Config(format!("Required environment variable {} is not set", name))
            })
        };

        let kafka = KafkaConfig {
            bootstrap_servers: required("BOOTSTRAP_SERVERS")?,
            security_protocol: var("SECURITY_PROTOCOL").unwrap_or_else(default_security_protocol),
            sasl_mechanism: var("SASL_MECHANISM").unwrap_or_else(default_sasl_mechanism),
            sasl_username: required("SASL_USERNAME")?,
            sasl_password: required("SASL_PASSWORD")?,
        };
        debug!(bootstrap_servers = %kafka.bootstrap_servers, "Loaded Kafka settings");

        let schema_registry = SchemaRegistryConfig {
            url: required("SCHEMA_REGISTRY_URL")?,
            api_key: required("SR_API_KEY")?,
            api_secret: required("SR_API_SECRET")?,
        };

        let encryption = EncryptionConfig {
            aws_access_key_id: required("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
        };

        let topic = TopicConfig {
            partitions: parse_or(var("NUM_PARTITIONS"), "NUM_PARTITIONS", default_partitions)?,
            replication_factor: parse_or(
                var("REPLICATION_FACTOR"),
                "REPLICATION_FACTOR",
                default_replication_factor,
            )?,
        };

        Ok(Self {
            kafka,
            schema_registry,
            encryption,
            topic,
        })
    }

    /// Client settings shared by the admin client and the producer.
    pub fn kafka_client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", &self.kafka.bootstrap_servers)
            .set("security.protocol", &self.kafka.security_protocol)
            .set("sasl.mechanism", &self.kafka.sasl_mechanism)
            .set("sasl.username", &self.kafka.sasl_username)
            .set("sasl.password", &self.kafka.sasl_password);
        client
    }
}

impl SchemaRegistryConfig {
    /// `key:secret`, the registry's basic-auth user info.
    pub fn basic_auth_user_info(&self) -> String {
        format!("{}:{}", self.api_key, self.api_secret)
    }
}

impl fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("sasl_username", &self.sasl_username)
            .field("sasl_password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for SchemaRegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistryConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &REDACTED)
            .finish()
    }
}

const REDACTED: &str = "<redacted>";

fn parse_or(value: Option<String>, name: &str, default: fn() -> i32) -> Result<i32> {
    match value {
        Some(raw) => match raw.trim().parse::<i32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(Error::Config(format!(
                "{} must be a positive integer, got '{}'",
                name, raw
            ))),
        },
        None => Ok(default()),
    }
}

fn default_security_protocol() -> String {
    "SASL_SSL".to_string()
}

fn default_sasl_mechanism() -> String {
    "PLAIN".to_string()
}

fn default_partitions() -> i32 {
    6
}

fn default_replication_factor() -> i32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        [
            ("BOOTSTRAP_SERVERS", "broker-1:9092,broker-2:9092"),
            ("SASL_USERNAME", "producer"),
            ("SASL_PASSWORD", "hunter2"),
            ("SCHEMA_REGISTRY_URL", "https://registry.example:8081"),
            ("SR_API_KEY", "sr-key"),
            ("SR_API_SECRET", "sr-secret"),
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "aws-secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config> {
        Config::from_lookup(|name| env.get(name).cloned())
    }

    fn expect_missing(env: &HashMap<&'static str, String>, name: &str) {
        match load(env) {
            Err(Error::Config(message)) => assert!(
                message.contains(name),
                "message '{}' should name {}",
                message,
                name
            ),
            other => panic!("expected config error for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_full_environment() {
        let config = load(&full_env()).unwrap();

        assert_eq!(config.kafka.bootstrap_servers, "broker-1:9092,broker-2:9092");
        assert_eq!(config.kafka.security_protocol, "SASL_SSL");
        assert_eq!(config.kafka.sasl_mechanism, "PLAIN");
        assert_eq!(config.schema_registry.basic_auth_user_info(), "sr-key:sr-secret");
        assert_eq!(config.encryption.aws_access_key_id, "AKIAEXAMPLE");
        assert_eq!(config.topic, TopicConfig::default());
    }

    #[test]
    fn test_each_required_variable_is_enforced() {
        for name in full_env().keys() {
            let mut env = full_env();
            env.remove(name);
            expect_missing(&env, name);
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("BOOTSTRAP_SERVERS", "  ".to_string());
        expect_missing(&env, "BOOTSTRAP_SERVERS");
    }

    #[test]
    fn test_topic_overrides() {
        let mut env = full_env();
        env.insert("NUM_PARTITIONS", "12".to_string());
        env.insert("REPLICATION_FACTOR", "1".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.topic.partitions, 12);
        assert_eq!(config.topic.replication_factor, 1);

        env.insert("NUM_PARTITIONS", "many".to_string());
        expect_missing(&env, "NUM_PARTITIONS");

        env.insert("NUM_PARTITIONS", "0".to_string());
        expect_missing(&env, "NUM_PARTITIONS");
    }

    #[test]
    fn test_client_config_carries_credentials() {
        let client = load(&full_env()).unwrap().kafka_client_config();
        assert_eq!(client.get("bootstrap.servers"), Some("broker-1:9092,broker-2:9092"));
        assert_eq!(client.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(client.get("sasl.username"), Some("producer"));
        assert_eq!(client.get("sasl.password"), Some("hunter2"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", load(&full_env()).unwrap());
        for secret in ["hunter2", "sr-secret", "aws-secret"] {
            assert!(!rendered.contains(secret), "{} leaked", secret);
        }
        assert!(rendered.contains("producer"));
    }
}

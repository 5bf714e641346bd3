use crate::config::{Config, TopicConfig};
use crate::{Error, Result};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Topic names may not contain spaces; they become hyphens.
pub fn normalize_topic_name(topic_name: &str) -> String {
    topic_name.replace(' ', "-")
}

pub struct TopicManager {
    admin_client: AdminClient<DefaultClientContext>,
    partitions: i32,
    replication_factor: i32,
    verified_topics: HashSet<String>,
}

impl TopicManager {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_topic_config(config, &config.topic)
    }

    pub fn with_topic_config(config: &Config, topic: &TopicConfig) -> Result<Self> {
        let admin_client: AdminClient<_> = config.kafka_client_config().create()?;

        Ok(Self {
            admin_client,
            partitions: topic.partitions,
            replication_factor: topic.replication_factor,
            verified_topics: HashSet::new(),
        })
    }

    /// Creates the topic if it is absent and returns the normalized name.
    ///
    /// A topic created concurrently by someone else counts as success.
    /// Any other failure is returned to the caller.
    #[instrument(skip(self))]
    pub async fn ensure_topic_exists(&mut self, topic_name: &str) -> Result<String> {
        let topic_name = normalize_topic_name(topic_name);

        if self.verified_topics.contains(&topic_name) {
            debug!("Topic '{}' already verified to exist", topic_name);
            return Ok(topic_name);
        }

        match self.topic_exists(&topic_name) {
            Ok(true) => {
                info!("Topic '{}' already exists", topic_name);
            }
            Ok(false) => {
                info!(
                    partitions = self.partitions,
                    replication_factor = self.replication_factor,
                    "Creating topic '{}'",
                    topic_name
                );
                self.create_topic(&topic_name).await?;
            }
            Err(e) => {
                warn!("Failed to check if topic '{}' exists: {}", topic_name, e);
                return Err(e);
            }
        }

        self.verified_topics.insert(topic_name.clone());
        Ok(topic_name)
    }

    fn topic_exists(&self, topic_name: &str) -> Result<bool> {
        let metadata = self
            .admin_client
            .inner()
            .fetch_metadata(Some(topic_name), Duration::from_secs(10))?;

        // Brokers report an unknown topic as an entry carrying an error
        Ok(metadata
            .topics()
            .iter()
            .any(|topic| topic.name() == topic_name && topic.error().is_none()))
    }

    async fn create_topic(&self, topic_name: &str) -> Result<()> {
        let new_topic = NewTopic::new(
            topic_name,
            self.partitions,
            TopicReplication::Fixed(self.replication_factor),
        );

        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(30)));

        let results = self.admin_client.create_topics(&[new_topic], &opts).await?;

        for result in results {
            match result {
                Ok(topic) => {
                    info!("Successfully created topic: {}", topic);
                }
                Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    info!("Topic '{}' was created concurrently", topic);
                }
                Err((_topic, error)) => {
                    return Err(Error::Kafka(KafkaError::AdminOp(error)));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_topic_name() {
        assert_eq!(normalize_topic_name("daily sales"), "daily-sales");
        assert_eq!(normalize_topic_name(" a  b "), "-a--b-");
        assert_eq!(normalize_topic_name("sales"), "sales");
    }

    fn local_config() -> Config {
        Config::from_lookup(|name| match name {
            "BOOTSTRAP_SERVERS" => Some(
                std::env::var("TEST_KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
            ),
            "SECURITY_PROTOCOL" => Some("PLAINTEXT".to_string()),
            "SASL_MECHANISM" => Some("PLAIN".to_string()),
            "NUM_PARTITIONS" => Some("3".to_string()),
            "REPLICATION_FACTOR" => Some("1".to_string()),
            _ => Some("unused".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires running Kafka
    async fn test_topic_creation_is_idempotent() {
        let mut manager = TopicManager::new(&local_config()).unwrap();

        let topic = format!("test sales {}", std::process::id());
        let created = manager.ensure_topic_exists(&topic).await.unwrap();
        assert_eq!(created, normalize_topic_name(&topic));
        assert!(manager.topic_exists(&created).unwrap());

        // A fresh manager has no cache and must see the existing topic
        let mut other = TopicManager::new(&local_config()).unwrap();
        assert_eq!(other.ensure_topic_exists(&topic).await.unwrap(), created);
    }
}

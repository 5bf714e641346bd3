use crate::config::Config;
use crate::record::{Sale, SaleCodec};
use crate::{Error, Result};
use futures::future::join_all;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Sends encoded Sales keyed by order id.
pub struct SaleProducer {
    producer: FutureProducer,
    codec: Arc<SaleCodec>,
}

impl SaleProducer {
    pub fn new(config: &Config, codec: Arc<SaleCodec>) -> Result<Self> {
        let producer: FutureProducer = config
            .kafka_client_config()
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()?;

        Ok(Self { producer, codec })
    }

    #[instrument(skip(self, sale), fields(order_id = sale.order_id()))]
    pub async fn send(&self, topic: &str, sale: &Sale) -> Result<()> {
        let payload = self.codec.encode(sale);
        let key = sale_key(sale);
        let record = FutureRecord::to(topic).payload(payload.as_ref()).key(&key);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| Error::Kafka(e))?;

        debug!(partition, offset, "Delivered sale");
        Ok(())
    }

    /// Sends every Sale concurrently; results keep the input order.
    pub async fn send_batch(&self, topic: &str, sales: &[Sale]) -> Vec<Result<()>> {
        join_all(sales.iter().map(|sale| self.send(topic, sale))).await
    }
}

pub fn sale_key(sale: &Sale) -> String {
    sale.order_id().to_string()
}

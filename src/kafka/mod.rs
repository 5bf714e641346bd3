pub mod producer;
pub mod topic_manager;

pub use producer::SaleProducer;
pub use topic_manager::{normalize_topic_name, TopicManager};

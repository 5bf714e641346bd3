use clap::{Parser, Subcommand};
use sale_codec::config::TopicConfig;
use sale_codec::kafka::{SaleProducer, TopicManager};
use sale_codec::{Config, Result, Sale, SaleCodec};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "sale-codec")]
#[command(about = "Sale record codec and Kafka topic tooling", long_about = None)]
struct Args {
    #[arg(short, long, global = true, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, global = true, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a topic unless it already exists
    CreateTopic {
        topic: String,

        #[arg(long, value_parser = clap::value_parser!(i32).range(1..), help = "Overrides NUM_PARTITIONS")]
        partitions: Option<i32>,

        #[arg(long, value_parser = clap::value_parser!(i32).range(1..), help = "Overrides REPLICATION_FACTOR")]
        replication_factor: Option<i32>,
    },

    /// Produce JSON-lines Sales to a topic
    Produce {
        topic: String,

        #[arg(short, long, value_name = "FILE", help = "Read Sales from FILE instead of stdin")]
        input: Option<PathBuf>,
    },

    /// Print the Sale schema and its fingerprint
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    match args.command {
        Command::Schema => print_schema(&SaleCodec::new()),
        Command::CreateTopic {
            topic,
            partitions,
            replication_factor,
        } => {
            let config = load_config()?;
            let topic_config = TopicConfig {
                partitions: partitions.unwrap_or(config.topic.partitions),
                replication_factor: replication_factor.unwrap_or(config.topic.replication_factor),
            };

            let mut manager = TopicManager::with_topic_config(&config, &topic_config)?;
            let topic = manager.ensure_topic_exists(&topic).await?;
            println!("{}", topic);
            Ok(())
        }
        Command::Produce { topic, input } => {
            let config = load_config()?;
            produce(&config, &topic, input).await
        }
    }
}

fn load_config() -> Result<Config> {
    info!("Loading Kafka configuration from environment variables");

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!(
        bootstrap_servers = %config.kafka.bootstrap_servers,
        security_protocol = %config.kafka.security_protocol,
        schema_registry_url = %config.schema_registry.url,
        partitions = config.topic.partitions,
        replication_factor = config.topic.replication_factor,
        "Configuration summary"
    );

    Ok(config)
}

fn print_schema(codec: &SaleCodec) -> Result<()> {
    let schema = codec.schema();
    println!("{}", serde_json::to_string_pretty(&schema.to_json())?);
    println!("canonical: {}", schema.canonical_form());
    println!("fingerprint: {}", schema.fingerprint());
    Ok(())
}

async fn produce(config: &Config, topic: &str, input: Option<PathBuf>) -> Result<()> {
    let codec = Arc::new(SaleCodec::new());
    let topic = TopicManager::new(config)?.ensure_topic_exists(topic).await?;
    let producer = SaleProducer::new(config, codec)?;

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => {
            info!("Reading sales from {:?}", path);
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = reader.lines();
    let mut line_number = 0usize;
    let mut produced = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let sale: Sale = match serde_json::from_str(&line) {
            Ok(sale) => sale,
            Err(e) => {
                error!(line = line_number, "Invalid sale: {}", e);
                return Err(e.into());
            }
        };

        producer.send(&topic, &sale).await?;
        produced += 1;
    }

    info!(topic = %topic, produced, "Finished producing sales");
    Ok(())
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("sale_codec=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sale_codec=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_overrides_must_be_positive() {
        for flag in ["--partitions", "--replication-factor"] {
            for bad in ["0", "-1", "many"] {
                let parsed = Args::try_parse_from(["sale-codec", "create-topic", "sales", flag, bad]);
                assert!(parsed.is_err(), "{} {} should be rejected", flag, bad);
            }
        }
    }

    #[test]
    fn test_topic_overrides_parse() {
        let args = Args::try_parse_from([
            "sale-codec",
            "create-topic",
            "sales",
            "--partitions",
            "12",
            "--replication-factor",
            "1",
        ])
        .unwrap();

        match args.command {
            Command::CreateTopic {
                topic,
                partitions,
                replication_factor,
            } => {
                assert_eq!(topic, "sales");
                assert_eq!(partitions, Some(12));
                assert_eq!(replication_factor, Some(1));
            }
            other => panic!("expected create-topic, got {:?}", other),
        }
    }
}

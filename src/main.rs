//! Retail Predictor - Main Entry Point
//!
//! One-off predictions from the command line, or a NATS request/reply
//! server answering prediction requests concurrently.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use retail_predictor::{
    cli::{self, Cli, Commands},
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    feature_extractor::FeatureExtractor,
    metrics::{MetricsReporter, PredictionMetrics},
    models::{ModelRegistry, OnnxModelSource},
    producer::ReplyPublisher,
    types::{PredictionResponse, Reply},
    PredictionService,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = AppConfig::load_or_default(args.config.as_deref())?;
    init_logging(&config.logging, args.verbose)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Retail predictor starting");

    match &args.command {
        Commands::Categories => {
            for line in cli::category_listing() {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Serve => serve(config).await,
        command @ (Commands::HighSpend { .. } | Commands::Churn { .. }) => {
            let request = command
                .prediction_request()
                .context("Command carries no prediction request")?;
            let service = build_service(&config)?;
            let response = service.handle(&request).context("Prediction failed")?;
            print_response(response);
            Ok(())
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("retail_predictor={}", level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn build_service(config: &AppConfig) -> Result<PredictionService> {
    let source =
        OnnxModelSource::new(&config.models).context("Failed to initialize ONNX Runtime")?;
    let registry = Arc::new(ModelRegistry::new(source));
    let extractor = FeatureExtractor::with_churn_clipping(config.preprocessing.clip_churn_inputs);

    if extractor.clips_churn_inputs() {
        info!("Churn inputs will be clipped to training ranges");
    }

    Ok(PredictionService::new(registry, extractor))
}

fn print_response(response: PredictionResponse) {
    println!("{} (label {})", response.outcome, response.label.as_u8());
}

async fn serve(config: AppConfig) -> Result<()> {
    let metrics = Arc::new(PredictionMetrics::new());
    let service = Arc::new(build_service(&config)?.with_metrics(metrics.clone()));

    // A missing or corrupt artifact is fatal: fail before accepting requests
    service
        .registry()
        .preload()
        .context("Failed to load model artifacts")?;
    info!("Models loaded");

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let request_consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.request_subject,
        &config.nats.queue_group,
    );
    let publisher = ReplyPublisher::new(client.clone());

    let num_workers = config.service.workers.max(1);
    info!(workers = num_workers, subject = request_consumer.subject(), "Serving prediction requests");

    let semaphore = Arc::new(Semaphore::new(num_workers));

    let reporter = MetricsReporter::new(metrics.clone(), config.service.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = request_consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let service = service.clone();
        let publisher = publisher.clone();

        tokio::spawn(async move {
            let reply = service.reply_to(&message.payload).await;

            if let Reply::Error { kind, message: reason } = &reply {
                warn!(kind = %kind, reason = %reason, "Prediction request failed");
            }

            match message.reply {
                Some(reply_subject) => {
                    if let Err(e) = publisher.publish(reply_subject, &reply).await {
                        error!(error = %e, "Failed to publish prediction reply");
                    }
                }
                None => warn!("Prediction request has no reply subject, dropping reply"),
            }

            drop(permit);
        });
    }

    info!("Subscription closed, shutting down");
    metrics.print_summary();

    Ok(())
}

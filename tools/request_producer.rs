//! Test Request Producer
//!
//! Sends random prediction requests to the service over NATS and logs the
//! replies.
//!
//! Usage: request-producer [nats_url] [subject] [count] [invalid_rate] [delay_ms]

use rand::Rng;
use retail_predictor::encoding::{CITIES, CUSTOMER_CATEGORIES, DAY_LABELS, PAYMENT_METHODS, STORE_TYPES};
use retail_predictor::types::{ChurnInput, HighSpendInput, PredictionRequest, Reply};
use std::time::Duration;
use tracing::{info, warn};

/// Random request generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn high_spend(&mut self) -> PredictionRequest {
        PredictionRequest::HighSpend(HighSpendInput {
            basket_size: self.rng.gen_range(1..40),
            avg_item_price: self.rng.gen_range(1.0..250.0_f64).round(),
            day: self.random_choice(DAY_LABELS).to_string(),
            hour: self.rng.gen_range(0..24),
        })
    }

    fn churn(&mut self) -> PredictionRequest {
        PredictionRequest::Churn(ChurnInput {
            recency: self.rng.gen_range(0.0..800.0_f64).round(),
            frequency: self.rng.gen_range(0..30),
            monetary: self.rng.gen_range(0.0..700.0_f64).round(),
            customer_category: self.random_choice(CUSTOMER_CATEGORIES).to_string(),
            city: self.random_choice(CITIES).to_string(),
            store_type: self.random_choice(STORE_TYPES).to_string(),
            payment_method: self.random_choice(PAYMENT_METHODS).to_string(),
        })
    }

    /// A request the service must reject
    fn invalid(&mut self) -> PredictionRequest {
        match self.churn() {
            PredictionRequest::Churn(mut input) => {
                input.city = "Atlantis".to_string();
                PredictionRequest::Churn(input)
            }
            other => other,
        }
    }

    fn generate(&mut self, invalid_rate: f64) -> PredictionRequest {
        if self.rng.gen_bool(invalid_rate) {
            self.invalid()
        } else if self.rng.gen_bool(0.5) {
            self.high_spend()
        } else {
            self.churn()
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("retail.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let invalid_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.05_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, invalid_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut ok_count = 0;
    let mut error_count = 0;

    for i in 0..count {
        let request = generator.generate(invalid_rate);
        let payload = serde_json::to_vec(&request)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(message) => match serde_json::from_slice::<Reply>(&message.payload) {
                Ok(Reply::Ok(response)) => {
                    ok_count += 1;
                    info!(
                        context = %response.context,
                        outcome = %response.outcome,
                        "Prediction received"
                    );
                }
                Ok(Reply::Error { kind, message }) => {
                    error_count += 1;
                    info!(kind = %kind, message = %message, "Request rejected");
                }
                Err(e) => warn!(error = %e, "Unreadable reply"),
            },
            Err(e) => warn!(error = %e, "Request failed"),
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} predictions, {} rejected)",
                i + 1,
                count,
                ok_count,
                error_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} predictions, {} rejected)",
        count, ok_count, error_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, invalid_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();

    for i in 0..count {
        let json = serde_json::to_string_pretty(&generator.generate(invalid_rate))?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

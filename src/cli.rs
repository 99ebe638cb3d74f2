//! Command-line interface

use crate::encoding::{CategoricalField, DAY_LABELS};
use crate::types::request::{ChurnInput, HighSpendInput, PredictionRequest};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "retail-predictor",
    about = "High-spend and churn predictions over pre-trained classifiers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (defaults to config/config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict whether a basket makes a high spender
    HighSpend {
        /// Number of items purchased
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        basket_size: i64,

        /// Average item price
        #[arg(long)]
        avg_item_price: f64,

        /// Day of the transaction (Mon, Tue, Wed, Thu, Fri, Sat, Sun)
        #[arg(long)]
        day: String,

        /// Hour of the transaction (0-23)
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=23))]
        hour: i64,
    },

    /// Predict whether a customer is likely to churn
    Churn {
        /// Days since last purchase
        #[arg(long)]
        recency: f64,

        /// Number of purchases
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        frequency: i64,

        /// Total spend
        #[arg(long)]
        monetary: f64,

        #[arg(long)]
        customer_category: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        store_type: String,

        #[arg(long)]
        payment_method: String,
    },

    /// List the accepted category labels and their codes
    Categories,

    /// Serve prediction requests over NATS
    Serve,
}

impl Commands {
    /// The prediction request of `high-spend` and `churn`
    pub fn prediction_request(&self) -> Option<PredictionRequest> {
        match self {
            Commands::HighSpend {
                basket_size,
                avg_item_price,
                day,
                hour,
            } => Some(PredictionRequest::HighSpend(HighSpendInput::new(
                *basket_size,
                *avg_item_price,
                day,
                *hour,
            ))),
            Commands::Churn {
                recency,
                frequency,
                monetary,
                customer_category,
                city,
                store_type,
                payment_method,
            } => Some(PredictionRequest::Churn(ChurnInput {
                recency: *recency,
                frequency: *frequency,
                monetary: *monetary,
                customer_category: customer_category.clone(),
                city: city.clone(),
                store_type: store_type.clone(),
                payment_method: payment_method.clone(),
            })),
            Commands::Categories | Commands::Serve => None,
        }
    }
}

/// Lines listing every category table, for `categories`
pub fn category_listing() -> Vec<String> {
    let mut lines = Vec::new();
    for field in CategoricalField::ALL {
        lines.push(format!("{}:", field.column_name()));
        for (code, label) in field.labels().iter().enumerate() {
            lines.push(format!("  {:>2}  {}", code, label));
        }
    }
    lines.push("DayOfWeek:".to_string());
    for (idx, label) in DAY_LABELS.iter().enumerate() {
        lines.push(format!("  {:>2}  {}", idx + 1, label));
    }
    lines
}

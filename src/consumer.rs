//! NATS message consumer for incoming prediction requests

use crate::types::request::PredictionRequest;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving prediction requests from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
    queue_group: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str, queue_group: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: queue_group.to_string(),
        }
    }

    /// Subscribe to the request subject as a member of the queue group, so
    /// each request is delivered to exactly one service instance.
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .queue_subscribe(self.subject.clone(), self.queue_group.clone())
            .await?;
        info!(
            subject = %self.subject,
            queue_group = %self.queue_group,
            "Subscribed to prediction requests"
        );
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Parse a request payload.
pub fn decode_request(payload: &[u8]) -> Result<PredictionRequest, serde_json::Error> {
    serde_json::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_churn_request() {
        let payload = br#"{
            "context": "churn",
            "recency": 120,
            "frequency": 3,
            "monetary": 250.5,
            "customer_category": "Retiree",
            "city": "Miami",
            "store_type": "Pharmacy",
            "payment_method": "Cash"
        }"#;

        match decode_request(payload).unwrap() {
            PredictionRequest::Churn(input) => {
                assert_eq!(input.recency, 120.0);
                assert_eq!(input.city, "Miami");
            }
            other => panic!("expected churn request, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_request(b"not json").is_err());
        assert!(decode_request(br#"{"context":"high_spend","basket_size":3}"#).is_err());
    }
}

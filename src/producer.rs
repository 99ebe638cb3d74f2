//! NATS reply publisher

use crate::types::outcome::Reply;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes prediction replies to the requester's reply subject
#[derive(Clone)]
pub struct ReplyPublisher {
    client: Client,
}

impl ReplyPublisher {
    /// Create a new reply publisher
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Publish a reply
    pub async fn publish(&self, reply_subject: Subject, reply: &Reply) -> Result<()> {
        let payload = encode_reply(reply)?;

        self.client
            .publish(reply_subject.clone(), payload.into())
            .await?;

        debug!(subject = %reply_subject, "Published prediction reply");

        Ok(())
    }
}

/// Serialize a reply envelope.
pub fn encode_reply(reply: &Reply) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(reply)
}

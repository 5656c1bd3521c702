use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use meterlink_core::{MeterReading, ReadingBatch};

use crate::error::TransportError;

/// Transport used by the upload task to hand a batch to the ingestion
/// endpoint.
///
/// One call per batch; the returned string is the endpoint's acknowledgement
/// and is only used for logging. The upload pass never issues concurrent
/// transmit calls.
#[async_trait]
pub trait IngestTransport: Send + Sync {
    async fn transmit(&self, batch: &ReadingBatch) -> Result<String, TransportError>;
}

/// JSON body posted to the ingestion endpoint.
#[derive(Debug, Serialize)]
struct IngestPayload<'a> {
    delete_after_upload: bool,
    readings: &'a [MeterReading],
}

/// HTTP implementation of [`IngestTransport`].
///
/// Posts each batch as a JSON document with HTTP basic auth. Timeout policy
/// is left to the underlying client; the upload task imposes none.
pub struct HttpIngestClient {
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
    delete_after_upload: bool,
}

impl HttpIngestClient {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        delete_after_upload: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            username: username.into(),
            password: password.into(),
            delete_after_upload,
        }
    }
}

#[async_trait]
impl IngestTransport for HttpIngestClient {
    async fn transmit(&self, batch: &ReadingBatch) -> Result<String, TransportError> {
        let payload = IngestPayload {
            delete_after_upload: self.delete_after_upload,
            readings: batch.readings(),
        };

        debug!(url = %self.url, readings = batch.len(), "posting batch to ingestion endpoint");

        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "ingestion endpoint rejected batch");
            return Err(TransportError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape_matches_endpoint_contract() {
        let mut batch = ReadingBatch::new();
        batch.push(MeterReading::new("meter1.power", 1_420_070_400_000, 230.5));
        batch.push(MeterReading::new("meter2.energy", 1_420_070_460_000, 18.0));

        let payload = IngestPayload {
            delete_after_upload: true,
            readings: batch.readings(),
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["delete_after_upload"], true);
        let readings = json["readings"].as_array().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0]["channel_id"], "meter1.power");
        assert_eq!(readings[1]["value"], 18.0);
    }

    #[test]
    fn api_error_carries_status() {
        let err = TransportError::Api {
            status: 401,
            message: "bad credentials".into(),
        };
        assert!(err.to_string().contains("401"));
    }
}

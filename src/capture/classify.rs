//! Downstream classification submission.
//!
//! The sequencer hands the selected capture filename to a remote
//! classification service and forgets about it: the response is handled
//! by an external collaborator, and a failed call is logged and dropped
//! (no retry, no local fallback).

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Body of the classification POST
///
/// Note the bin correlation id is not part of the wire contract; the
/// association between capture and bin is currently lost at this
/// boundary (see DESIGN.md).
#[derive(Debug, Serialize)]
struct ClassificationRequest<'a> {
    filename: &'a str,
}

/// Sink for completed captures
#[async_trait]
pub trait ClassificationSink: Send + Sync {
    /// Submit one capture filename for classification
    async fn submit(&self, filename: &str) -> Result<()>;
}

/// HTTP classification client
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    /// Create a client posting to `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ClassificationSink for HttpClassifier {
    async fn submit(&self, filename: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassificationRequest { filename })
            .send()
            .await
            .map_err(|e| BridgeError::Classification(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| BridgeError::Classification(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recording sink for sequencer tests
    #[derive(Clone, Default)]
    pub struct MockSink {
        pub submitted: Arc<Mutex<Vec<String>>>,
        pub fail: Arc<Mutex<bool>>,
    }

    impl MockSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn submissions(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClassificationSink for MockSink {
        async fn submit(&self, filename: &str) -> Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(BridgeError::Classification("mock submit failure".into()));
            }
            self.submitted.lock().unwrap().push(filename.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ClassificationRequest {
            filename: "1700000000.jpg",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "filename": "1700000000.jpg" }));
    }
}

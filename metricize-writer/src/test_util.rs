// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`BulkTransport`] for tests.
//!
//! This requires that the `test-util` feature be enabled.

use std::future::Future;
use std::sync::{Arc, Mutex};

use metricize_core::MetricDoc;

use crate::transport::{BulkTransport, TransportError};

/// One captured bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRequest {
    /// Target index.
    pub index: String,
    /// The NDJSON body.
    pub body: String,
}

impl BulkRequest {
    /// Decode the documents of the body, skipping the action lines.
    #[track_caller]
    pub fn documents(&self) -> Vec<MetricDoc> {
        self.body
            .lines()
            .skip(1)
            .step_by(2)
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// A transport that records every request. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct VecTransport {
    requests: Arc<Mutex<Vec<BulkRequest>>>,
    fail_with: Option<String>,
}

impl VecTransport {
    /// A transport that rejects every request with `message`, still recording it.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            requests: Default::default(),
            fail_with: Some(message.into()),
        }
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<BulkRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every document received so far, across requests.
    pub fn documents(&self) -> Vec<MetricDoc> {
        self.requests()
            .iter()
            .flat_map(BulkRequest::documents)
            .collect()
    }
}

impl BulkTransport for VecTransport {
    fn send(
        &self,
        index: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.requests.lock().unwrap().push(BulkRequest {
            index: index.to_owned(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        let result = match &self.fail_with {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        };
        std::future::ready(result)
    }
}

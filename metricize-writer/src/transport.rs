// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

/// Boxed error returned by a [`BulkTransport`].
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Delivers bulk request bodies to a store.
///
/// A transport must report partial failures (e.g. a bulk response with
/// per-item errors) as an error: the writer treats `Ok` as "every document
/// in `body` was accepted".
pub trait BulkTransport {
    /// Send one NDJSON bulk body whose documents all target `index`.
    fn send(
        &self,
        index: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

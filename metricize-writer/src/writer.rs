// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use metricize_core::MetricDoc;

use crate::buffer::BulkBuffer;
use crate::error::WriteError;
use crate::metadata::RollupMetadata;
use crate::transport::BulkTransport;

/// Default size at which a bulk body is sent, 512 KiB.
pub const DEFAULT_BULK_LIMIT: usize = 512 * 1024;

/// Stamps rolled-up documents and sends them to one index in size-limited bulk requests.
///
/// A body is sent as soon as it reaches the byte limit, so a single request
/// may exceed the limit by at most one document.
///
/// # Example
/// ```
/// # tokio_test_block_on(async {
/// use std::time::Duration;
/// use metricize_core::MetricDoc;
/// use metricize_writer::{BulkWriter, RollupMetadata, test_util::VecTransport};
///
/// let transport = VecTransport::default();
/// let metadata = RollupMetadata::new(Duration::from_secs(600));
/// let mut writer = BulkWriter::new(transport.clone(), metadata.data_stream(), metadata);
/// let written = writer.write_all([MetricDoc::default()]).await.unwrap();
/// assert_eq!(written, 1);
/// assert_eq!(transport.requests().len(), 1);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct BulkWriter<T> {
    transport: T,
    index: String,
    metadata: RollupMetadata,
    buffer: BulkBuffer,
    limit: usize,
    written: usize,
}

impl<T: BulkTransport> BulkWriter<T> {
    /// Create a writer targeting `index` with the default bulk limit.
    pub fn new(transport: T, index: impl Into<String>, metadata: RollupMetadata) -> Self {
        Self {
            transport,
            index: index.into(),
            metadata,
            buffer: BulkBuffer::default(),
            limit: DEFAULT_BULK_LIMIT,
            written: 0,
        }
    }

    /// Set the body size, in bytes, at which a bulk request is sent.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The target index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Documents successfully sent so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Stamp `doc` with the rollup metadata and buffer it, sending the body
    /// once it reaches the limit.
    pub async fn write(&mut self, mut doc: MetricDoc) -> Result<(), WriteError> {
        self.metadata.stamp(&mut doc);
        self.buffer.push(&doc)?;
        if self.buffer.len() >= self.limit {
            self.flush().await?;
        }
        Ok(())
    }

    /// Send whatever is buffered. Does nothing when the buffer is empty.
    pub async fn flush(&mut self) -> Result<(), WriteError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let docs = self.buffer.docs();
        let body = self.buffer.take();
        tracing::debug!(index = %self.index, docs, bytes = body.len(), "sending bulk request");
        self.transport
            .send(&self.index, body)
            .await
            .map_err(|source| WriteError::Transport {
                index: self.index.clone(),
                docs,
                source,
            })?;
        self.written += docs;
        Ok(())
    }

    /// Write every document in `docs`, then flush. Returns the number of
    /// documents written by this call.
    pub async fn write_all(
        &mut self,
        docs: impl IntoIterator<Item = MetricDoc>,
    ) -> Result<usize, WriteError> {
        let before = self.written + self.buffer.docs();
        for doc in docs {
            self.write(doc).await?;
        }
        self.flush().await?;
        let count = self.written - before;
        tracing::info!(count, index = %self.index, "indexed metrics docs");
        Ok(count)
    }

    /// Consume the writer, returning the transport. Buffered documents that
    /// were never flushed are dropped.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

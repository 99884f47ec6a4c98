// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use metricize_core::MetricDoc;

const CREATE_ACTION: &[u8] = b"{\"create\":{}}\n";

/// Newline-delimited bulk request body under construction.
///
/// Each document is preceded by a `create` action line. The target index is
/// carried by the request path, so the action line is always the same.
#[derive(Debug, Clone, Default)]
pub struct BulkBuffer {
    buf: Vec<u8>,
    docs: usize,
}

impl BulkBuffer {
    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            docs: 0,
        }
    }

    /// Append the action line and JSON body for `doc`.
    ///
    /// On error the buffer is left as it was.
    pub fn push(&mut self, doc: &MetricDoc) -> Result<(), serde_json::Error> {
        let start = self.buf.len();
        self.buf.extend_from_slice(CREATE_ACTION);
        if let Err(err) = serde_json::to_writer(&mut self.buf, doc) {
            self.buf.truncate(start);
            return Err(err);
        }
        self.buf.push(b'\n');
        self.docs += 1;
        Ok(())
    }

    /// Size of the body in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no document has been pushed since the last clear.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of documents in the body.
    pub fn docs(&self) -> usize {
        self.docs
    }

    /// The encoded body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the encoded body, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        let capacity = self.buf.capacity().min(MAX_RETAINED_CAPACITY);
        self.docs = 0;
        std::mem::replace(&mut self.buf, Vec::with_capacity(capacity))
    }

    /// Discard the body.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.docs = 0;
        // don't hold on to an oversized body forever
        self.buf.shrink_to(MAX_RETAINED_CAPACITY);
    }
}

const MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

#[cfg(test)]
mod tests {
    use assert2::check;
    use metricize_core::{DurationHistogram, MetricDoc};

    use super::BulkBuffer;

    #[test]
    fn encodes_action_and_document_lines() {
        let mut doc = MetricDoc::default();
        doc.transaction.name = "GET /".into();
        doc.transaction.duration_histogram = DurationHistogram::from_pairs([(1, 1)]);

        let mut buffer = BulkBuffer::default();
        buffer.push(&doc).unwrap();
        buffer.push(&doc).unwrap();
        check!(buffer.docs() == 2);

        let body = String::from_utf8(buffer.take()).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        check!(lines.len() == 4);
        check!(lines[0] == r#"{"create":{}}"#);
        check!(lines[2] == r#"{"create":{}}"#);
        let decoded: MetricDoc = serde_json::from_str(lines[1]).unwrap();
        check!(decoded == doc);
        check!(body.ends_with('\n'));

        check!(buffer.is_empty());
        check!(buffer.docs() == 0);
    }

    #[test]
    fn clear_discards_everything() {
        let mut buffer = BulkBuffer::with_capacity(16);
        buffer.push(&MetricDoc::default()).unwrap();
        check!(!buffer.is_empty());
        buffer.clear();
        check!(buffer.len() == 0);
        check!(buffer.as_bytes().is_empty());
    }
}

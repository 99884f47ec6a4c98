// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::transport::TransportError;

/// Failure while writing rolled-up documents.
#[derive(Debug)]
pub enum WriteError {
    /// A document could not be serialized.
    Encode(serde_json::Error),
    /// The transport rejected a bulk body.
    Transport {
        /// The index the body was sent to.
        index: String,
        /// Number of documents in the rejected body.
        docs: usize,
        /// Error reported by the transport.
        source: TransportError,
    },
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(_) => f.write_str("failed to encode metric document"),
            Self::Transport { index, docs, .. } => {
                write!(f, "failed to index {docs} metric documents into {index}")
            }
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Transport { source, .. } => Some(source.as_ref()),
        }
    }
}

impl From<serde_json::Error> for WriteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

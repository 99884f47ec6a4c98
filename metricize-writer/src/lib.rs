// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod buffer;
mod error;
mod metadata;
mod transport;
mod writer;

#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

pub use buffer::BulkBuffer;
pub use error::WriteError;
pub use metadata::{DATA_STREAM_PREFIX, OBSERVER_VERSION, PeriodLabel, ROLLUP_METRICSET, RollupMetadata};
pub use transport::{BulkTransport, TransportError};
pub use writer::{BulkWriter, DEFAULT_BULK_LIMIT};

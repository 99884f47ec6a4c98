// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod cli;
pub mod elasticsearch;
pub mod rollup;
pub mod source;
pub mod window;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! weft-flowdoc: versioned serialization of weft flows.
//!
//! Flows encode to a schema-tagged JSON document; routines are rebuilt on
//! load through registered factories, and old document versions are lifted
//! through a migration chain.

pub mod document;
pub mod error;
pub mod factory;
pub mod migrate;

pub use document::{
    decode_document, deserialize_flow, encode_flow, policy_from_doc, policy_to_doc,
    serialize_flow, ConnectionDoc, FlowDocument, PolicyDoc, RoutineDoc, DOC_VERSION,
};
pub use error::DocumentError;
pub use factory::FactoryRegistry;
pub use migrate::{document_version, MigrationRegistry};

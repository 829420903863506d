#![doc = "bbup-core: core logic library for bbup."]

//! This crate holds everything bbup does that is not terminal glue: the
//! bucket profile model, the on-disk configuration store, the storage
//! contract, and the upload dispatcher that moves bytes from a local path or
//! a remote URL into a bucket.
//!
//! # Usage
//! The `bbup` binary wires a concrete [`contract::Storage`] implementation
//! (the B2 native API client) into [`dispatch`]. Tests use
//! `contract::MockStorage`, exported behind the default `test-export-mocks`
//! feature.

pub mod contract;
pub mod dispatch;
pub mod error;
pub mod profile;
pub mod progress;
pub mod remote;
pub mod size;
pub mod store;
pub mod validate;

#![deny(missing_docs)]

//! # OpenAPI Helpers
//!
//! - **pointer**: RFC 6901 JSON Pointers.
//! - **ref_utils**: splitting and resolving `$ref` values.
//! - **version**: version detection and relocation routing.

pub mod pointer;
pub mod ref_utils;
pub mod version;

//! Test helpers shared across the workspace.
//!
//! [`fixtures`] holds record types and factories reused by several suites;
//! [`jail`] wraps `figment::Jail` for configuration tests.

pub mod fixtures;
pub mod jail;

//! Integration test crate for Draftsmith.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every draftsmith crate to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod golden;

#[cfg(test)]
mod properties;

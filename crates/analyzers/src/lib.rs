//! Built-in Laravel security rules.
//!
//! Every rule implements [`engine::Rule`] and reads its tunables from the
//! `[rules.<id>]` table of the scan configuration. [`default_rules`] builds
//! the enabled catalog for a [`loader::ScanConfig`].

pub mod catalog;
pub mod rules;
mod support;

pub use catalog::{all_rules, default_rules, rule_ids};

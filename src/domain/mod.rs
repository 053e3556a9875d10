//! Domain layer containing the design flow's business logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `design` - Project aggregate, stages, steps, and structured data
//! - `flow` - Classifier, validator, and strategy selection

pub mod design;
pub mod flow;
pub mod foundation;

//! PBL Flow - Conversational Stage Flow Engine
//!
//! Guides an educator through designing a project-based learning unit, one
//! step at a time, across the Ideation, Journey, and Deliverables stages.
//! The engine owns all progression; an AI backend only supplies wording.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

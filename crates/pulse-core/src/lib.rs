//! # pulse-core
//!
//! Foundation types for the Pulse telemetry pipeline.
//!
//! This crate provides the shared vocabulary that all other Pulse crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::VisitorId`], [`ids::SessionToken`] as newtypes
//! - **Operations**: [`ops::Operation`] — one pending backend write
//! - **Paths**: [`paths`] — hierarchical backend key builders and hygiene
//! - **Bucketing**: [`bucket::bucket`] — deterministic experiment assignment
//! - **Traffic**: [`traffic::classify`] — landing traffic-source classifier
//! - **Events**: [`events::DomainEvent`] — adapter input vocabulary
//! - **Config**: [`config`] — fixed timing and threshold constants
//!
//! Foundation crate. Depended on by all other pulse crates.

pub mod bucket;
pub mod config;
pub mod events;
pub mod ids;
pub mod ops;
pub mod paths;
pub mod traffic;

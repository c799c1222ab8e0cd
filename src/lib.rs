//! Paysoko customer-service assistant.
//!
//! Answers questions about office locations, services, appointments and
//! opening hours from a Neo4j knowledge graph. [`qa::QaChain`] holds the
//! pipeline; [`subsystems::comms`] exposes it over HTTP and a console.

pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod logger;
pub mod qa;
pub mod qa_log;
pub mod subsystems;

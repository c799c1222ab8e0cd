//! Graph-backed question answering for Paysoko customers.

pub mod answer;
pub mod chain;
pub mod corrector;
pub mod cypher;
pub mod entities;
pub mod mapping;
pub mod prompt;

pub use chain::{QaAnswer, QaChain, QaOptions};
pub use corrector::{CypherQueryCorrector, Validated};
pub use entities::PaysokoEntities;

//! shardgate - SELECT planning core for a sharding SQL gateway
//!
//! Decides which physical shards a query reads and how their results are
//! merged. Parsing, execution and connection handling live elsewhere.

pub mod catalog;
pub mod cli;
pub mod observability;
pub mod planner;
pub mod rule;

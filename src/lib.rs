pub mod conditions;
pub mod config;
pub mod entity;
pub mod error;
pub mod remote;
pub mod search;
pub mod server;
pub mod service;
pub mod sparql;

pub use conditions::{Condition, ConditionBuilder, ConditionKind, ConditionSet, PriorityKey};
pub use config::Config;
pub use error::{Result, SimilarError};
pub use search::{Phase, SearchOrchestrator, SearchReport};
pub use service::{find_similar, SimilarityRequest};
pub use sparql::{QueryBuilder, QueryRunner};

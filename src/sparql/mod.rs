//! SPARQL query assembly and execution.

mod builder;
mod runner;

pub use builder::QueryBuilder;
pub use runner::{entity_id_from_uri, parse_bindings, QueryRunner, SparqlQueryRunner};

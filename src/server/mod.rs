//! HTTP front end: `GET /similar?entityId=Q42&limit=3` returns a JSON array of ids.

mod http;

pub use http::{create_router, run, AppState, SimilarParams};

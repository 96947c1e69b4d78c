// Job-posting ingestion: URL validation, safe fetching, HTML normalization,
// metadata hints, the parser chain and result finalization.
// All completion-service calls go through llm_client.

pub mod fetcher;
pub mod handlers;
pub mod metadata;
pub mod models;
pub mod network;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod tables;
pub mod text;
pub mod validator;

pub mod aliases;
pub mod cache;
pub mod chain;
pub mod corpus;
pub mod filter;
pub mod pipeline;
pub mod scoring;
pub mod taxonomy;
pub mod trigram;

// Recommendation core: candidate parsing, rejection memory and the resolve/re-prompt engine.
// All generation goes through llm_client, all catalog access through catalog::resolver.

pub mod cancel;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod rejection;

#[cfg(test)]
pub mod testing;

//! # sqlwright assistant
//!
//! The surface callers use: [`SqlAssistant::generate`] and
//! [`SqlAssistant::fix`], plus provider health, usage and configuration.
//!
//! A request flows through:
//!
//! 1. **Normalize**: validate and fill provider, model, token ceiling and
//!    temperature from configuration
//! 2. **Classify**: dialect from the context hints, error category for fixes
//! 3. **Budget**: split the model's context window across the components
//! 4. **Assemble**: render retrieved candidates into each allocation
//! 5. **Dispatch**: call the provider and extract a structured answer

mod assistant;
mod plan;

pub use assistant::{ProviderSummary, SqlAssistant};

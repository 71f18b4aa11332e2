//! Text-generation providers for sqlwright.
//!
//! All backends implement the `sqlwright_core::Backend` trait. The
//! [`ProviderRegistry`] owns them, applies the request deadline and
//! cancellation, records usage, and turns raw model output into a
//! structured answer through [`extract`].

pub mod anthropic;
pub mod extract;
mod http;
pub mod openai_compat;
pub mod registry;

pub use anthropic::AnthropicBackend;
pub use extract::{Extraction, Strategy, extract};
pub use openai_compat::OpenAiCompatBackend;
pub use registry::{DispatchRequest, ProviderRegistry, build_backend, default_base_url};

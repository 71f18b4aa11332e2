//! Prompt text for sqlwright.
//!
//! [`system_prompt`] picks the generation or repair template for a dialect
//! and error category. The [`user`] module composes the per-request user
//! message around the assembled context.

pub mod dialects;
pub mod guidance;
pub mod templates;
pub mod user;

pub use templates::{fix_prompt, generation_prompt, system_prompt};
pub use user::{FixPromptInput, fix_user_prompt, generation_user_prompt};

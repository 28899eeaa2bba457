//! Umbrella crate for ferrochain.
//!
//! ```ignore
//! use ferrochain::prelude::*;
//! ```

pub use ferrochain_core as core;
pub use ferrochain_prompt as prompt;

#[cfg(feature = "agent")]
pub use ferrochain_agent as agent;

pub mod prelude;

pub mod context;
pub mod injection_defense;
pub mod relay;
pub mod system_prompt;

pub use relay::{ChatRelay, Outcome, OutcomeKind};

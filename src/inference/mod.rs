pub mod client;
pub mod traits;

pub use client::InferenceClient;
pub use traits::CompletionProvider;

//! LLM integration crate for NoteWise.
//!
//! Provider-agnostic abstraction over Large Language Models. The generation
//! engine only sees [`LlmClient`]; concrete providers are picked at startup
//! by [`create_client`].
//!
//! # Providers
//! - **OpenAI**: chat completions API (default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use notewise_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;

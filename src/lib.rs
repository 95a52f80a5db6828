pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod client;
use serde::{Deserialize, Serialize};

/*

im making a small async-only rust client called askgemini;
one typed request path to the google gemini generateContent
api, a console hello binary that prints a single answer, and
a tiny web form (ask a question, see the model's answer).

askgemini/
├── Cargo.toml          # Main manifest
├── src/
│   ├── lib.rs          # Re-exports and main documentation
│   ├── error.rs        # Custom error types and handling
│   ├── config.rs       # Client configuration and credential loading
│   ├── client.rs       # Main backend interface
│   ├── providers/      # Provider implementation
│   │   ├── mod.rs      # Re-exports the gemini provider
│   │   └── gemini.rs   # Gemini REST client and wire types
│   ├── request.rs      # Unified request/response types
│   └── bin/
│       ├── hello_gemini.rs  # Console: one prompt, print the answer
│       └── webform.rs       # Q&A web form around the same call
└── tests/              # Integration tests (canned + live)

*/

/// ASKGEMINI API INTERFACE:

// ===== Generate =====

pub type GenerateReply
  = Result<crate::request::GenerationResponse, crate::error::Error>;
pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateReply>;

pub struct GenerateArgs
{   pub request: crate::request::GenerationRequest
  , pub model: Option<String>
  , pub reply: GenerateReplySender
}

// ===== GetModels =====

pub type GetModelsReply
  = Result<Vec<ModelInfo>, crate::error::Error>;
pub type GetModelsReplySender
  = tokio::sync::mpsc::UnboundedSender<GetModelsReply>;

pub struct GetModelsArgs
{   pub reply: GetModelsReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== GeminiHand (sender side) =====

pub struct GeminiHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub get_models_tx
      : tokio::sync::mpsc::UnboundedSender<GetModelsArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== GeminiFoot (receiver side) =====

pub struct GeminiFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub get_models_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetModelsArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// ASKGEMINI STRUCTURES:

/// Information about a Gemini model as reported by the models API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelInfo
{   /// Model name without the "models/" resource prefix
    pub name: String
  , /// Human-readable name (e.g. "Gemini 1.5 Flash")
    pub display_name: Option<String>
  , /// Maximum context window (in tokens)
    pub max_context_tokens: usize
  , /// Maximum tokens the model can generate in response
    pub max_response_tokens: usize
  , /// Whether the model accepts generateContent calls
    pub supports_generation: bool
}

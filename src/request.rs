//! Unified request and response types for askgemini

use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional sampling controls forwarded to the endpoint.
/// Unset values are omitted from the outbound payload so the
/// endpoint defaults apply; set values are forwarded exactly,
/// including 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams
{   /// Sampling temperature
    pub temperature: Option<f32>
  , /// Nucleus sampling cutoff
    pub top_p: Option<f32>
  , /// Top-k sampling cutoff
    pub top_k: Option<u32>
}

impl GenerationParams
{   /// True when every control is unset
    pub fn is_unset(&self) -> bool
    {   self.temperature.is_none()
          && self.top_p.is_none()
          && self.top_k.is_none()
    }
}

/// Unified generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// The prompt text (must be non-empty)
    pub prompt: String
  , /// Sampling controls
    pub params: GenerationParams
}

impl GenerationRequest
{   /// Request with default sampling
    pub fn new(prompt: impl Into<String>) -> Self
    {   GenerationRequest
        {   prompt: prompt.into()
          , params: GenerationParams::default()
        }
    }
}

/// Unified generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse
{   /// Generated text (may be empty)
    pub text: String
  , /// Feedback metadata, when the service reported any
    pub feedback: Option<PromptFeedback>
  , /// Why the model stopped (e.g. "STOP", "MAX_TOKENS")
    pub finish_reason: Option<String>
}

/// Service-provided explanation for blocked or filtered output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFeedback
{   /// Block reason (e.g. "SAFETY"), if the prompt was refused
    pub block_reason: Option<String>
  , /// Per-category safety ratings
    pub safety_ratings: Vec<SafetyRating>
}

impl PromptFeedback
{   /// True when the service reported nothing at all
    pub fn is_empty(&self) -> bool
    {   self.block_reason.is_none()
          && self.safety_ratings.is_empty()
    }
}

impl fmt::Display for PromptFeedback
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match &self.block_reason
        {   Some(reason) => write!(f, "block_reason={}", reason)?
          , None => write!(f, "block_reason=none")?
        }
        for rating in &self.safety_ratings
        {   write!(f,
              ", {}={}",
              rating.category,
              rating.probability
            )?;
        }
        Ok(())
    }
}

/// One safety rating entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRating
{   /// Harm category (e.g. "HARM_CATEGORY_HARASSMENT")
    pub category: String
  , /// Probability bucket (e.g. "NEGLIGIBLE", "HIGH")
    pub probability: String
}

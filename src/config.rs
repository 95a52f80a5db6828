//! Configuration for the Gemini client and credential loading

use serde::{Deserialize, Serialize};

/// Env var holding the Gemini API credential
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig
{   /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Request timeout in seconds
    pub timeout_secs: u64
  , /// Model used when a call does not name one
    pub default_model: Option<String>
}

impl Default for ClientConfig
{   fn default() -> Self
    {   ClientConfig
        {   api_base: None
          , timeout_secs: 30
          , default_model: None
        }
    }
}

/// Read the API key from GOOGLE_API_KEY.
/// Absence is a startup error; no request may be made without it.
pub fn api_key_from_env()
  -> Result<String, crate::error::Error>
{   api_key_from_var(API_KEY_ENV)
}

/// Read the API key from an arbitrary env var.
/// A set-but-blank value counts as missing.
pub fn api_key_from_var(var: &str)
  -> Result<String, crate::error::Error>
{   match std::env::var(var)
    {   Ok(value) if !value.trim().is_empty() => Ok(value)
      , _ => Err(crate::error::Error::MissingApiKey(
          var.to_string()
        ))
    }
}

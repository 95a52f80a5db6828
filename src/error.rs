use std::fmt;

/// Custom error type for askgemini operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key env var is missing or blank
    MissingApiKey(String)
  , /// Prompt text was empty
    EmptyPrompt
  , /// Generation refused by the service; carries the feedback
    ContentBlocked(crate::request::PromptFeedback)
  , /// Connection-level failure (DNS, TLS, socket)
    Transport(String)
  , /// API returned a non-success HTTP status
    ApiError
    {   status: u16
      , message: String
    }
  , /// Failed to parse API response
    ParseError(String)
  , /// No candidates in API response
    NoCandidatesInResponse
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(var) => {
              write!(f,
                "Missing API key: {} is not set or is blank",
                var
              )
            }
          , Error::EmptyPrompt => {
              write!(f, "Prompt text must not be empty")
            }
          , Error::ContentBlocked(feedback) => {
              write!(f, "Generation blocked: {}", feedback)
            }
          , Error::Transport(msg) => {
              write!(f, "Transport error: {}", msg)
            }
          , Error::ApiError { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoCandidatesInResponse => {
              write!(f, "API response contained no candidates")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

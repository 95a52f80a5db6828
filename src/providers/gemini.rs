use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use log::{debug, trace, error, info};

const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default)]
    pub parts: Vec<Part>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub prompt_feedback: Option<PromptFeedbackData>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
  , #[serde(default)]
    pub safety_ratings: Vec<SafetyRatingData>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedbackData
{   #[serde(default)]
    pub block_reason: Option<String>
  , #[serde(default)]
    pub safety_ratings: Vec<SafetyRatingData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyRatingData
{   pub category: String
  , pub probability: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse
{   #[serde(default)]
    pub models: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData
{   pub name: String
  , #[serde(default)]
    pub display_name: Option<String>
  , #[serde(default)]
    pub input_token_limit: Option<usize>
  , #[serde(default)]
    pub output_token_limit: Option<usize>
  , #[serde(default)]
    pub supported_generation_methods: Vec<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody
{   pub error: ApiErrorDetail
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail
{   pub message: String
  , #[serde(default)]
    pub status: Option<String>
}

// ===== Wire Mapping =====

/// Build the outbound payload for a generation request.
/// generationConfig is omitted entirely when no control is set,
/// so endpoint defaults apply; a set value (0.0 included) is
/// forwarded exactly.
pub fn wire_request(
  request: &crate::request::GenerationRequest
) -> GenerateContentRequest
{   let generation_config = if request.params.is_unset()
    {   None
    } else
    {   Some(GenerationConfig
        {   temperature: request.params.temperature
          , top_p: request.params.top_p
          , top_k: request.params.top_k
        })
    };

    GenerateContentRequest
    {   contents: vec![
          Content
          {   parts: vec![
                Part
                {   text: Some(request.prompt.clone())
                }
              ]
            , role: Some("user".to_string())
          }
        ]
      , generation_config
    }
}

pub fn feedback_from_wire(
  data: PromptFeedbackData
) -> crate::request::PromptFeedback
{   crate::request::PromptFeedback
    {   block_reason: data.block_reason
      , safety_ratings: data.safety_ratings
          .into_iter()
          .map(rating_from_wire)
          .collect()
    }
}

pub fn rating_from_wire(
  data: SafetyRatingData
) -> crate::request::SafetyRating
{   crate::request::SafetyRating
    {   category: data.category
      , probability: data.probability
    }
}

/// Map a 200 response body into a generation result.
/// A blockReason in the prompt feedback, or a safety-stopped
/// candidate with no text, becomes ContentBlocked carrying the
/// feedback metadata.
pub fn into_generation(
  response: GenerateContentResponse
) -> Result<crate::request::GenerationResponse, crate::error::Error>
{   let feedback = response.prompt_feedback
      .map(feedback_from_wire);

    if let Some(fb) = &feedback
    {   if fb.block_reason.is_some()
        {   error!("Prompt blocked: {}", fb);
            return Err(crate::error::Error::ContentBlocked(
              fb.clone()
            ));
        }
    }

    let candidate = match response.candidates.into_iter().next()
    {   Some(candidate) => candidate
      , None => {
          return match feedback
          {   Some(fb) if !fb.is_empty() => {
                error!("No candidates, feedback: {}", fb);
                Err(crate::error::Error::ContentBlocked(fb))
              }
            , _ => {
                error!("No candidates in response");
                Err(crate::error::Error::NoCandidatesInResponse)
              }
          };
        }
    };

    let text = candidate.content
      .map(|content| {
        content.parts
          .into_iter()
          .filter_map(|part| part.text)
          .collect::<Vec<_>>()
          .join("")
      })
      .unwrap_or_default();

    if text.is_empty()
      && candidate.finish_reason.as_deref() == Some("SAFETY")
    {   let fb = crate::request::PromptFeedback
        {   block_reason: candidate.finish_reason
          , safety_ratings: candidate.safety_ratings
              .into_iter()
              .map(rating_from_wire)
              .collect()
        };
        error!("Candidate blocked: {}", fb);
        return Err(crate::error::Error::ContentBlocked(fb));
    }

    Ok(crate::request::GenerationResponse
    {   text
      , feedback
      , finish_reason: candidate.finish_reason
    })
}

pub fn model_info_from_wire(
  data: ModelData
) -> crate::ModelInfo
{   let name = data.name
      .strip_prefix("models/")
      .unwrap_or(&data.name)
      .to_string();

    crate::ModelInfo
    {   name
      , display_name: data.display_name
      , max_context_tokens: data.input_token_limit
          .unwrap_or(0)
      , max_response_tokens: data.output_token_limit
          .unwrap_or(0)
      , supports_generation: data
          .supported_generation_methods
          .iter()
          .any(|method| method == "generateContent")
    }
}

// ===== HTTP Seam =====

/// The raw endpoint calls, kept behind a trait so tests can
/// substitute canned responses for the live network.
#[async_trait]
pub trait GeminiApi: Send + Sync
{   async fn generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, crate::error::Error>;

    async fn list_models(
      &self
    ) -> Result<ModelsResponse, crate::error::Error>;
}

/// Live implementation over reqwest
pub struct HttpGeminiApi
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl HttpGeminiApi
{   pub fn new(
      api_key: String
    , config: &crate::config::ClientConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating HttpGeminiApi");
        let http_client = reqwest::Client::builder()
          .timeout(std::time::Duration::from_secs(
            config.timeout_secs
          ))
          .build()
          .map_err(|e| {
            error!("HTTP client build failed: {}", e);
            crate::error::Error::InvalidConfiguration(
              e.to_string()
            )
          })?;

        let api_base = config.api_base
          .clone()
          .unwrap_or_else(|| GEMINI_API_BASE.to_string());

        Ok(HttpGeminiApi
        {   api_key
          , api_base
          , http_client
        })
    }
}

fn transport_error(e: reqwest::Error) -> crate::error::Error
{   if e.is_timeout()
    {   crate::error::Error::Timeout
    } else
    {   crate::error::Error::Transport(e.to_string())
    }
}

async fn api_error(
  response: reqwest::Response
) -> crate::error::Error
{   let status = response.status().as_u16();
    let error_text = response.text().await
      .unwrap_or_else(|_|
        "Unknown error".to_string()
      );
    error!("Gemini API error ({}): {}", status, error_text);

    let message = serde_json::from_str::<ApiErrorBody>(&error_text)
      .map(|body| body.error.message)
      .unwrap_or(error_text);

    crate::error::Error::ApiError
    {   status
      , message
    }
}

#[async_trait]
impl GeminiApi for HttpGeminiApi
{   async fn generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, crate::error::Error>
    {   let url = format!(
          "{}/models/{}:generateContent",
          self.api_base, model
        );
        trace!("Gemini request: {:?}", request);

        let response = self.http_client
          .post(&url)
          .header("x-goog-api-key", &self.api_key)
          .header("Content-Type", "application/json")
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            transport_error(e)
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if !status.is_success()
        {   return Err(api_error(response).await);
        }

        let content_response: GenerateContentResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        Ok(content_response)
    }

    async fn list_models(
      &self
    ) -> Result<ModelsResponse, crate::error::Error>
    {   let url = format!("{}/models", self.api_base);

        let response = self.http_client
          .get(&url)
          .header("x-goog-api-key", &self.api_key)
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            transport_error(e)
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);

        if !status.is_success()
        {   return Err(api_error(response).await);
        }

        let models_response: ModelsResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        Ok(models_response)
    }
}

// ===== Gemini Client Actor =====

/// Commands for GeminiClient actor
pub enum GeminiCommand
{   Generate
    {   model: String
      , request: crate::request::GenerationRequest
      , reply: mpsc::UnboundedSender<crate::GenerateReply>
    }
  , GetModels
    {   reply: mpsc::UnboundedSender<crate::GetModelsReply>
    }
  , Shutdown
}

/// Gemini client state
pub struct GeminiClientState
{   api: Box<dyn GeminiApi>
}

impl GeminiClientState
{   pub fn new(
      api_key: String
    , config: &crate::config::ClientConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiClientState");
        let api = HttpGeminiApi::new(api_key, config)?;
        Ok(GeminiClientState
        {   api: Box::new(api)
        })
    }

    pub fn with_api(api: Box<dyn GeminiApi>) -> Self
    {   debug!("Creating GeminiClientState with custom api");
        GeminiClientState
        {   api
        }
    }

    async fn handle_generate(
      &self
    , model: String
    , request: crate::request::GenerationRequest
    ) -> Result<
        crate::request::GenerationResponse,
        crate::error::Error
      >
    {   debug!("Handling generate for: {}", model);

        // Rejected here so nothing reaches the network
        if request.prompt.trim().is_empty()
        {   error!("Empty prompt rejected");
            return Err(crate::error::Error::EmptyPrompt);
        }

        let wire = wire_request(&request);
        let response = self.api
          .generate_content(&model, &wire)
          .await?;
        into_generation(response)
    }

    async fn handle_get_models(
      &self
    ) -> Result<Vec<crate::ModelInfo>, crate::error::Error>
    {   debug!("Handling get_models");

        let response = self.api.list_models().await?;
        let models: Vec<crate::ModelInfo>
          = response.models
            .into_iter()
            .map(model_info_from_wire)
            .collect();

        debug!("Retrieved {} models", models.len());
        Ok(models)
    }
}

/// Public Gemini client interface
pub struct GeminiClient
{   tx: mpsc::UnboundedSender<GeminiCommand>
  , _task: tokio::task::JoinHandle<()>
}

impl GeminiClient
{   /// Create and spawn a client over the live endpoint
    pub fn new(
      api_key: String
    , config: &crate::config::ClientConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiClient");
        let state = GeminiClientState::new(api_key, config)?;
        Ok(Self::spawn(state))
    }

    /// Create and spawn a client over a substitute api,
    /// e.g. a canned test double
    pub fn with_api(api: Box<dyn GeminiApi>) -> Self
    {   debug!("Creating GeminiClient with custom api");
        Self::spawn(GeminiClientState::with_api(api))
    }

    fn spawn(state: GeminiClientState) -> Self
    {   let (cmd_tx, cmd_rx)
          = mpsc::unbounded_channel();

        let _task = tokio::spawn(async move {
          run_gemini_loop(cmd_rx, state).await;
        });

        GeminiClient
        {   tx: cmd_tx
          , _task
        }
    }

    /// Queue a generation - returns immediately
    pub async fn generate(
      &self
    , model: String
    , request: crate::request::GenerationRequest
    , reply: mpsc::UnboundedSender<crate::GenerateReply>
    ) -> Result<(), crate::error::Error>
    {   debug!("generate queued for model: {}", model);

        self.tx.send(GeminiCommand::Generate {
          model,
          request,
          reply,
        }).map_err(|_| {
          error!("Gemini client disconnected");
          crate::error::Error::Other(
            "Gemini client disconnected".to_string()
          )
        })
    }

    /// Queue get_models request
    pub async fn get_available_models(
      &self
    , reply: mpsc::UnboundedSender<crate::GetModelsReply>
    ) -> Result<(), crate::error::Error>
    {   debug!("get_available_models queued");

        self.tx.send(GeminiCommand::GetModels {
          reply,
        }).map_err(|_| {
          error!("Gemini client disconnected");
          crate::error::Error::Other(
            "Gemini client disconnected".to_string()
          )
        })
    }

    /// Shutdown the client
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down GeminiClient");
        self.tx.send(GeminiCommand::Shutdown)
          .map_err(|_| {
            crate::error::Error::Other(
              "Client already shutdown".to_string()
            )
          })
    }
}

/// Main gemini event loop
async fn run_gemini_loop(
  mut cmd_rx: mpsc::UnboundedReceiver<GeminiCommand>
, state: GeminiClientState
)
{   debug!("Starting Gemini client loop");

    loop
    { match cmd_rx.recv().await
      {   Some(GeminiCommand::Generate {
            model, request, reply
          }) => {
            debug!("Processing Generate");
            let result = state
              .handle_generate(model, request)
              .await;
            let _ = reply.send(result);
          }
        , Some(GeminiCommand::GetModels { reply }) => {
            debug!("Processing GetModels");
            let result = state.handle_get_models().await;
            let _ = reply.send(result);
          }
        , Some(GeminiCommand::Shutdown) => {
            info!("Gemini client shutting down");
            break;
          }
        , None => {
            debug!("Command channel closed");
            break;
          }
      }
    }
}

/// Default model info for Gemini
pub fn default_model_info() -> crate::ModelInfo
{   crate::ModelInfo
    {   name: "gemini-1.5-flash".to_string()
      , display_name: Some("Gemini 1.5 Flash".to_string())
      , max_context_tokens: 1048576
      , max_response_tokens: 8192
      , supports_generation: true
    }
}

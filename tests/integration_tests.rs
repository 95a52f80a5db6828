use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use askgemini::client::GeminiBackend;
use askgemini::config::ClientConfig;
use askgemini::error::Error;
use askgemini::providers::gemini::{
  Candidate, Content, GeminiApi, GeminiClient,
  GenerateContentRequest, GenerateContentResponse, ModelData,
  ModelsResponse, Part, PromptFeedbackData, SafetyRatingData,
  into_generation, model_info_from_wire,
};
use askgemini::request::{GenerationParams, GenerationRequest};

// ===== Test Doubles =====

fn canned_response(text: &str) -> GenerateContentResponse
{   GenerateContentResponse
    {   candidates: vec![
          Candidate
          {   content: Some(Content
              {   parts: vec![
                    Part
                    {   text: Some(text.to_string())
                    }
                  ]
                , role: Some("model".to_string())
              })
            , finish_reason: Some("STOP".to_string())
            , safety_ratings: vec![]
          }
        ]
      , prompt_feedback: None
    }
}

fn canned_models() -> ModelsResponse
{   ModelsResponse
    {   models: vec![
          ModelData
          {   name: "models/gemini-1.5-flash".to_string()
            , display_name: Some(
                "Gemini 1.5 Flash".to_string()
              )
            , input_token_limit: Some(1048576)
            , output_token_limit: Some(8192)
            , supported_generation_methods: vec![
                "generateContent".to_string()
              ]
          }
        , ModelData
          {   name: "models/embedding-001".to_string()
            , display_name: Some("Embedding 001".to_string())
            , input_token_limit: Some(2048)
            , output_token_limit: Some(1)
            , supported_generation_methods: vec![
                "embedContent".to_string()
              ]
          }
        ]
    }
}

/// Always answers with a fixed text
struct CannedApi
{   text: String
}

#[async_trait]
impl GeminiApi for CannedApi
{   async fn generate_content(
      &self
    , _model: &str
    , _request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   Ok(canned_response(&self.text))
    }

    async fn list_models(&self)
      -> Result<ModelsResponse, Error>
    {   Ok(canned_models())
    }
}

/// Refuses every prompt with safety feedback
struct BlockedApi;

#[async_trait]
impl GeminiApi for BlockedApi
{   async fn generate_content(
      &self
    , _model: &str
    , _request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   Ok(GenerateContentResponse
        {   candidates: vec![]
          , prompt_feedback: Some(PromptFeedbackData
            {   block_reason: Some("SAFETY".to_string())
              , safety_ratings: vec![
                  SafetyRatingData
                  {   category: "HARM_CATEGORY_DANGEROUS_CONTENT"
                        .to_string()
                    , probability: "HIGH".to_string()
                  }
                ]
            })
        })
    }

    async fn list_models(&self)
      -> Result<ModelsResponse, Error>
    {   Ok(canned_models())
    }
}

/// Fails every call at the connection level
struct FailingApi;

#[async_trait]
impl GeminiApi for FailingApi
{   async fn generate_content(
      &self
    , _model: &str
    , _request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   Err(Error::Transport(
          "connection refused".to_string()
        ))
    }

    async fn list_models(&self)
      -> Result<ModelsResponse, Error>
    {   Err(Error::Transport(
          "connection refused".to_string()
        ))
    }
}

/// Records the outbound payload of the last generate call
struct RecordingApi
{   last_request: Arc<Mutex<Option<GenerateContentRequest>>>
}

#[async_trait]
impl GeminiApi for RecordingApi
{   async fn generate_content(
      &self
    , _model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   let mut guard = self.last_request.lock()
          .expect("lock poisoned");
        *guard = Some(request.clone());
        Ok(canned_response("recorded"))
    }

    async fn list_models(&self)
      -> Result<ModelsResponse, Error>
    {   Ok(canned_models())
    }
}

// ===== Helpers =====

async fn recv_reply<T>(
  mut rx: mpsc::UnboundedReceiver<T>
) -> Option<T>
{   tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .ok()
      .flatten()
}

async fn generate_via(
  api: Box<dyn GeminiApi>
, request: GenerationRequest
) -> Result<askgemini::request::GenerationResponse, Error>
{   let client = GeminiClient::with_api(api);
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    client
      .generate(
        "gemini-1.5-flash".to_string(),
        request,
        reply_tx
      )
      .await
      .expect("queueing should succeed");
    let result = recv_reply(reply_rx)
      .await
      .expect("reply should arrive");
    let _ = client.shutdown().await;
    result
}

// ===== Generation Path =====

#[tokio::test]
async fn test_canned_generate_returns_text()
{   let result = generate_via(
      Box::new(CannedApi
      {   text: "Gemini is a family of models.".to_string()
      }),
      GenerationRequest::new("What is Google Gemini?")
    ).await;

    let response = result.expect("generation should succeed");
    assert!(
      !response.text.is_empty(),
      "Response text should not be empty"
    );
    assert_eq!(
      response.finish_reason.as_deref(),
      Some("STOP")
    );
}

#[tokio::test]
async fn test_blocked_prompt_returns_feedback()
{   let result = generate_via(
      Box::new(BlockedApi),
      GenerationRequest::new("something the service refuses")
    ).await;

    match result
    {   Err(Error::ContentBlocked(feedback)) => {
          assert!(
            !feedback.is_empty(),
            "Feedback metadata should not be empty"
          );
          assert_eq!(
            feedback.block_reason.as_deref(),
            Some("SAFETY")
          );
          assert_eq!(feedback.safety_ratings.len(), 1);
        }
      , other => panic!(
          "Expected ContentBlocked, got {:?}", other
        )
    }
}

#[tokio::test]
async fn test_transport_failure_is_not_a_block()
{   let result = generate_via(
      Box::new(FailingApi),
      GenerationRequest::new("any prompt")
    ).await;

    match result
    {   Err(Error::Transport(msg)) => {
          assert!(msg.contains("connection refused"));
        }
      , other => panic!(
          "Expected Transport error, got {:?}", other
        )
    }
}

#[tokio::test]
async fn test_empty_prompt_rejected_before_any_call()
{   let last_request = Arc::new(Mutex::new(None));
    let api = RecordingApi
    {   last_request: last_request.clone()
    };

    let result = generate_via(
      Box::new(api),
      GenerationRequest::new("   ")
    ).await;

    assert_eq!(result.unwrap_err(), Error::EmptyPrompt);
    assert!(
      last_request.lock().unwrap().is_none(),
      "No request may reach the api for an empty prompt"
    );
}

// ===== Parameter Pass-Through =====

#[tokio::test]
async fn test_temperature_zero_forwarded_exactly()
{   let last_request = Arc::new(Mutex::new(None));
    let api = RecordingApi
    {   last_request: last_request.clone()
    };

    let request = GenerationRequest
    {   prompt: "deterministic please".to_string()
      , params: GenerationParams
        {   temperature: Some(0.0)
          , top_p: None
          , top_k: None
        }
    };

    generate_via(Box::new(api), request)
      .await
      .expect("generation should succeed");

    let recorded = last_request.lock().unwrap()
      .clone()
      .expect("request should be recorded");
    let config = recorded.generation_config.as_ref()
      .expect("generationConfig should be present");
    assert_eq!(config.temperature, Some(0.0));
    assert_eq!(config.top_p, None);
    assert_eq!(config.top_k, None);

    // And the wire payload carries the zero, not a default
    let json = serde_json::to_string(&recorded).unwrap();
    assert!(
      json.contains("\"temperature\":0.0"),
      "Payload should carry temperature 0.0: {}",
      json
    );
    assert!(!json.contains("topP"));
    assert!(!json.contains("topK"));
}

#[tokio::test]
async fn test_unset_params_omit_generation_config()
{   let last_request = Arc::new(Mutex::new(None));
    let api = RecordingApi
    {   last_request: last_request.clone()
    };

    generate_via(
      Box::new(api),
      GenerationRequest::new("use endpoint defaults")
    )
      .await
      .expect("generation should succeed");

    let recorded = last_request.lock().unwrap()
      .clone()
      .expect("request should be recorded");
    assert!(
      recorded.generation_config.is_none(),
      "Unset params must not produce a generationConfig"
    );

    let json = serde_json::to_string(&recorded).unwrap();
    assert!(!json.contains("generationConfig"));
}

// ===== Wire Mapping =====

#[tokio::test]
async fn test_response_body_maps_to_text()
{   let body = r#"{
      "candidates": [
        {
          "content": {
            "parts": [{"text": "Gemini is "}, {"text": "a model."}],
            "role": "model"
          },
          "finishReason": "STOP",
          "safetyRatings": [
            {"category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE"}
          ]
        }
      ]
    }"#;

    let response: GenerateContentResponse
      = serde_json::from_str(body).unwrap();
    let generation = into_generation(response)
      .expect("body should map to a generation");
    assert_eq!(generation.text, "Gemini is a model.");
    assert_eq!(
      generation.finish_reason.as_deref(),
      Some("STOP")
    );
}

#[tokio::test]
async fn test_blocked_body_maps_to_content_blocked()
{   let body = r#"{
      "promptFeedback": {
        "blockReason": "SAFETY",
        "safetyRatings": [
          {"category": "HARM_CATEGORY_HATE_SPEECH", "probability": "HIGH"}
        ]
      }
    }"#;

    let response: GenerateContentResponse
      = serde_json::from_str(body).unwrap();
    match into_generation(response)
    {   Err(Error::ContentBlocked(feedback)) => {
          assert_eq!(
            feedback.block_reason.as_deref(),
            Some("SAFETY")
          );
          assert_eq!(
            feedback.safety_ratings[0].probability,
            "HIGH"
          );
        }
      , other => panic!(
          "Expected ContentBlocked, got {:?}", other
        )
    }
}

#[tokio::test]
async fn test_empty_body_maps_to_no_candidates()
{   let response: GenerateContentResponse
      = serde_json::from_str("{}").unwrap();
    assert_eq!(
      into_generation(response).unwrap_err(),
      Error::NoCandidatesInResponse
    );
}

#[tokio::test]
async fn test_model_info_strips_resource_prefix()
{   let models = canned_models().models;
    let infos: Vec<askgemini::ModelInfo> = models
      .into_iter()
      .map(model_info_from_wire)
      .collect();

    assert_eq!(infos[0].name, "gemini-1.5-flash");
    assert!(infos[0].supports_generation);
    assert_eq!(infos[0].max_context_tokens, 1048576);
    assert_eq!(infos[1].name, "embedding-001");
    assert!(!infos[1].supports_generation);
}

// ===== Credential Loading =====

#[test]
fn test_missing_api_key_is_a_startup_error()
{   let result = askgemini::config::api_key_from_var(
      "ASKGEMINI_TEST_KEY_THAT_IS_NEVER_SET"
    );
    assert_eq!(
      result.unwrap_err(),
      Error::MissingApiKey(
        "ASKGEMINI_TEST_KEY_THAT_IS_NEVER_SET".to_string()
      )
    );
}

#[test]
fn test_blank_api_key_counts_as_missing()
{   std::env::set_var("ASKGEMINI_TEST_KEY_BLANK", "   ");
    let result = askgemini::config::api_key_from_var(
      "ASKGEMINI_TEST_KEY_BLANK"
    );
    assert!(matches!(
      result,
      Err(Error::MissingApiKey(_))
    ));
}

#[test]
fn test_present_api_key_loads()
{   std::env::set_var("ASKGEMINI_TEST_KEY_SET", "sk-test");
    let result = askgemini::config::api_key_from_var(
      "ASKGEMINI_TEST_KEY_SET"
    );
    assert_eq!(result.unwrap(), "sk-test");
}

// ===== Backend =====

#[tokio::test]
async fn test_backend_initialization()
{   let backend = GeminiBackend::new(
      "test-key".to_string(),
      ClientConfig::default()
    ).expect("backend should build");
    println!("Backend created successfully");

    let result = backend.shutdown().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_backend_rejects_empty_prompt_offline()
{   // Validation fires before the network, so a fake key
    // never gets the chance to fail
    let backend = GeminiBackend::new(
      "test-key".to_string(),
      ClientConfig::default()
    ).unwrap();

    let result = backend
      .respond(
        "".to_string(),
        GenerationParams::default()
      )
      .await;
    assert_eq!(result.unwrap_err(), Error::EmptyPrompt);

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_get_models_with_double()
{   let client = GeminiClient::with_api(Box::new(CannedApi
    {   text: "unused".to_string()
    }));

    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    client.get_available_models(reply_tx)
      .await
      .expect("queueing should succeed");

    let models = recv_reply(reply_rx)
      .await
      .expect("reply should arrive")
      .expect("listing should succeed");
    assert_eq!(models.len(), 2);

    let _ = client.shutdown().await;
}

// ===== Live API (requires GOOGLE_API_KEY) =====

#[tokio::test]
#[ignore]
async fn test_live_hello_gemini()
{   let api_key = match askgemini::config::api_key_from_env()
    {   Ok(key) => key
      , Err(e) => {
          println!("Skipping: {}", e);
          return;
        }
    };

    let backend = GeminiBackend::new(
      api_key,
      ClientConfig::default()
    ).unwrap();

    match backend
      .respond(
        "What is Google Gemini?".to_string(),
        GenerationParams::default()
      )
      .await
    {   Ok(text) => {
          println!("Response: {}", text);
          assert!(
            !text.is_empty(),
            "Response should not be empty"
          );
        }
      , Err(e) => {
          panic!("Live generation failed: {}", e);
        }
    }

    let _ = backend.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn test_live_get_models()
{   let api_key = match askgemini::config::api_key_from_env()
    {   Ok(key) => key
      , Err(e) => {
          println!("Skipping: {}", e);
          return;
        }
    };

    let backend = GeminiBackend::new(
      api_key,
      ClientConfig::default()
    ).unwrap();

    let reply_rx = backend.get_models().await.unwrap();
    if let Some(result) = recv_reply(reply_rx).await
    {   match result
        {   Ok(models) => {
              println!("Retrieved {} models", models.len());
              for model in &models
              {   println!("  - {}", model.name);
              }
              assert!(!models.is_empty());
            }
          , Err(e) => {
              panic!("Error fetching models: {}", e);
            }
        }
    }

    let _ = backend.shutdown().await;
}

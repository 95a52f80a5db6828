use std::time::Duration;
use tokio::sync::mpsc;
use log::{debug, error, info};
use crate::GeminiFoot;

/// Backend state for routing generation requests
pub struct GeminiBackendState
{   pub current_model: crate::ModelInfo
  , pub gemini_client: crate::providers::gemini::GeminiClient
}

impl GeminiBackendState
{   /// Create a new backend state; the credential is required
    /// up front, there is no process-wide fallback
    pub fn new(
      api_key: String
    , config: &crate::config::ClientConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Initializing GeminiBackendState");
        let gemini_client
          = crate::providers::gemini::GeminiClient::new(
              api_key,
              config
            )?;

        let current_model = match &config.default_model
        {   Some(name) => crate::ModelInfo
            {   name: name.clone()
              , ..crate::providers::gemini::default_model_info()
            }
          , None => crate::providers::gemini::default_model_info()
        };

        Ok(GeminiBackendState
        {   current_model
          , gemini_client
        })
    }
}

/// Public API for the askgemini backend - owns the task
pub struct GeminiBackend
{   hand: crate::GeminiHand
  , reply_timeout: Duration
  , _task_handle: tokio::task::JoinHandle<()>
}

impl GeminiBackend
{   /// Create and spawn a new backend
    /// Returns immediately - spawns background task
    pub fn new(
      api_key: String
    , config: crate::config::ClientConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiBackend with task ownership");

        let state = GeminiBackendState::new(api_key, &config)?;

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (get_models_tx, get_models_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::GeminiHand
        {   generate_tx: generate_tx.clone()
          , get_models_tx: get_models_tx.clone()
          , kill_process_tx: kill_process_tx.clone()
        };

        let foot = crate::GeminiFoot
        {   generate_rx
          , get_models_rx
          , kill_process_rx
        };

        // Reply waits get a little headroom over the HTTP
        // timeout so the transport deadline fires first
        let reply_timeout
          = Duration::from_secs(config.timeout_secs + 5);

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, state).await
        });

        Ok(GeminiBackend
        {   hand
          , reply_timeout
          , _task_handle
        })
    }

    /// Queue a generation - returns almost immediately
    pub async fn generate(
      &self
    , request: crate::request::GenerationRequest
    , model: Option<String>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply>,
        crate::error::Error
      >
    {   debug!("generate queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   request
          , model
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Get model lists - returns almost immediately
    pub async fn get_models(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GetModelsReply>,
        crate::error::Error
      >
    {   debug!("get_models queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GetModelsArgs
        {   reply: reply_tx
        };

        self.hand.get_models_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Ask the default model and wait for the generated text.
    /// One prompt in, one answer (or tagged failure) out.
    pub async fn respond(
      &self
    , prompt: String
    , params: crate::request::GenerationParams
    ) -> Result<String, crate::error::Error>
    {   debug!("respond awaiting generation");
        let request = crate::request::GenerationRequest
        {   prompt
          , params
        };

        let mut reply_rx = self.generate(request, None).await?;

        match tokio::time::timeout(
          self.reply_timeout,
          reply_rx.recv()
        ).await
        {   Ok(Some(result)) => {
              result.map(|response| response.text)
            }
          , Ok(None) => {
              error!("Reply channel closed");
              Err(crate::error::Error::Other(
                "Backend dropped the reply".to_string()
              ))
            }
          , Err(_) => {
              error!("Timed out waiting for generation");
              Err(crate::error::Error::Timeout)
            }
        }
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down GeminiBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// Design: tokio::select! is ONLY for fast queueing.
/// Each select arm immediately routes to the gemini client
/// and returns. No awaiting on work.
async fn run_backend_loop(
  foot: crate::GeminiFoot
, state: GeminiBackendState
)
{   debug!("Starting GeminiBackend event loop");
    let GeminiFoot
    {   mut generate_rx
      , mut get_models_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          let model = cmd.model
            .unwrap_or_else(||
              state.current_model.name.clone()
            );
          debug!("Received Generate for model: {}", model);

          let _ = state.gemini_client
            .generate(
              model,
              cmd.request,
              cmd.reply
            )
            .await;
        }
      , Some(cmd) = get_models_rx.recv() => {
          debug!("Received GetModels");
          let _ = state.gemini_client
            .get_available_models(cmd.reply)
            .await;
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("GeminiBackend shutting down");
          break;
        }
      }
    }
}

//! Console hello: one prompt to Gemini, the answer on stdout

use log::{error, info};

#[tokio::main]
async fn main()
{   env_logger::init();

    // Credential is required before anything touches the network
    let api_key = match askgemini::config::api_key_from_env()
    {   Ok(key) => key
      , Err(e) => {
          error!("Startup failed: {}", e);
          eprintln!("hello_gemini: {}", e);
          std::process::exit(1);
        }
    };

    let backend = match askgemini::client::GeminiBackend::new(
      api_key,
      askgemini::config::ClientConfig::default()
    )
    {   Ok(backend) => backend
      , Err(e) => {
          error!("Startup failed: {}", e);
          eprintln!("hello_gemini: {}", e);
          std::process::exit(1);
        }
    };

    match backend
      .respond(
        "What is Google Gemini?".to_string(),
        askgemini::request::GenerationParams::default()
      )
      .await
    {   Ok(text) => {
          println!("{}", text);
        }
      , Err(askgemini::error::Error::ContentBlocked(feedback)) => {
          error!("Generation blocked: {}", feedback);
          println!("Generation blocked: {}", feedback);
        }
      , Err(e) => {
          error!("Generation failed: {}", e);
          eprintln!("hello_gemini: {}", e);
          let _ = backend.shutdown().await;
          std::process::exit(1);
        }
    }

    info!("Done");
    let _ = backend.shutdown().await;
}

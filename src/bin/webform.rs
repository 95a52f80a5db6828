//! Q&A web form around the Gemini responder.
//! One text input, one submit, the answer rendered below.

use std::sync::Arc;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use log::{error, info};
use serde::Deserialize;

const BIND_ENV: &str = "ASKGEMINI_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Deserialize)]
struct AskForm
{   prompt_text: String
}

#[tokio::main]
async fn main()
{   env_logger::init();

    // Credential is required before anything touches the network
    let api_key = match askgemini::config::api_key_from_env()
    {   Ok(key) => key
      , Err(e) => {
          error!("Startup failed: {}", e);
          eprintln!("webform: {}", e);
          std::process::exit(1);
        }
    };

    let backend = match askgemini::client::GeminiBackend::new(
      api_key,
      askgemini::config::ClientConfig::default()
    )
    {   Ok(backend) => Arc::new(backend)
      , Err(e) => {
          error!("Startup failed: {}", e);
          eprintln!("webform: {}", e);
          std::process::exit(1);
        }
    };

    let app = Router::new()
      .route("/", get(form_page).post(ask))
      .with_state(backend);

    let bind = std::env::var(BIND_ENV)
      .unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let listener = match tokio::net::TcpListener::bind(&bind).await
    {   Ok(listener) => listener
      , Err(e) => {
          error!("Failed to bind {}: {}", bind, e);
          eprintln!("webform: failed to bind {}: {}", bind, e);
          std::process::exit(1);
        }
    };

    info!("Listening on http://{}", bind);
    println!("askgemini web form on http://{}", bind);

    if let Err(e) = axum::serve(listener, app).await
    {   error!("Server error: {}", e);
        eprintln!("webform: server error: {}", e);
        std::process::exit(1);
    }
}

async fn form_page() -> Html<String>
{   Html(render_page(None))
}

/// One request per submission; no queuing, no session state
async fn ask(
  State(backend): State<Arc<askgemini::client::GeminiBackend>>
, Form(submitted): Form<AskForm>
) -> Html<String>
{   info!("Form submission received");

    // The form always asks at temperature 0.0
    let params = askgemini::request::GenerationParams
    {   temperature: Some(0.0)
      , top_p: None
      , top_k: None
    };

    let outcome = match backend
      .respond(submitted.prompt_text, params)
      .await
    {   Ok(text) => {
          format!(
            "<h2>Answer</h2>\n<pre>{}</pre>",
            escape_html(&text)
          )
        }
      , Err(askgemini::error::Error::ContentBlocked(feedback)) => {
          error!("Generation blocked: {}", feedback);
          format!(
            "<h2>Blocked</h2>\n<p>{}</p>",
            escape_html(&feedback.to_string())
          )
        }
      , Err(e) => {
          error!("Generation failed: {}", e);
          format!(
            "<h2>Error</h2>\n<p>{}</p>",
            escape_html(&e.to_string())
          )
        }
    };

    Html(render_page(Some(&outcome)))
}

fn render_page(outcome: Option<&str>) -> String
{   format!(
      concat!(
        "<!doctype html>\n",
        "<html>\n<head>\n",
        "<title>Ask Gemini: Q&amp;A Demo with Google Gemini</title>\n",
        "</head>\n<body>\n",
        "<h1>Q&amp;A with Google Gemini</h1>\n",
        "<form method=\"post\" action=\"/\">\n",
        "<label for=\"prompt_text\">Your Question?</label><br>\n",
        "<textarea id=\"prompt_text\" name=\"prompt_text\" ",
        "rows=\"6\" cols=\"80\"></textarea><br>\n",
        "<button type=\"submit\">Go!</button>\n",
        "</form>\n",
        "{}\n",
        "</body>\n</html>\n"
      ),
      outcome.unwrap_or("")
    )
}

fn escape_html(text: &str) -> String
{   text
      .replace('&', "&amp;")
      .replace('<', "&lt;")
      .replace('>', "&gt;")
      .replace('"', "&quot;")
      .replace('\'', "&#39;")
}

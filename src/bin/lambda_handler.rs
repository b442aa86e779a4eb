//! AWS Lambda handler for deal evaluation
//!
//! Accepts a JSON request naming an action and a set of assumptions, runs it
//! through the return engine and answers with JSON.
//!
//! Supports Lambda Function URLs for direct HTTP access.

use aws_lambda_events::event::lambda_function_urls::LambdaFunctionUrlRequest;
use cre_returns::{AssumptionPatch, DealAssumptions, EngineConfig, ReturnEngine};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Action {
    /// Headline metrics only
    ComputeOutputs,
    /// Full projection with annual rows
    Evaluate,
    Scenarios,
    Optimize,
    Validate,
}

/// Input payload
#[derive(Debug, Deserialize)]
struct EngineRequest {
    action: Action,
    assumptions: DealAssumptions,

    /// Suggested changes applied on top of `assumptions`
    #[serde(default)]
    patch: Option<AssumptionPatch>,

    /// Required for `optimize`
    #[serde(default)]
    target_irr: Option<f64>,
}

fn response(status: u16, body: &Value) -> Value {
    json!({
        "statusCode": status,
        "headers": {
            "Content-Type": "application/json",
            "Access-Control-Allow-Origin": "*",
            "Access-Control-Allow-Methods": "POST, OPTIONS",
            "Access-Control-Allow-Headers": "Content-Type",
        },
        "body": body.to_string(),
    })
}

fn error_body(message: impl std::fmt::Display) -> Value {
    json!({ "error": message.to_string() })
}

/// Run one request body through the engine, returning status and JSON body
fn respond(engine: &ReturnEngine, body: &str) -> (u16, Value) {
    let request: EngineRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return (400, error_body(format!("Invalid JSON: {}", e))),
    };

    let assumptions = match &request.patch {
        Some(patch) => request.assumptions.apply_patch(patch),
        None => request.assumptions,
    };

    let result = match request.action {
        Action::ComputeOutputs => engine.compute_outputs(&assumptions).map(|m| json!(m)),
        Action::Evaluate => engine.evaluate(&assumptions).map(|e| json!(e)),
        Action::Scenarios => engine.generate_scenarios(&assumptions).map(|s| json!(s)),
        Action::Optimize => match request.target_irr {
            Some(target) => engine.optimize_for_irr(&assumptions, target).map(|r| json!(r)),
            None => return (400, error_body("target_irr is required for optimize")),
        },
        Action::Validate => Ok(json!(engine.validate(&assumptions))),
    };

    match result {
        Ok(value) => (200, value),
        Err(e) => {
            warn!("{:?} rejected: {}", request.action, e);
            (422, error_body(e))
        }
    }
}

/// Lambda handler function
async fn handler(engine: &ReturnEngine, event: LambdaEvent<LambdaFunctionUrlRequest>) -> Result<Value, Error> {
    let request = event.payload;

    // Handle CORS preflight
    if request.request_context.http.method.as_deref() == Some("OPTIONS") {
        return Ok(response(200, &Value::Null));
    }

    if request.is_base64_encoded {
        return Ok(response(400, &error_body("binary request bodies are not supported")));
    }

    let body = request.body.unwrap_or_else(|| "{}".to_string());
    let (status, value) = respond(engine, &body);
    info!("request handled with status {}", status);
    Ok(response(status, &value))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let engine = ReturnEngine::new(EngineConfig::from_env()?)?;
    let engine = &engine;
    run(service_fn(move |event| async move { handler(engine, event).await })).await
}

//! Request command

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use keel_platform::{Diagnostics, HttpOptions, PlatformClient, Request};

use crate::cli::RequestArgs;
use crate::output;

pub async fn run(args: RequestArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config)?;
    let client = PlatformClient::new(&config)?;
    let request = build_request(&args)?;
    let options = if args.allow_404 {
        HttpOptions::allow_404()
    } else {
        HttpOptions::default()
    };

    let ctx = super::operation_context(args.timeout);
    let mut diags = Diagnostics::new();
    let outcome = client.execute(&ctx, &request, options, &mut diags).await;

    let status = outcome
        .status()
        .map(|code| code.to_string())
        .unwrap_or_else(|| "no response".to_string());
    output::kv("status", &status);
    if !outcome.body().is_empty() {
        println!("{}", pretty_body(outcome.body()));
    }
    output::diagnostics(&diags);

    if outcome.ok() {
        Ok(())
    } else {
        Err(anyhow!("{} {} failed", args.method, args.path))
    }
}

fn build_request(args: &RequestArgs) -> Result<Request> {
    let request = Request::new(args.method, args.path.clone());

    if let Some(json) = &args.json {
        let value: serde_json::Value =
            serde_json::from_str(json).context("--json is not valid JSON")?;
        return Ok(request.json(&value));
    }

    if let Some(file) = &args.yaml_file {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file))?;
        return Ok(request.yaml_text(text));
    }

    Ok(request)
}

/// Pretty-print JSON bodies, pass anything else through
fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

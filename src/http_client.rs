use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const AGENT: &str = "pickwire/0.1";

pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build http client")
}

/// GET a provider payload. Non-2xx statuses become errors carrying a short body snippet.
pub fn fetch_body(client: &Client, url: &str, headers: &[(&str, &str)]) -> Result<String> {
    let mut req = client.get(url).header(USER_AGENT, AGENT);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        let snippet = body
            .trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(220)
            .collect::<String>();
        return Err(anyhow::anyhow!("http {}: {}", status, snippet));
    }
    Ok(body)
}

use crate::utils::error::{EtlError, Result};
use reqwest::{Client, Response};
use std::time::Duration;

pub fn build_client(user_agent: &str, timeout_seconds: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// Turns a non-2xx response into [`EtlError::HttpStatusError`]. `url` is what
/// gets reported, so callers pass a form without credentials.
pub fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EtlError::HttpStatusError {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

pub async fn get_text(client: &Client, url: &str) -> Result<String> {
    tracing::debug!("GET {}", url);
    let response = ensure_success(client.get(url).send().await?, url)?;
    Ok(response.text().await?)
}

pub async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    tracing::debug!("GET {}", url);
    let response = ensure_success(client.get(url).send().await?, url)?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_text_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200).body("<html></html>");
        });

        let client = build_client("test-agent", 5).unwrap();
        let body = get_text(&client, &server.url("/page")).await.unwrap();

        mock.assert();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let client = build_client("test-agent", 5).unwrap();
        let err = get_bytes(&client, &server.url("/missing")).await.unwrap_err();

        match err {
            EtlError::HttpStatusError { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error: {other}"),
        }
    }
}

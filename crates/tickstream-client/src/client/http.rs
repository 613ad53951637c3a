//! HTTP side of the client: a [`Connector`] that opens the stream over
//! reqwest, and an [`ActionClient`] for the request/response actions.

use crate::client::error::{ClientError, Result};
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use reqwest::{Client, Response, Url, header};
use serde::de::DeserializeOwned;
use tickstream::Connector;
use tickstream_wire::{
    ErrorBody, INCREMENT_PATH, IncrementRequest, IncrementResponse, SERVER_DATE_PATH,
    STREAM_CONTENT_TYPE, STREAM_PATH, SUBMIT_FORM_PATH, ServerDateResponse, SubmitFormResponse,
    THROW_ERROR_PATH,
};

/// Resolves one of the wire paths against the server's base URL.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| ClientError::InvalidUrl(format!("{base} + {path}: {e}")))
}

/// Opens the sequence stream with a plain `GET`.
///
/// Only a `2xx` answer with the stream content type counts as connected. Body
/// read failures surface as [`tickstream::Error::Transport`], which the
/// consumer treats as end of stream.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    url: Url,
}

impl HttpConnector {
    pub fn new(client: Client, base: &Url) -> Result<Self> {
        Ok(Self {
            client,
            url: endpoint(base, STREAM_PATH)?,
        })
    }
}

impl Connector for HttpConnector {
    type Body = BoxStream<'static, tickstream::Result<Bytes>>;

    async fn connect(&self) -> tickstream::Result<Self::Body> {
        tracing::debug!(url = %self.url, "opening stream");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| tickstream::Error::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorBody>().await {
                Ok(body) => tickstream_wire::Error::from(body).to_string(),
                Err(_) => String::from("no error body"),
            };
            return Err(tickstream::Error::UnexpectedResponse(format!(
                "{status}: {detail}"
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if content_type != STREAM_CONTENT_TYPE {
            return Err(tickstream::Error::UnexpectedResponse(format!(
                "expected content type `{STREAM_CONTENT_TYPE}`, got `{content_type}`"
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| tickstream::Error::Transport(e.to_string())))
            .boxed())
    }
}

/// Calls the server's actions.
#[derive(Debug, Clone)]
pub struct ActionClient {
    client: Client,
    base: Url,
}

impl ActionClient {
    pub const fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub async fn increment(&self, number: i64) -> Result<i64> {
        let response = self
            .client
            .post(endpoint(&self.base, INCREMENT_PATH)?)
            .json(&IncrementRequest { number })
            .send()
            .await?;
        let body: IncrementResponse = read_json(response).await?;
        Ok(body.number)
    }

    /// Succeeds only if the server unexpectedly does.
    pub async fn throw_error(&self) -> Result<()> {
        let response = self
            .client
            .post(endpoint(&self.base, THROW_ERROR_PATH)?)
            .send()
            .await?;
        read_json::<serde::de::IgnoredAny>(response).await?;
        Ok(())
    }

    pub async fn server_date(&self) -> Result<String> {
        let response = self
            .client
            .get(endpoint(&self.base, SERVER_DATE_PATH)?)
            .send()
            .await?;
        let body: ServerDateResponse = read_json(response).await?;
        Ok(body.date)
    }

    pub async fn submit_form(&self, fields: &[(String, String)]) -> Result<bool> {
        let response = self
            .client
            .post(endpoint(&self.base, SUBMIT_FORM_PATH)?)
            .form(fields)
            .send()
            .await?;
        let body: SubmitFormResponse = read_json(response).await?;
        Ok(body.success)
    }
}

/// Decodes a success body as `T`, or an error body as the server's error.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => Err(ClientError::Server(body.into())),
        Err(_) => Err(ClientError::Status(status)),
    }
}

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Response, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    client::{error::ClientError, store::LocalStore},
    models::{
        quiz::QuizDetail, quiz_attempt::SubmitAttemptResponse, quiz_session::SessionTicket,
    },
};

/// Body of `POST /api/quizzes/{id}/submit` as the client sends it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// Only questions the participant answered.
    pub answers: BTreeMap<i64, String>,
    /// Milliseconds left when the submission was triggered, clamped at 0.
    pub time_remaining: i64,
    pub session_id: String,
}

/// Server operations an attempt session needs.
#[async_trait]
pub trait QuizApi: Send + Sync {
    async fn start_session(&self, quiz_id: i64) -> Result<SessionTicket, ClientError>;

    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizDetail, ClientError>;

    async fn submit(
        &self,
        quiz_id: i64,
        payload: &SubmissionPayload,
    ) -> Result<SubmitAttemptResponse, ClientError>;
}

/// `QuizApi` over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpQuizApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct QuizEnvelope {
    quiz: QuizDetail,
}

impl HttpQuizApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Builds the API from the credential saved in `store`.
    pub fn from_store(base_url: impl Into<String>, store: &LocalStore) -> Result<Self, ClientError> {
        let token = store.load_token()?.ok_or(ClientError::SignedOut)?;
        Ok(Self::new(base_url, token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Decodes a success body, or turns the server's `{"error": ...}` into `Rejected`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn start_session(&self, quiz_id: i64) -> Result<SessionTicket, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/quizzes/{}/sessions", quiz_id)))
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await?;
        decode(response).await
    }

    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizDetail, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/quizzes/{}/complete", quiz_id)))
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await?;
        let envelope: QuizEnvelope = decode(response).await?;
        Ok(envelope.quiz)
    }

    async fn submit(
        &self,
        quiz_id: i64,
        payload: &SubmissionPayload,
    ) -> Result<SubmitAttemptResponse, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/quizzes/{}/submit", quiz_id)))
            .header(header::AUTHORIZATION, self.bearer())
            .json(payload)
            .send()
            .await?;
        decode(response).await
    }
}

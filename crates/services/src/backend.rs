//! HTTP client for the remote quiz backend.
//!
//! Endpoints are resolved relative to a base URL:
//! - `GET kbcquestions` returns the question bank.
//! - `POST kbcusersresponse` stores a finished game.
//! - `GET kbcusersresponse?date=dd-mm-yyyy` returns that day's results.
//! - `POST users` registers a player.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use quiz_core::model::{PlayerProfile, Question, QuestionDraft, QuizResult};

use crate::error::{BackendError, SourceError};
use crate::game::{QuestionSource, ResultSink};

/// Backend requests give up after this long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

const DATE_FORMAT: &str = "%d-%m-%Y";

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(base_url.trim())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read `QUIZ_BACKEND_URL`. Unset or blank means no backend.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the variable is set but malformed.
    pub fn from_env() -> Result<Option<Self>, BackendError> {
        Self::from_raw(env::var("QUIZ_BACKEND_URL").ok())
    }

    fn from_raw(raw: Option<String>) -> Result<Option<Self>, BackendError> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Self::new(&raw).map(Some),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionDto {
    id: RawId,
    question: String,
    answer: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    remarks: Option<String>,
}

impl QuestionDto {
    fn into_draft(self) -> QuestionDraft {
        QuestionDraft {
            id: self.id.into_string(),
            prompt: self.question,
            correct_answer: self.answer,
            options: self.options,
            remark: self.remarks,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultPayload<'a> {
    session_id: String,
    name: &'a str,
    city: &'a str,
    mobile: &'a str,
    score: u64,
    percentage: u32,
    reason: &'static str,
    date: String,
    start_time: DateTime<Utc>,
    time: DateTime<Utc>,
    time_duration: u64,
}

impl<'a> ResultPayload<'a> {
    fn from_result(result: &'a QuizResult) -> Self {
        let player = result.player();
        Self {
            session_id: result.session_id().to_string(),
            name: player.name(),
            city: player.city(),
            mobile: player.mobile(),
            score: result.score(),
            percentage: result.percentage(),
            reason: result.reason().as_str(),
            date: result.date().format(DATE_FORMAT).to_string(),
            start_time: result.started_at(),
            time: result.finished_at(),
            time_duration: result.elapsed_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RegistrationPayload<'a> {
    fullname: &'a str,
    city: &'a str,
    mobilenumber: &'a str,
    time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DayResults {
    #[serde(rename = "usersAnswer", default)]
    users_answer: Vec<LeaderboardEntry>,
}

/// One row of a day's leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    #[serde(default)]
    pub city: String,
    pub score: u64,
    #[serde(default)]
    pub time: String,
    /// Seconds the game took.
    #[serde(default)]
    pub time_duration: f64,
}

/// Best score first; equal scores rank the faster game first.
pub fn rank_leaderboard(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.time_duration.total_cmp(&b.time_duration))
    });
}

//
// ─── CLIENT ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Fetch and validate the question bank.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failures, non-success statuses, or
    /// questions that fail validation.
    pub async fn fetch_questions(&self) -> Result<Vec<Question>, BackendError> {
        let response = self.client.get(self.endpoint("kbcquestions")?).send().await?;
        let response = ensure_success(response)?;
        let dtos: Vec<QuestionDto> = response.json().await?;

        let questions = dtos
            .into_iter()
            .map(|dto| dto.into_draft().validate())
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = questions.len(), "fetched questions from backend");
        Ok(questions)
    }

    /// # Errors
    ///
    /// Returns `BackendError` on transport failures or non-success statuses.
    pub async fn submit_result(&self, result: &QuizResult) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.endpoint("kbcusersresponse")?)
            .json(&ResultPayload::from_result(result))
            .send()
            .await?;
        ensure_success(response)?;
        tracing::info!(session = %result.session_id(), "result submitted");
        Ok(())
    }

    /// Results of the given day, ranked.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failures or non-success statuses.
    pub async fn leaderboard(&self, date: NaiveDate) -> Result<Vec<LeaderboardEntry>, BackendError> {
        let date = date.format(DATE_FORMAT).to_string();
        let response = self
            .client
            .get(self.endpoint("kbcusersresponse")?)
            .query(&[("date", date.as_str())])
            .send()
            .await?;
        let response = ensure_success(response)?;
        let days: Vec<DayResults> = response.json().await?;

        let mut entries = days
            .into_iter()
            .next()
            .map(|day| day.users_answer)
            .unwrap_or_default();
        rank_leaderboard(&mut entries);
        Ok(entries)
    }

    /// # Errors
    ///
    /// Returns `BackendError` on transport failures or non-success statuses.
    pub async fn register_player(
        &self,
        player: &PlayerProfile,
        registered_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let payload = RegistrationPayload {
            fullname: player.name(),
            city: player.city(),
            mobilenumber: player.mobile(),
            time: registered_at,
        };
        let response = self
            .client
            .post(self.endpoint("users")?)
            .json(&payload)
            .send()
            .await?;
        ensure_success(response)?;
        tracing::info!(name = player.name(), "player registered");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.config.base_url.join(path)?)
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(BackendError::HttpStatus(response.status()))
    }
}

#[async_trait]
impl QuestionSource for BackendClient {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        Ok(BackendClient::fetch_questions(self).await?)
    }
}

#[async_trait]
impl ResultSink for BackendClient {
    async fn submit_result(&self, result: &QuizResult) -> Result<(), BackendError> {
        BackendClient::submit_result(self, result).await
    }
}

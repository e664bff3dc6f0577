/// 考试后端 API 客户端
///
/// 封装题目获取和答卷提交两个 HTTP 接口
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{Question, SessionContext, SubmissionPayload};
use crate::services::{QuestionSource, SubmissionEndpoint};

/// 题目接口的响应外壳
#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    data: Vec<Question>,
}

/// 考试后端客户端
pub struct ExamApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ExamApiClient {
    /// 创建新的考试后端客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.submit_timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::api_request_failed("client builder", e))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// 题目接口地址
    pub fn questions_url(&self, exam_code: &str) -> String {
        format!("{}/api/exam/{}/questions", self.base_url, exam_code)
    }

    /// 提交接口地址
    pub fn submit_url(&self) -> String {
        format!("{}/api/exam/submit", self.base_url)
    }

    /// 把 reqwest 错误转换为带接口名的错误，超时单独区分
    fn request_error(&self, endpoint: &str, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            ApiError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
            .into()
        } else {
            AppError::api_request_failed(endpoint, err)
        }
    }

    /// 非 2xx 响应统一转成 `BadResponse`
    async fn ensure_success(endpoint: &str, response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.ok().filter(|body| !body.is_empty());
        Err(bad_response(endpoint, status, message))
    }
}

fn bad_response(endpoint: &str, status: StatusCode, message: Option<String>) -> AppError {
    ApiError::BadResponse {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message,
    }
    .into()
}

#[async_trait]
impl QuestionSource for ExamApiClient {
    async fn fetch_questions(&self, ctx: &SessionContext) -> AppResult<Vec<Question>> {
        let endpoint = "api/exam/questions";
        let url = self.questions_url(&ctx.exam_code);
        debug!("GET {} (lang={})", url, ctx.language);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lang", ctx.language.as_str()),
                ("mobile_number", ctx.candidate.mobile_number.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.request_error(endpoint, e))?;
        let response = Self::ensure_success(endpoint, response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(endpoint, e))?;
        let parsed: QuestionsResponse = serde_json::from_str(&body)?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl SubmissionEndpoint for ExamApiClient {
    async fn post_submission(&self, payload: &SubmissionPayload) -> AppResult<()> {
        let endpoint = "api/exam/submit";
        let url = self.submit_url();
        debug!("POST {} ({} 道作答)", url, payload.answers.len());

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.request_error(endpoint, e))?;
        Self::ensure_success(endpoint, response).await?;
        Ok(())
    }
}

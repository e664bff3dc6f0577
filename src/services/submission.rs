//! 提交服务 - 业务能力层
//!
//! 只负责"把这份答卷发出去并给结果分类"，不做任何清理，也不自动重试

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::{ApiError, AppError, AppResult};
use crate::models::{SubmissionOutcome, SubmissionPayload};

/// 提交接口
#[async_trait]
pub trait SubmissionEndpoint: Send + Sync {
    async fn post_submission(&self, payload: &SubmissionPayload) -> AppResult<()>;
}

/// 提交服务
///
/// 服务端不保证幂等，重复提交可能产生重复记录；
/// 单次飞行由控制器的阶段守卫保证，这里只负责超时和分类。
pub struct SubmissionService {
    endpoint: Arc<dyn SubmissionEndpoint>,
    timeout: Duration,
    attempts: AtomicU32,
}

impl SubmissionService {
    pub fn new(endpoint: Arc<dyn SubmissionEndpoint>, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            attempts: AtomicU32::new(0),
        }
    }

    /// 已发起的提交次数
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "📤 第 {} 次提交: {} 道题, 用时 {} 分钟, 原因: {}",
            attempt,
            payload.answers.len(),
            payload.time_taken_minutes,
            payload.reason
        );

        let result = match tokio::time::timeout(self.timeout, self.endpoint.post_submission(payload)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                endpoint: "api/exam/submit".to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
            .into()),
        };

        let outcome = classify(result);
        match &outcome {
            SubmissionOutcome::Success => info!("✓ 提交成功"),
            SubmissionOutcome::RetryableFailure(msg) => warn!("⚠️ 提交失败（可重试）: {}", msg),
            SubmissionOutcome::FatalFailure(msg) => error!("❌ 提交被拒绝: {}", msg),
        }
        outcome
    }
}

/// 把接口结果归类为 成功 / 可重试 / 不可恢复
pub fn classify(result: AppResult<()>) -> SubmissionOutcome {
    match result {
        Ok(()) => SubmissionOutcome::Success,
        Err(AppError::Api(api)) if api.is_permanent_rejection() => {
            SubmissionOutcome::FatalFailure(api.to_string())
        }
        Err(AppError::Api(ApiError::JsonParseFailed { source })) => {
            SubmissionOutcome::FatalFailure(format!("请求体无法序列化: {}", source))
        }
        Err(e) => SubmissionOutcome::RetryableFailure(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmitReason, SubmittedAnswer};
    use std::sync::Mutex;

    enum Behaviour {
        Accept,
        Reject(u16),
        Hang,
    }

    struct ScriptedEndpoint {
        behaviour: Behaviour,
        received: Mutex<Vec<SubmissionPayload>>,
    }

    impl ScriptedEndpoint {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SubmissionEndpoint for ScriptedEndpoint {
        async fn post_submission(&self, payload: &SubmissionPayload) -> AppResult<()> {
            self.received.lock().unwrap().push(payload.clone());
            match self.behaviour {
                Behaviour::Accept => Ok(()),
                Behaviour::Reject(status) => Err(ApiError::BadResponse {
                    endpoint: "api/exam/submit".to_string(),
                    status,
                    message: None,
                }
                .into()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            exam_code: "PY101".to_string(),
            language_code: "en".to_string(),
            candidate_name: "Asha".to_string(),
            father_name: "Ravi".to_string(),
            mobile_number: "9876543210".to_string(),
            answers: vec![SubmittedAnswer {
                question_id: 1,
                selected_option: crate::models::OptionLabel::A,
            }],
            time_taken_minutes: 5,
            reason: SubmitReason::ManualSubmit,
        }
    }

    #[tokio::test]
    async fn test_success() {
        let endpoint = ScriptedEndpoint::new(Behaviour::Accept);
        let service = SubmissionService::new(endpoint.clone(), Duration::from_secs(15));
        assert_eq!(service.submit(&payload()).await, SubmissionOutcome::Success);
        assert_eq!(endpoint.received.lock().unwrap().len(), 1);
        assert_eq!(service.attempts(), 1);
    }

    #[tokio::test]
    async fn test_validation_rejection_is_fatal() {
        let service = SubmissionService::new(ScriptedEndpoint::new(Behaviour::Reject(422)), Duration::from_secs(15));
        assert!(matches!(
            service.submit(&payload()).await,
            SubmissionOutcome::FatalFailure(_)
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let service = SubmissionService::new(ScriptedEndpoint::new(Behaviour::Reject(502)), Duration::from_secs(15));
        assert!(matches!(
            service.submit(&payload()).await,
            SubmissionOutcome::RetryableFailure(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retryable() {
        let service = SubmissionService::new(ScriptedEndpoint::new(Behaviour::Hang), Duration::from_secs(15));
        match service.submit(&payload()).await {
            SubmissionOutcome::RetryableFailure(msg) => assert!(msg.contains("超时")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

//! 会话级数据：考生身份、考试上下文、阶段与提交原因

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, SessionError, StorageError};
use crate::infrastructure::DurableStore;

/// 考生信息在本地存储中的键（由考前登记页面写入）
pub const CANDIDATE_INFO_KEY: &str = "candidateInfo";

/// 考生信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInfo {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mobile_number: String,
}

impl CandidateInfo {
    /// 三个字段都必须存在，手机号为 7-15 位数字（可带 +）
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.candidate_name.trim().is_empty() {
            return Err(SessionError::MissingCandidate {
                field: "candidate_name",
            });
        }
        if self.father_name.trim().is_empty() {
            return Err(SessionError::MissingCandidate {
                field: "father_name",
            });
        }
        if self.mobile_number.trim().is_empty() {
            return Err(SessionError::MissingCandidate {
                field: "mobile_number",
            });
        }
        if !mobile_pattern().is_match(self.mobile_number.trim()) {
            return Err(SessionError::InvalidMobile {
                mobile: self.mobile_number.clone(),
            });
        }
        Ok(())
    }
}

fn mobile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("mobile pattern is valid"))
}

/// 一次考试会话的只读上下文
///
/// 考前登记页面是唯一写入方，核心逻辑只读取。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub candidate: CandidateInfo,
    pub exam_code: String,
    pub language: String,
}

impl SessionContext {
    pub fn new(candidate: CandidateInfo, exam_code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            candidate,
            exam_code: exam_code.into(),
            language: language.into(),
        }
    }

    /// 从本地存储读取考生信息并校验
    pub fn from_store(
        store: &dyn DurableStore,
        exam_code: impl Into<String>,
        language: impl Into<String>,
    ) -> AppResult<Self> {
        let raw = store
            .get(CANDIDATE_INFO_KEY)?
            .ok_or(SessionError::MissingCandidate {
                field: "candidateInfo",
            })?;
        let candidate: CandidateInfo =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
                key: CANDIDATE_INFO_KEY.to_string(),
                detail: e.to_string(),
            })?;
        candidate.validate()?;
        Ok(Self::new(candidate, exam_code, language))
    }

    /// 答题草稿的存储键
    pub fn draft_key(&self) -> String {
        format!("answers_{}_{}", self.exam_code, self.language)
    }
}

/// 失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// 题目加载失败，会话无法开始
    LoadError,
    /// 提交遇到可重试错误（超时、网络、5xx）
    SubmissionRetryable,
    /// 提交被服务端明确拒绝
    SubmissionRejected,
}

/// 会话生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Bootstrapping,
    Active,
    Finalizing,
    Completed,
    Failed(FailureCause),
}

impl Phase {
    /// 可重试的提交失败后允许人工再次提交；被拒绝的提交不可在本次会话中恢复
    pub fn can_retry_submission(self) -> bool {
        matches!(self, Phase::Failed(FailureCause::SubmissionRetryable))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed(_))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Bootstrapping => write!(f, "Bootstrapping"),
            Phase::Active => write!(f, "Active"),
            Phase::Finalizing => write!(f, "Finalizing"),
            Phase::Completed => write!(f, "Completed"),
            Phase::Failed(FailureCause::LoadError) => write!(f, "Failed(load)"),
            Phase::Failed(FailureCause::SubmissionRetryable) => write!(f, "Failed(retryable)"),
            Phase::Failed(FailureCause::SubmissionRejected) => write!(f, "Failed(rejected)"),
        }
    }
}

/// 触发提交的原因，随提交一起发送给后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitReason {
    #[serde(rename = "time expired")]
    TimeExpired,
    #[serde(rename = "manual submit")]
    ManualSubmit,
    #[serde(rename = "quit")]
    Quit,
    #[serde(rename = "camera denied")]
    CameraDenied,
    #[serde(rename = "violation limit")]
    ViolationLimit,
}

impl SubmitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitReason::TimeExpired => "time expired",
            SubmitReason::ManualSubmit => "manual submit",
            SubmitReason::Quit => "quit",
            SubmitReason::CameraDenied => "camera denied",
            SubmitReason::ViolationLimit => "violation limit",
        }
    }
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 非致命违规类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    FullscreenExit,
    TabHidden,
}

/// 最近一次违规记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub kind: ViolationKind,
    pub at: DateTime<Utc>,
    /// 本场考试累计违规次数
    pub total: u32,
}

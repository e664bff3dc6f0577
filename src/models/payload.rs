use serde::Serialize;

use crate::models::answer::AnswerRecord;
use crate::models::question::{OptionLabel, QuestionId, QuestionSet};
use crate::models::session::{SessionContext, SubmitReason};

/// 单题作答
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_option: OptionLabel,
}

/// 提交给评分服务的请求体
///
/// 在提交时现场构造，构造后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    pub exam_code: String,
    pub language_code: String,
    pub candidate_name: String,
    pub father_name: String,
    pub mobile_number: String,
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken_minutes: u32,
    pub reason: SubmitReason,
}

impl SubmissionPayload {
    pub fn build(
        ctx: &SessionContext,
        questions: Option<&QuestionSet>,
        answers: &AnswerRecord,
        elapsed_secs: u32,
        reason: SubmitReason,
    ) -> Self {
        Self {
            exam_code: ctx.exam_code.clone(),
            language_code: ctx.language.clone(),
            candidate_name: ctx.candidate.candidate_name.clone(),
            father_name: ctx.candidate.father_name.clone(),
            mobile_number: ctx.candidate.mobile_number.clone(),
            answers: answers
                .ordered(questions)
                .into_iter()
                .map(|(question_id, selected_option)| SubmittedAnswer {
                    question_id,
                    selected_option,
                })
                .collect(),
            time_taken_minutes: elapsed_secs / 60,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::CandidateInfo;

    #[test]
    fn test_payload_wire_format() {
        let ctx = SessionContext::new(
            CandidateInfo {
                candidate_name: "Asha".to_string(),
                father_name: "Ravi".to_string(),
                mobile_number: "9876543210".to_string(),
            },
            "PY101",
            "en",
        );
        let mut answers = AnswerRecord::new();
        answers.insert(11, OptionLabel::B);

        let payload = SubmissionPayload::build(&ctx, None, &answers, 179, SubmitReason::ManualSubmit);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["exam_code"], "PY101");
        assert_eq!(json["language_code"], "en");
        assert_eq!(json["time_taken_minutes"], 2);
        assert_eq!(json["reason"], "manual submit");
        assert_eq!(json["answers"][0]["question_id"], 11);
        assert_eq!(json["answers"][0]["selected_option"], "B");
    }
}

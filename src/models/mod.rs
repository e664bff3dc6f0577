pub mod answer;
pub mod event;
pub mod payload;
pub mod question;
pub mod session;

pub use answer::AnswerRecord;
pub use event::{ProctoringEvent, SessionEvent, SignalKind, SubmissionOutcome, UserCommand};
pub use payload::{SubmissionPayload, SubmittedAnswer};
pub use question::{OptionLabel, Question, QuestionId, QuestionSet};
pub use session::{
    CandidateInfo, FailureCause, Phase, SessionContext, SubmitReason, ViolationKind,
    ViolationRecord, CANDIDATE_INFO_KEY,
};

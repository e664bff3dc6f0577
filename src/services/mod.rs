pub mod answer_store;
pub mod capability;
pub mod clock;
pub mod question_loader;
pub mod submission;

pub use answer_store::{AnswerStore, SetOutcome};
pub use capability::{
    CameraCapability, CapabilityMonitor, FullscreenCapability, StreamHandle, VisibilityCapability,
};
pub use clock::{Countdown, TickResult, Ticker};
pub use question_loader::{load_question_set, QuestionSource};
pub use submission::{SubmissionEndpoint, SubmissionService};

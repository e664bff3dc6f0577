pub mod exam_controller;
pub mod palette;
pub mod violation_policy;

pub use exam_controller::{Directive, ExamSessionController, Notice, NoticeLevel, SessionState, SessionView};
pub use palette::{PaletteEntry, PaletteStatus, VisitLedger};
pub use violation_policy::{Verdict, ViolationPolicy, ViolationTracker};

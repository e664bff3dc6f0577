pub mod exam_api;
pub mod proctor_page;

pub use exam_api::ExamApiClient;
pub use proctor_page::ProctorPage;

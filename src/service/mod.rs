//! Interview orchestration services.
//!
//! Handlers stay thin; every invariant (ownership, state gating,
//! duplicate guards) is enforced here, at the service boundary.

mod interviews;
mod uploads;

pub use interviews::{
    FeedbackOutcome, complete_interview, feedback_for, interview_history, load_interview,
    start_interview,
};
pub use uploads::{ConfirmUploadRequest, UploadTicket, confirm_upload, issue_upload_url, upload_response_direct};

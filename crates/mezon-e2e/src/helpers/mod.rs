//! Cross-page helpers that sequence resolver calls into user workflows.
//!
//! Actions return `E2eResult`; checks return `bool` and never fail.

mod direct_message;
mod file_upload;
mod message;
mod onboarding;
mod profile;

pub use direct_message::DirectMessageHelper;
pub use file_upload::{FileUploadHelper, UploadLimits, UploadTarget};
pub use message::MessageHelper;
pub use onboarding::OnboardingHelper;
pub use profile::{fingerprint, ProfileHelper};

//! Profile avatar changes, compared by a fingerprint of the image `src`.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::context::TestContext;
use crate::pages::ProfilePage;
use crate::result::E2eResult;

/// SHA-256 hex digest of an avatar `src`
#[must_use]
pub fn fingerprint(src: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(src.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Avatar and profile checks
#[derive(Debug, Clone)]
pub struct ProfileHelper {
    ctx: TestContext,
    page: ProfilePage,
}

impl ProfileHelper {
    /// Helper driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self {
            ctx: ctx.clone(),
            page: ProfilePage::new(ctx),
        }
    }

    /// Page used by this helper
    #[must_use]
    pub const fn page(&self) -> &ProfilePage {
        &self.page
    }

    /// Fingerprint of the avatar currently shown
    pub async fn avatar_fingerprint(&self) -> E2eResult<Option<String>> {
        Ok(self.page.avatar_src().await?.as_deref().map(fingerprint))
    }

    /// Attach `file` as the new avatar and save
    pub async fn upload_avatar(&self, file: &Path) -> E2eResult<()> {
        self.ctx
            .interactor()
            .set_input_files(&self.page.avatar_input()?, &[file.to_path_buf()], self.ctx.deadline())
            .await?;
        self.page.save().await
    }

    /// The avatar fingerprint differs from `before` within budget
    pub async fn verify_avatar_changed(&self, before: Option<&str>) -> E2eResult<bool> {
        let image = crate::catalog::candidates("user_settings.avatar.image")?;
        let verifier = self.ctx.verifier();
        let image = &image;
        Ok(verifier
            .poll("avatar changed", self.ctx.deadline(), move || async move {
                verifier
                    .read_attribute(image, "src")
                    .await
                    .is_some_and(|src| Some(fingerprint(&src).as_str()) != before)
            })
            .await
            .satisfied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("https://cdn.mezon.ai/avatars/1.png");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, fingerprint("https://cdn.mezon.ai/avatars/1.png"));
        assert_ne!(a, fingerprint("https://cdn.mezon.ai/avatars/2.png"));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::context::TestContext;
use crate::result::{E2eError, E2eResult};
use crate::selector::CandidateList;

const MIB: u64 = 1024 * 1024;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Where a file is uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadTarget {
    /// User avatar
    Avatar,
    /// Clan logo
    ClanLogo,
    /// Clan banner
    ClanBanner,
    /// Custom clan emoji
    Emoji,
    /// Custom clan sticker
    Sticker,
    /// Message attachment
    Attachment,
}

impl UploadTarget {
    /// Every target
    pub const ALL: [Self; 6] = [
        Self::Avatar,
        Self::ClanLogo,
        Self::ClanBanner,
        Self::Emoji,
        Self::Sticker,
        Self::Attachment,
    ];

    const fn extension(self) -> &'static str {
        match self {
            Self::Attachment => "bin",
            _ => "png",
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Avatar => "avatar",
            Self::ClanLogo => "clan-logo",
            Self::ClanBanner => "clan-banner",
            Self::Emoji => "emoji",
            Self::Sticker => "sticker",
            Self::Attachment => "attachment",
        })
    }
}

/// Byte limits per upload target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLimits {
    limits: BTreeMap<UploadTarget, u64>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        let limits = UploadTarget::ALL
            .into_iter()
            .map(|t| match t {
                UploadTarget::Attachment => (t, 50 * MIB),
                _ => (t, MIB),
            })
            .collect();
        Self { limits }
    }
}

impl UploadLimits {
    /// Largest accepted size for `target`
    #[must_use]
    pub fn limit(&self, target: UploadTarget) -> u64 {
        self.limits.get(&target).copied().unwrap_or(MIB)
    }

    /// Override the limit of `target`
    #[must_use]
    pub fn with_limit(mut self, target: UploadTarget, bytes: u64) -> Self {
        let _ = self.limits.insert(target, bytes);
        self
    }

    /// Whether a file of `size` bytes is within the limit
    #[must_use]
    pub fn accepts(&self, target: UploadTarget, size: u64) -> bool {
        size <= self.limit(target)
    }
}

/// Generates upload fixtures in its own temporary directory and drives
/// upload inputs.
///
/// Files live until [`FileUploadHelper::cleanup`]; the helper that created a
/// fixture is the one that removes it.
#[derive(Debug)]
pub struct FileUploadHelper {
    ctx: TestContext,
    dir: TempDir,
    limits: UploadLimits,
    created: Vec<PathBuf>,
}

impl FileUploadHelper {
    /// Helper with a fresh fixture directory
    pub fn new(ctx: &TestContext) -> E2eResult<Self> {
        let dir = tempfile::Builder::new().prefix("mezon-e2e-upload-").tempdir()?;
        Ok(Self {
            ctx: ctx.clone(),
            dir,
            limits: UploadLimits::default(),
            created: Vec::new(),
        })
    }

    /// Use different limits
    #[must_use]
    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits in use
    #[must_use]
    pub const fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Fixture directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Fixtures created so far
    #[must_use]
    pub fn fixtures(&self) -> &[PathBuf] {
        &self.created
    }

    /// Write a fixture of exactly `size` bytes
    ///
    /// `.png` fixtures start with the PNG signature.
    pub async fn create_fixture(&mut self, name: &str, size: u64) -> E2eResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(E2eError::invalid_argument(format!("invalid fixture name '{name}'")));
        }
        let len = usize::try_from(size)
            .map_err(|_| E2eError::invalid_argument(format!("fixture size {size} too large")))?;
        let mut bytes = vec![0_u8; len];
        if name.ends_with(".png") {
            let n = PNG_SIGNATURE.len().min(len);
            bytes[..n].copy_from_slice(&PNG_SIGNATURE[..n]);
        }
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size, "fixture created");
        self.created.push(path.clone());
        Ok(path)
    }

    /// Fixture one byte over the limit of `target`
    pub async fn oversized_fixture(&mut self, target: UploadTarget) -> E2eResult<PathBuf> {
        let limit = self.limits.limit(target);
        let size = limit.checked_add(1).ok_or_else(|| {
            E2eError::invalid_argument(format!("{target} limit {limit} has no oversized size"))
        })?;
        self.create_fixture(&format!("oversized-{target}.{}", target.extension()), size)
            .await
    }

    /// Small fixture well within the limit of `target`
    pub async fn valid_fixture(&mut self, target: UploadTarget) -> E2eResult<PathBuf> {
        let size = (self.limits.limit(target) / 2).min(64 * 1024);
        self.create_fixture(&format!("valid-{target}.{}", target.extension()), size)
            .await
    }

    /// Attach `file` to the file input behind `input`
    pub async fn upload(&self, input: &CandidateList, file: &Path) -> E2eResult<()> {
        if !tokio::fs::try_exists(file).await? {
            return Err(E2eError::invalid_argument(format!(
                "upload fixture {} does not exist",
                file.display()
            )));
        }
        self.ctx
            .interactor()
            .set_input_files(input, &[file.to_path_buf()], self.ctx.deadline())
            .await?;
        Ok(())
    }

    /// The error element contains `expected` within budget
    pub async fn verify_upload_error(&self, error: &CandidateList, expected: &str) -> bool {
        self.ctx
            .verifier()
            .poll_until_text_contains(error, expected, self.ctx.deadline())
            .await
    }

    /// Upload a file one byte over the limit of `target` and check an error
    /// is shown
    pub async fn verify_size_rejected(
        &mut self,
        target: UploadTarget,
        input: &CandidateList,
        error: &CandidateList,
    ) -> E2eResult<bool> {
        let file = self.oversized_fixture(target).await?;
        self.upload(input, &file).await?;
        Ok(self
            .ctx
            .verifier()
            .poll_until_visible(error, self.ctx.deadline())
            .await)
    }

    /// Remove every fixture and the directory
    pub fn cleanup(self) -> E2eResult<()> {
        let count = self.created.len();
        self.dir.close()?;
        debug!(count, "fixtures removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::deadline::Deadline;
    use crate::engine::MockEngine;
    use std::sync::Arc;

    fn ctx() -> TestContext {
        TestContext::new(
            Arc::new(MockEngine::new()),
            Arc::new(SuiteConfig::default()),
            "upload test",
            Deadline::none(),
        )
    }

    #[test]
    fn test_default_limits() {
        let limits = UploadLimits::default();
        assert_eq!(limits.limit(UploadTarget::Avatar), MIB);
        assert_eq!(limits.limit(UploadTarget::Attachment), 50 * MIB);
        assert!(limits.accepts(UploadTarget::Emoji, MIB));
        assert!(!limits.accepts(UploadTarget::Emoji, MIB + 1));
        let custom = limits.with_limit(UploadTarget::Sticker, 512 * 1024);
        assert_eq!(custom.limit(UploadTarget::Sticker), 512 * 1024);
    }

    #[tokio::test]
    async fn test_fixtures_have_exact_size_and_are_cleaned_up() {
        let mut helper = FileUploadHelper::new(&ctx())
            .unwrap()
            .with_limits(UploadLimits::default().with_limit(UploadTarget::Emoji, 2048));
        let big = helper.oversized_fixture(UploadTarget::Emoji).await.unwrap();
        let small = helper.valid_fixture(UploadTarget::Emoji).await.unwrap();
        assert_eq!(std::fs::metadata(&big).unwrap().len(), 2049);
        assert_eq!(std::fs::metadata(&small).unwrap().len(), 1024);
        assert_eq!(&std::fs::read(&big).unwrap()[..8], &PNG_SIGNATURE);
        assert_eq!(helper.fixtures().len(), 2);

        let dir = helper.dir().to_path_buf();
        helper.cleanup().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_oversized_fixture_at_max_limit_is_invalid() {
        let mut helper = FileUploadHelper::new(&ctx())
            .unwrap()
            .with_limits(UploadLimits::default().with_limit(UploadTarget::Emoji, u64::MAX));
        let err = helper.oversized_fixture(UploadTarget::Emoji).await.unwrap_err();
        assert!(matches!(err, E2eError::InvalidArgument { .. }));
        assert!(helper.fixtures().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let mut helper = FileUploadHelper::new(&ctx()).unwrap();
        assert!(helper.create_fixture("../escape.png", 1).await.is_err());
        assert!(helper.create_fixture("", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_invalid() {
        let helper = FileUploadHelper::new(&ctx()).unwrap();
        let input = CandidateList::from_strs(&["input[type='file']"]).unwrap();
        let err = helper
            .upload(&input, Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidArgument { .. }));
    }
}

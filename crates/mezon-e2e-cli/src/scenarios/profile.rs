//! User profile avatar

use mezon_e2e::helpers::{FileUploadHelper, ProfileHelper, UploadTarget};
use mezon_e2e::pages::HomePage;
use mezon_e2e::{ensure, E2eResult, Scenario};

use super::Target;

const FEATURE: &str = "profile";

pub(super) fn scenarios(_target: &Target) -> Vec<Scenario> {
    vec![change_avatar()]
}

fn change_avatar() -> Scenario {
    Scenario::new("change avatar", FEATURE, |ctx| async move {
        HomePage::new(&ctx).open().await?;
        let profile = ProfileHelper::new(&ctx);
        profile.page().open().await?;
        let before = profile.avatar_fingerprint().await?;

        let mut uploads = FileUploadHelper::new(&ctx)?;
        let result: E2eResult<bool> = async {
            let file = uploads.valid_fixture(UploadTarget::Avatar).await?;
            profile.upload_avatar(&file).await?;
            profile.verify_avatar_changed(before.as_deref()).await
        }
        .await;
        uploads.cleanup()?;
        ensure(result?, "avatar did not change after upload")
    })
}

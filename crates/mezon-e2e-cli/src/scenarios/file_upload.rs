//! Clan emoji and sticker uploads against the size limits

use mezon_e2e::helpers::{FileUploadHelper, UploadTarget};
use mezon_e2e::pages::ClanSettingsPage;
use mezon_e2e::{ensure, E2eResult, Scenario, TestContext};
use tracing::warn;

use super::Target;

const FEATURE: &str = "file_upload";

pub(super) fn scenarios(target: &Target) -> Vec<Scenario> {
    vec![
        oversized(target.clone(), "oversized emoji rejected", "Emoji", UploadTarget::Emoji),
        oversized(
            target.clone(),
            "oversized sticker rejected",
            "Stickers",
            UploadTarget::Sticker,
        ),
        valid_sticker(target.clone()),
    ]
}

fn oversized(target: Target, name: &str, section: &'static str, kind: UploadTarget) -> Scenario {
    Scenario::new(name, FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_clan(&ctx).await?;
            let settings = ClanSettingsPage::new(&ctx);
            settings.open_upload_dialog(section).await?;

            let mut uploads = FileUploadHelper::new(&ctx)?;
            let result = reject_oversized(&settings, &mut uploads, kind).await;
            finish(uploads, result)
        }
    })
}

async fn reject_oversized(
    settings: &ClanSettingsPage,
    uploads: &mut FileUploadHelper,
    kind: UploadTarget,
) -> E2eResult<()> {
    let error = settings.upload_error()?;
    let rejected = uploads
        .verify_size_rejected(kind, &settings.upload_input()?, &error)
        .await?;
    ensure(rejected, format!("oversized {kind} was not rejected"))?;
    ensure(
        uploads.verify_upload_error(&error, "too large").await,
        "size error does not say the file is too large",
    )
}

fn valid_sticker(target: Target) -> Scenario {
    Scenario::new("sticker within limit accepted", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_clan(&ctx).await?;
            let settings = ClanSettingsPage::new(&ctx);
            settings.open_upload_dialog("Stickers").await?;

            let mut uploads = FileUploadHelper::new(&ctx)?;
            let result = accept_valid(&ctx, &settings, &mut uploads).await;
            finish(uploads, result)?;
            settings.close().await
        }
    })
}

async fn accept_valid(
    ctx: &TestContext,
    settings: &ClanSettingsPage,
    uploads: &mut FileUploadHelper,
) -> E2eResult<()> {
    let file = uploads.valid_fixture(UploadTarget::Sticker).await?;
    uploads.upload(&settings.upload_input()?, &file).await?;
    let no_error = ctx
        .verifier()
        .poll_until_hidden(&settings.upload_error()?, ctx.deadline())
        .await;
    ensure(no_error, "sticker within the limit was rejected")
}

/// Remove the fixtures; a scenario failure wins over a cleanup failure
fn finish(uploads: FileUploadHelper, result: E2eResult<()>) -> E2eResult<()> {
    match (result, uploads.cleanup()) {
        (Err(e), Err(cleanup)) => {
            warn!(error = %cleanup, "upload fixture cleanup failed");
            Err(e)
        }
        (Ok(()), cleanup) => cleanup,
        (result, Ok(())) => result,
    }
}

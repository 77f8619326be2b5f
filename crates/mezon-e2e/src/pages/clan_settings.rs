use crate::catalog;
use crate::context::TestContext;
use crate::page_object::{wait_until_loaded, PageObject};
use crate::result::E2eResult;
use crate::selector::CandidateList;

use super::key_with_text;

/// Clan settings overlay
#[derive(Debug, Clone)]
pub struct ClanSettingsPage {
    ctx: TestContext,
}

impl PageObject for ClanSettingsPage {
    // Overlay on top of the channel route
    fn url_pattern(&self) -> &str {
        ""
    }

    fn ready_marker(&self) -> E2eResult<CandidateList> {
        catalog::candidates("clan_settings.sidebar.item")
    }

    fn page_name(&self) -> &str {
        "clan settings"
    }
}

impl ClanSettingsPage {
    /// Clan settings driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Open the overlay from the clan header
    pub async fn open(&self) -> E2eResult<()> {
        self.ctx.click_key("clan_settings.button").await?;
        wait_until_loaded(self, &self.ctx).await
    }

    /// Select a settings section such as "Emoji" or "Stickers"
    pub async fn open_section(&self, section: &str) -> E2eResult<()> {
        self.ctx
            .interactor()
            .click(
                &key_with_text("clan_settings.sidebar.item", section)?,
                self.ctx.deadline(),
            )
            .await?;
        Ok(())
    }

    /// Open settings, pick `section` and open its upload dialog
    pub async fn open_upload_dialog(&self, section: &str) -> E2eResult<()> {
        self.open().await?;
        self.open_section(section).await?;
        self.ctx.click_key("clan_settings.upload.button").await?;
        Ok(())
    }

    /// File input of the upload dialog
    pub fn upload_input(&self) -> E2eResult<CandidateList> {
        catalog::candidates("clan_settings.upload.input")
    }

    /// Error banner of the upload dialog
    pub fn upload_error(&self) -> E2eResult<CandidateList> {
        catalog::candidates("clan_settings.upload.error")
    }

    /// Current upload error text, if shown
    pub async fn upload_error_text(&self) -> E2eResult<Option<String>> {
        Ok(self.ctx.verifier().read_text(&self.upload_error()?).await)
    }

    /// Close the overlay
    pub async fn close(&self) -> E2eResult<()> {
        self.ctx.click_key("clan_settings.close").await?;
        Ok(())
    }
}

use crate::catalog;
use crate::context::TestContext;
use crate::page_object::{wait_until_loaded, PageObject};
use crate::result::E2eResult;
use crate::selector::CandidateList;

/// User settings overlay, profile tab
#[derive(Debug, Clone)]
pub struct ProfilePage {
    ctx: TestContext,
}

impl PageObject for ProfilePage {
    fn url_pattern(&self) -> &str {
        ""
    }

    fn ready_marker(&self) -> E2eResult<CandidateList> {
        catalog::candidates("user_settings.profile_tab")
    }

    fn page_name(&self) -> &str {
        "profile"
    }
}

impl ProfilePage {
    /// Profile page driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Open user settings and switch to the profile tab
    pub async fn open(&self) -> E2eResult<()> {
        self.ctx.click_key("user_settings.button").await?;
        wait_until_loaded(self, &self.ctx).await?;
        self.ctx.click_key("user_settings.profile_tab").await?;
        Ok(())
    }

    /// Avatar file input
    pub fn avatar_input(&self) -> E2eResult<CandidateList> {
        catalog::candidates("user_settings.avatar.input")
    }

    /// `src` of the avatar preview
    pub async fn avatar_src(&self) -> E2eResult<Option<String>> {
        Ok(self
            .ctx
            .verifier()
            .read_attribute(&catalog::candidates("user_settings.avatar.image")?, "src")
            .await)
    }

    /// Save profile changes
    pub async fn save(&self) -> E2eResult<()> {
        self.ctx.click_key("user_settings.save").await?;
        Ok(())
    }
}

use crate::catalog;
use crate::context::TestContext;
use crate::page_object::{wait_until_loaded, PageObject};
use crate::result::E2eResult;
use crate::selector::CandidateList;

use super::key_with_text;

/// Landing screen after login: clan sidebar and direct-message entry
#[derive(Debug, Clone)]
pub struct HomePage {
    ctx: TestContext,
}

impl PageObject for HomePage {
    fn url_pattern(&self) -> &str {
        "/chat/**"
    }

    fn ready_marker(&self) -> E2eResult<CandidateList> {
        catalog::candidates("clan.sidebar")
    }

    fn page_name(&self) -> &str {
        "home"
    }
}

impl HomePage {
    /// Home page driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Navigate to the friends screen and wait for the sidebar
    pub async fn open(&self) -> E2eResult<()> {
        self.ctx.goto("/chat/direct/friends").await?;
        wait_until_loaded(self, &self.ctx).await
    }

    /// Names of every clan in the sidebar
    pub async fn clan_names(&self) -> E2eResult<Vec<String>> {
        Ok(self
            .ctx
            .verifier()
            .read_all_texts(&catalog::candidates("clan.sidebar.item")?)
            .await)
    }

    /// Whether a clan named `name` shows up in the sidebar within budget
    pub async fn has_clan(&self, name: &str) -> E2eResult<bool> {
        Ok(self
            .ctx
            .verifier()
            .poll_until_visible(&key_with_text("clan.sidebar.item", name)?, self.ctx.deadline())
            .await)
    }

    /// Create a clan through the "add clan" dialog
    pub async fn create_clan(&self, name: &str) -> E2eResult<()> {
        self.ctx.click_key("clan.create.button").await?;
        self.ctx.fill_key("clan.create.name_input", name).await?;
        self.ctx.click_key("clan.create.confirm").await?;
        Ok(())
    }

    /// Switch to the clan named `name`
    pub async fn select_clan(&self, name: &str) -> E2eResult<()> {
        self.ctx
            .interactor()
            .click(&key_with_text("clan.sidebar.item", name)?, self.ctx.deadline())
            .await?;
        Ok(())
    }

    /// Open the direct-message list
    pub async fn open_direct_messages(&self) -> E2eResult<()> {
        self.ctx.click_key("chat.direct_message.button").await?;
        self.ctx.resolve_key("chat.direct_message.chat_list").await?;
        Ok(())
    }
}

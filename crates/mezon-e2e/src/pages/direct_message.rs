use crate::catalog;
use crate::context::TestContext;
use crate::page_object::{wait_until_loaded, PageObject};
use crate::result::E2eResult;
use crate::selector::CandidateList;

use super::key_with_text;

/// Direct-message list and the create-DM dialog
#[derive(Debug, Clone)]
pub struct DirectMessagePage {
    ctx: TestContext,
}

impl PageObject for DirectMessagePage {
    fn url_pattern(&self) -> &str {
        "/chat/direct/**"
    }

    fn ready_marker(&self) -> E2eResult<CandidateList> {
        catalog::candidates("chat.direct_message.chat_list")
    }

    fn page_name(&self) -> &str {
        "direct messages"
    }
}

impl DirectMessagePage {
    /// Direct-message page driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Navigate to the DM list
    pub async fn open(&self) -> E2eResult<()> {
        self.ctx.goto("/chat/direct/friends").await?;
        wait_until_loaded(self, &self.ctx).await
    }

    /// Names of every conversation in the list
    pub async fn conversation_names(&self) -> E2eResult<Vec<String>> {
        Ok(self
            .ctx
            .verifier()
            .read_all_texts(&catalog::candidates("chat.direct_message.chat_item")?)
            .await)
    }

    /// Conversation entry named `name`
    pub fn conversation(&self, name: &str) -> E2eResult<CandidateList> {
        key_with_text("chat.direct_message.chat_item", name)
    }

    /// Open the conversation named `name`
    pub async fn open_conversation(&self, name: &str) -> E2eResult<()> {
        self.ctx
            .interactor()
            .click(&self.conversation(name)?, self.ctx.deadline())
            .await?;
        Ok(())
    }

    /// Open the create-DM dialog
    pub async fn open_create_dialog(&self) -> E2eResult<()> {
        self.ctx.click_key("chat.direct_message.create").await?;
        self.ctx.resolve_key("chat.direct_message.member_search").await?;
        Ok(())
    }

    /// Search the member picker and tick `username`
    pub async fn select_member(&self, username: &str) -> E2eResult<()> {
        self.ctx
            .fill_key("chat.direct_message.member_search", username)
            .await?;
        self.ctx
            .interactor()
            .click(
                &key_with_text("chat.direct_message.member_item", username)?,
                self.ctx.deadline(),
            )
            .await?;
        Ok(())
    }

    /// Confirm the member picker
    pub async fn confirm(&self) -> E2eResult<()> {
        self.ctx.click_key("chat.direct_message.confirm").await?;
        Ok(())
    }

    /// Header name of the open conversation
    pub fn header_name(&self) -> E2eResult<CandidateList> {
        catalog::candidates("chat.direct_message.header_name")
    }
}

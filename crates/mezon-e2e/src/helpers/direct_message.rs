//! Direct-message and group conversation management.

use crate::context::TestContext;
use crate::pages::{DirectMessagePage, HomePage};
use crate::result::{E2eError, E2eResult};

use super::MessageHelper;

/// Direct-message and group conversation management
#[derive(Debug, Clone)]
pub struct DirectMessageHelper {
    ctx: TestContext,
    page: DirectMessagePage,
}

impl DirectMessageHelper {
    /// Helper driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self {
            ctx: ctx.clone(),
            page: DirectMessagePage::new(ctx),
        }
    }

    /// Page used by this helper
    #[must_use]
    pub const fn page(&self) -> &DirectMessagePage {
        &self.page
    }

    /// Show the DM list from wherever the app is
    pub async fn open_dm_list(&self) -> E2eResult<()> {
        HomePage::new(&self.ctx).open_direct_messages().await
    }

    /// Start a one-to-one conversation with `username`
    pub async fn create_dm(&self, username: &str) -> E2eResult<()> {
        self.page.open_create_dialog().await?;
        self.page.select_member(username).await?;
        self.page.confirm().await
    }

    /// Start a group conversation with every user in `usernames`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when fewer than two users are given.
    pub async fn create_group(&self, usernames: &[&str]) -> E2eResult<()> {
        if usernames.len() < 2 {
            return Err(E2eError::invalid_argument(
                "a group conversation needs at least two other members",
            ));
        }
        self.page.open_create_dialog().await?;
        for username in usernames {
            self.page.select_member(username).await?;
        }
        self.page.confirm().await
    }

    /// Rename the open group conversation
    pub async fn rename_group(&self, name: &str) -> E2eResult<()> {
        if name.trim().is_empty() {
            return Err(E2eError::invalid_argument("group name must not be empty"));
        }
        let interactor = self.ctx.interactor();
        interactor
            .click(&self.page.header_name()?, self.ctx.deadline())
            .await?;
        let input = crate::catalog::candidates("chat.direct_message.rename_input")?;
        interactor.fill(&input, name, self.ctx.deadline()).await?;
        interactor.press(&input, "Enter", self.ctx.deadline()).await?;
        Ok(())
    }

    /// Add `username` to the open group conversation
    pub async fn add_member(&self, username: &str) -> E2eResult<()> {
        self.ctx.click_key("chat.direct_message.add_member").await?;
        self.page.select_member(username).await?;
        self.page.confirm().await
    }

    /// Leave the group conversation named `name`
    pub async fn leave_group(&self, name: &str) -> E2eResult<()> {
        self.page.open_conversation(name).await?;
        self.ctx.click_key("chat.direct_message.leave_group").await?;
        self.ctx.click_key("chat.direct_message.leave_confirm").await?;
        Ok(())
    }

    /// A conversation named `name` is listed within budget
    pub async fn verify_dm_listed(&self, name: &str) -> E2eResult<bool> {
        Ok(self
            .ctx
            .verifier()
            .poll_until_visible(&self.page.conversation(name)?, self.ctx.deadline())
            .await)
    }

    /// No conversation named `name` is listed within budget
    pub async fn verify_dm_not_listed(&self, name: &str) -> E2eResult<bool> {
        Ok(self
            .ctx
            .verifier()
            .poll_until_hidden(&self.page.conversation(name)?, self.ctx.deadline())
            .await)
    }

    /// Open the conversation named `name` and check a message containing
    /// `text` shows there within budget
    pub async fn verify_message_in_conversation(
        &self,
        name: &str,
        text: &str,
    ) -> E2eResult<bool> {
        self.open_dm_list().await?;
        self.page.open_conversation(name).await?;
        MessageHelper::new(&self.ctx).verify_message_present(text).await
    }

    /// The open conversation's header reads `name` within budget
    pub async fn verify_group_name(&self, name: &str) -> E2eResult<bool> {
        Ok(self
            .ctx
            .verifier()
            .poll_until_text_equals(&self.page.header_name()?, name, self.ctx.deadline())
            .await)
    }
}

use crate::catalog;
use crate::context::TestContext;
use crate::page_object::{wait_until_loaded, PageObject};
use crate::resolver::ResolvedElement;
use crate::result::E2eResult;
use crate::selector::{CandidateList, Pick};

use super::key_with_text;

/// A clan text channel: message list and composer
#[derive(Debug, Clone)]
pub struct ChannelPage {
    ctx: TestContext,
}

impl PageObject for ChannelPage {
    fn url_pattern(&self) -> &str {
        "/chat/clans/:clan_id/channels/:channel_id"
    }

    fn ready_marker(&self) -> E2eResult<CandidateList> {
        catalog::candidates("chat.mention.input")
    }

    fn page_name(&self) -> &str {
        "channel"
    }
}

impl ChannelPage {
    /// Channel page driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Navigate straight to a channel by id
    pub async fn open(&self, clan_id: &str, channel_id: &str) -> E2eResult<()> {
        self.ctx
            .goto(&format!("/chat/clans/{clan_id}/channels/{channel_id}"))
            .await?;
        wait_until_loaded(self, &self.ctx).await
    }

    /// Click the channel named `name` in the channel list
    pub async fn open_channel(&self, name: &str) -> E2eResult<()> {
        self.ctx
            .interactor()
            .click(&key_with_text("channel.list.item", name)?, self.ctx.deadline())
            .await?;
        wait_until_loaded(self, &self.ctx).await
    }

    /// Composer
    pub fn message_input(&self) -> E2eResult<CandidateList> {
        catalog::candidates("chat.mention.input")
    }

    /// Message bodies, oldest first
    pub fn messages(&self) -> E2eResult<CandidateList> {
        catalog::candidates("chat.message.content")
    }

    /// Body of the newest message
    pub fn last_message(&self) -> E2eResult<CandidateList> {
        Ok(self.messages()?.with_pick(Pick::Last))
    }

    /// Trimmed text of the newest message
    pub async fn last_message_text(&self) -> E2eResult<Option<String>> {
        Ok(self.ctx.verifier().read_text(&self.last_message()?).await)
    }

    /// Texts of every visible message
    pub async fn message_texts(&self) -> E2eResult<Vec<String>> {
        Ok(self.ctx.verifier().read_all_texts(&self.messages()?).await)
    }

    /// Hover the newest message so its toolbar shows
    pub async fn hover_last_message(&self) -> E2eResult<ResolvedElement> {
        let items = catalog::candidates("chat.message.item")?.with_pick(Pick::Last);
        self.ctx.interactor().hover(&items, self.ctx.deadline()).await
    }

    /// Hover the newest message containing `text`
    pub async fn hover_message(&self, text: &str) -> E2eResult<ResolvedElement> {
        let items = key_with_text("chat.message.item", text)?.with_pick(Pick::Last);
        self.ctx.interactor().hover(&items, self.ctx.deadline()).await
    }
}

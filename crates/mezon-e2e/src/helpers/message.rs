//! Message actions in the open channel or conversation.

use std::time::Duration;
use tracing::debug;

use crate::catalog;
use crate::context::TestContext;
use crate::pages::ChannelPage;
use crate::resolver::ResolvedElement;
use crate::result::{ensure, E2eResult};
use crate::selector::Pick;
use crate::workflow::{PinJumpState, Workflow};

use super::DirectMessageHelper;

/// Budget for picking between the context-menu and toolbar shapes
const MENU_SHAPE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Message actions in the open channel
#[derive(Debug, Clone)]
pub struct MessageHelper {
    ctx: TestContext,
    channel: ChannelPage,
}

impl MessageHelper {
    /// Helper driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self {
            ctx: ctx.clone(),
            channel: ChannelPage::new(ctx),
        }
    }

    /// Channel page used by this helper
    #[must_use]
    pub const fn channel(&self) -> &ChannelPage {
        &self.channel
    }

    /// Type `text` into the composer and submit it
    pub async fn send_text(&self, text: &str) -> E2eResult<()> {
        self.ctx
            .interactor()
            .send_text(&self.channel.message_input()?, text, self.ctx.deadline())
            .await
    }

    /// Send `text` and check it shows up as the newest message
    pub async fn send_and_verify(&self, text: &str) -> E2eResult<bool> {
        self.send_text(text).await?;
        self.verify_last_message_equals(text).await
    }

    /// Newest message equals `text` within budget
    pub async fn verify_last_message_equals(&self, text: &str) -> E2eResult<bool> {
        Ok(self
            .ctx
            .verifier()
            .verify_last_equals(&self.channel.messages()?, text, self.ctx.deadline())
            .await)
    }

    /// Some message equals `text` within budget
    pub async fn verify_message_present(&self, text: &str) -> E2eResult<bool> {
        let list = self.channel.messages()?.containing_text(text);
        Ok(self
            .ctx
            .verifier()
            .poll_until_visible(&list, self.ctx.deadline())
            .await)
    }

    /// No message contains `text` within budget
    pub async fn verify_message_absent(&self, text: &str) -> E2eResult<bool> {
        let list = self.channel.messages()?.containing_text(text);
        Ok(self
            .ctx
            .verifier()
            .poll_until_hidden(&list, self.ctx.deadline())
            .await)
    }

    /// Trigger a message action (`chat.message.action.*`) on the newest
    /// message.
    ///
    /// The action is either reachable directly (context menu or toolbar
    /// button) or behind the toolbar's "more" button.
    pub async fn message_action(&self, action_key: &str) -> E2eResult<ResolvedElement> {
        self.channel.hover_last_message().await?;
        let action = catalog::candidates(action_key)?;
        let more = catalog::candidates("chat.message.toolbar.more")?;
        let shape = self
            .ctx
            .resolver()
            .resolve_first_of(
                &[action.clone(), more.clone()],
                MENU_SHAPE_TIMEOUT.min(self.ctx.config().resolve_timeout),
                self.ctx.deadline(),
            )
            .await?;
        if more.iter().any(|c| *c == shape.candidate) {
            debug!(action = action_key, "action behind the toolbar menu");
            self.ctx
                .interactor()
                .click(&more, self.ctx.deadline())
                .await?;
        }
        self.ctx
            .interactor()
            .click(&action, self.ctx.deadline())
            .await
    }

    /// Replace the newest message's text
    pub async fn edit_last_message(&self, new_text: &str) -> E2eResult<()> {
        self.message_action("chat.message.action.edit").await?;
        let input = catalog::candidates("chat.message.edit_input")?;
        let interactor = self.ctx.interactor();
        interactor.fill(&input, new_text, self.ctx.deadline()).await?;
        interactor.press(&input, "Enter", self.ctx.deadline()).await?;
        Ok(())
    }

    /// Delete the newest message and confirm
    pub async fn delete_last_message(&self) -> E2eResult<()> {
        self.message_action("chat.message.action.delete").await?;
        self.ctx.click_key("chat.message.delete_confirm").await?;
        Ok(())
    }

    /// Reply to the newest message with `text`
    pub async fn reply_to_last_message(&self, text: &str) -> E2eResult<()> {
        self.message_action("chat.message.action.reply").await?;
        self.ctx.resolve_key("chat.message.reply_preview").await?;
        self.send_text(text).await
    }

    /// React to the newest message with the emoji found by `emoji`
    pub async fn react_to_last_message(&self, emoji: &str) -> E2eResult<()> {
        self.message_action("chat.message.action.react").await?;
        self.ctx.fill_key("chat.emoji.search", emoji).await?;
        self.ctx.click_key("chat.emoji.item").await?;
        Ok(())
    }

    /// A reaction containing `emoji` shows within budget
    pub async fn verify_reaction(&self, emoji: &str) -> E2eResult<bool> {
        let reactions = catalog::candidates("chat.message.reaction")?.with_pick(Pick::Last);
        Ok(self
            .ctx
            .verifier()
            .poll_until_text_contains(&reactions, emoji, self.ctx.deadline())
            .await)
    }

    /// Forward the newest message to the conversation or channel `target`
    pub async fn forward_last_message(&self, target: &str) -> E2eResult<()> {
        self.message_action("chat.message.action.forward").await?;
        self.ctx.fill_key("chat.forward.search", target).await?;
        self.ctx
            .interactor()
            .click(
                &catalog::candidates("chat.forward.target")?.containing_text(target),
                self.ctx.deadline(),
            )
            .await?;
        self.ctx.click_key("chat.forward.send").await?;
        Ok(())
    }

    /// Forward the newest message to the DM with `peer`, then open that
    /// conversation and check `text` arrived within budget
    pub async fn forward_to_dm_and_verify(&self, peer: &str, text: &str) -> E2eResult<bool> {
        self.forward_last_message(peer).await?;
        DirectMessageHelper::new(&self.ctx)
            .verify_message_in_conversation(peer, text)
            .await
    }

    /// Pin the newest message
    pub async fn pin_last_message(&self) -> E2eResult<()> {
        self.message_action("chat.message.action.pin").await?;
        Ok(())
    }

    /// Open the pinned-messages modal
    pub async fn open_pinned_messages(&self) -> E2eResult<()> {
        self.ctx.click_key("chat.pinned.button").await?;
        self.ctx.resolve_key("chat.pinned.modal").await?;
        Ok(())
    }

    /// Jump from the pinned entry containing `text` to the message
    pub async fn jump_to_pinned(&self, text: &str) -> E2eResult<()> {
        let entry = catalog::candidates("chat.pinned.item")?.containing_text(text);
        self.ctx
            .interactor()
            .hover(&entry, self.ctx.deadline())
            .await?;
        self.ctx.click_key("chat.pinned.jump").await?;
        Ok(())
    }

    /// Message containing `text` is highlighted within budget
    pub async fn verify_highlighted(&self, text: &str) -> E2eResult<bool> {
        Ok(self
            .ctx
            .verifier()
            .poll_until_text_contains(
                &catalog::candidates("chat.message.highlighted")?,
                text,
                self.ctx.deadline(),
            )
            .await)
    }

    /// Send, pin, open the pinned list, jump back and check the highlight
    ///
    /// Returns the completed transitions. A failing step is reported as a
    /// `WorkflowStep` error naming it.
    pub async fn pin_and_jump(&self, text: &str) -> E2eResult<Vec<(PinJumpState, PinJumpState)>> {
        let mut wf = Workflow::new("pin-and-jump", PinJumpState::Idle)
            .with_trace(self.ctx.trace().cloned());
        wf.step(PinJumpState::MessageSent, async {
            self.send_text(text).await?;
            ensure(
                self.verify_last_message_equals(text).await?,
                format!("message {text:?} did not appear"),
            )
        })
        .await?;
        wf.step(PinJumpState::Pinned, self.pin_last_message()).await?;
        wf.step(PinJumpState::ModalOpen, self.open_pinned_messages())
            .await?;
        wf.step(PinJumpState::Jumped, self.jump_to_pinned(text))
            .await?;
        wf.step(PinJumpState::Verified, async {
            ensure(
                self.verify_highlighted(text).await?,
                format!("message {text:?} was not highlighted after the jump"),
            )
        })
        .await?;
        Ok(wf.history().to_vec())
    }
}

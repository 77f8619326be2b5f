//! Helper and page-object flows against the simulated client

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{chat_app, context, e2e, SimOptions, DEFAULT_AVATAR};
use mezon_e2e::config::{ScreenshotMode, SuiteConfig};
use mezon_e2e::helpers::{
    DirectMessageHelper, FileUploadHelper, MessageHelper, OnboardingHelper, ProfileHelper,
    UploadTarget,
};
use mezon_e2e::pages::{ChannelPage, ClanSettingsPage, HomePage, ProfilePage};
use mezon_e2e::trace::TraceMode;
use mezon_e2e::{
    E2eError, MockEngineFactory, PinJumpState, Scenario, ScenarioFilter, ScenarioStatus, Suite,
    SuiteRunner,
};

// ============================================================================
// Messages
// ============================================================================

mod message_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_send_and_verify() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        ChannelPage::new(&ctx).open("qa-clan", "general").await.unwrap();

        let messages = MessageHelper::new(&ctx);
        assert!(messages.send_and_verify("hello from the suite").await.unwrap());
        assert!(messages.send_and_verify("second line").await.unwrap());
        assert_eq!(
            messages.channel().message_texts().await.unwrap(),
            vec!["hello from the suite", "second line"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_message_rejected_without_typing() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let err = MessageHelper::new(&ctx).send_text("   ").await.unwrap_err();
        assert!(matches!(err, E2eError::InvalidArgument { .. }));
        assert!(!engine.was_called("fill"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_last_message() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("draft note").await.unwrap();
        messages.edit_last_message("final note").await.unwrap();
        assert!(messages.verify_last_message_equals("final note").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_last_message() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("first note").await.unwrap();
        messages.send_text("second note").await.unwrap();

        messages.delete_last_message().await.unwrap();
        assert!(messages.verify_message_absent("second note").await.unwrap());
        assert!(messages.verify_message_present("first note").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_sends_after_preview() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("is staging up").await.unwrap();
        messages.reply_to_last_message("yes it is").await.unwrap();

        assert!(messages.verify_last_message_equals("yes it is").await.unwrap());
        assert!(engine.texts(&e2e("chat.message.reply_preview")).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_react_to_last_message() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("ship it").await.unwrap();
        messages.react_to_last_message("thumbsup").await.unwrap();
        assert!(messages.verify_reaction("thumbsup").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_last_message() {
        let engine = chat_app(SimOptions {
            actions_behind_more: true,
            ..SimOptions::default()
        });
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("deploy window at noon").await.unwrap();
        assert!(messages
            .forward_to_dm_and_verify("qa.bob", "deploy window at noon")
            .await
            .unwrap());
        assert!(engine.texts(&e2e("chat.forward.target")).is_empty());
        assert_eq!(
            engine.texts(&e2e("chat.direct_message.header_name")),
            vec!["qa.bob"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_to_channel_does_not_reach_dm() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("status page is green").await.unwrap();
        messages.forward_last_message("general").await.unwrap();

        let dms = DirectMessageHelper::new(&ctx);
        dms.open_dm_list().await.unwrap();
        dms.create_dm("qa.bob").await.unwrap();
        assert!(!dms
            .verify_message_in_conversation("qa.bob", "status page is green")
            .await
            .unwrap());
    }
}

// ============================================================================
// Pin and jump
// ============================================================================

mod pin_tests {
    use super::*;

    async fn run_pin_and_jump(options: SimOptions) {
        let engine = chat_app(options);
        let ctx = context(&engine);
        let messages = MessageHelper::new(&ctx);
        messages.send_text("older chatter").await.unwrap();

        let steps = messages.pin_and_jump("release notes ready").await.unwrap();
        assert_eq!(
            steps,
            vec![
                (PinJumpState::Idle, PinJumpState::MessageSent),
                (PinJumpState::MessageSent, PinJumpState::Pinned),
                (PinJumpState::Pinned, PinJumpState::ModalOpen),
                (PinJumpState::ModalOpen, PinJumpState::Jumped),
                (PinJumpState::Jumped, PinJumpState::Verified),
            ]
        );
        assert_eq!(
            engine.texts(&e2e("chat.message.highlighted")),
            vec!["release notes ready"]
        );
        assert!(engine.texts(&e2e("chat.pinned.modal")).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_and_jump_with_direct_actions() {
        run_pin_and_jump(SimOptions::default()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_and_jump_with_actions_behind_more() {
        run_pin_and_jump(SimOptions {
            actions_behind_more: true,
            ..SimOptions::default()
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_pin_action_names_failing_step() {
        let engine = chat_app(SimOptions {
            without_pin: true,
            ..SimOptions::default()
        });
        let ctx = context(&engine);
        let err = MessageHelper::new(&ctx)
            .pin_and_jump("cannot be pinned")
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::WorkflowStep { .. }));
        assert!(err.to_string().contains("MessageSent -> Pinned"));
        // Pin candidates first, then the toolbar "more" candidates
        let tried = err.candidates().unwrap();
        assert_eq!(tried.len(), 6);
        assert_eq!(tried[0].to_string(), r#"[data-e2e="chat-message-action-pin"]"#);
        assert_eq!(tried[5].to_string(), "div[role='toolbar'] button:last-child");
    }
}

// ============================================================================
// Direct messages
// ============================================================================

mod direct_message_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_create_dm() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let dms = DirectMessageHelper::new(&ctx);
        dms.open_dm_list().await.unwrap();
        dms.create_dm("qa.bob").await.unwrap();

        assert!(dms.verify_dm_listed("qa.bob").await.unwrap());
        assert!(dms.verify_group_name("qa.bob").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_lifecycle() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let dms = DirectMessageHelper::new(&ctx);
        dms.page().open().await.unwrap();

        dms.create_group(&["qa.bob", "qa.carol"]).await.unwrap();
        assert!(dms.verify_dm_listed("qa.bob, qa.carol").await.unwrap());

        dms.rename_group("Release crew").await.unwrap();
        assert!(dms.verify_group_name("Release crew").await.unwrap());
        assert!(dms.verify_dm_listed("Release crew").await.unwrap());

        dms.add_member("qa.dave").await.unwrap();
        dms.leave_group("Release crew").await.unwrap();
        assert!(dms.verify_dm_not_listed("Release crew").await.unwrap());
        assert!(dms.page().conversation_names().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_needs_two_members() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let err = DirectMessageHelper::new(&ctx)
            .create_group(&["qa.bob"])
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidArgument { .. }));
        assert!(!engine.was_called("click"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_group_name_rejected() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let err = DirectMessageHelper::new(&ctx)
            .rename_group("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidArgument { .. }));
    }
}

// ============================================================================
// Clans, settings, profile, onboarding
// ============================================================================

mod clan_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_create_clan_shows_in_sidebar() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let home = HomePage::new(&ctx);
        home.open().await.unwrap();
        assert_eq!(home.clan_names().await.unwrap(), vec!["QA Clan"]);

        home.create_clan("Nightly Builds").await.unwrap();
        assert!(home.has_clan("Nightly Builds").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_emoji_rejected() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let settings = ClanSettingsPage::new(&ctx);
        settings.open_upload_dialog("Emoji").await.unwrap();

        let mut uploads = FileUploadHelper::new(&ctx).unwrap();
        let rejected = uploads
            .verify_size_rejected(
                UploadTarget::Emoji,
                &settings.upload_input().unwrap(),
                &settings.upload_error().unwrap(),
            )
            .await
            .unwrap();
        assert!(rejected);
        assert!(
            uploads
                .verify_upload_error(&settings.upload_error().unwrap(), "1MB")
                .await
        );
        assert!(settings.upload_error_text().await.unwrap().unwrap().contains("too large"));

        let dir = uploads.dir().to_path_buf();
        uploads.cleanup().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_sticker_accepted() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let settings = ClanSettingsPage::new(&ctx);
        settings.open_upload_dialog("Stickers").await.unwrap();

        let mut uploads = FileUploadHelper::new(&ctx).unwrap();
        let file = uploads.valid_fixture(UploadTarget::Sticker).await.unwrap();
        uploads
            .upload(&settings.upload_input().unwrap(), &file)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(settings.upload_error_text().await.unwrap(), None);
        settings.close().await.unwrap();
        uploads.cleanup().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_avatar_change() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let profile = ProfileHelper::new(&ctx);
        profile.page().open().await.unwrap();
        assert_eq!(
            ProfilePage::new(&ctx).avatar_src().await.unwrap().as_deref(),
            Some(DEFAULT_AVATAR)
        );

        let before = profile.avatar_fingerprint().await.unwrap();
        let mut uploads = FileUploadHelper::new(&ctx).unwrap();
        let file = uploads.valid_fixture(UploadTarget::Avatar).await.unwrap();
        profile.upload_avatar(&file).await.unwrap();

        assert!(profile.verify_avatar_changed(before.as_deref()).await.unwrap());
        uploads.cleanup().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_avatar_unchanged_without_upload() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let profile = ProfileHelper::new(&ctx);
        profile.page().open().await.unwrap();
        let before = profile.avatar_fingerprint().await.unwrap();
        profile.page().save().await.unwrap();
        assert!(!profile.verify_avatar_changed(before.as_deref()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboarding_task_completes_after_first_message() {
        let engine = chat_app(SimOptions::default());
        let ctx = context(&engine);
        let onboarding = OnboardingHelper::new(&ctx);
        assert!(onboarding.checklist_visible().await.unwrap());
        assert_eq!(onboarding.pending_tasks().await.unwrap().len(), 2);

        MessageHelper::new(&ctx).send_text("hi team").await.unwrap();
        assert!(onboarding
            .wait_for_task_completed("Send your first message")
            .await
            .unwrap());
        assert_eq!(
            onboarding.pending_tasks().await.unwrap(),
            vec!["Invite your friends"]
        );
    }
}

// ============================================================================
// Suite runner over the simulated client
// ============================================================================

mod runner_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_suite_over_simulated_client() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new(|| chat_app(SimOptions::default()));
        let config = SuiteConfig::default()
            .with_output_dir(dir.path())
            .with_workers(2)
            .with_retries(0)
            .with_screenshot(ScreenshotMode::OnlyOnFailure)
            .with_trace(TraceMode::RetainOnFailure);
        let runner = SuiteRunner::new(Arc::new(factory.clone()), config);

        let suite = Suite::new("mezon")
            .with_scenario(Scenario::new("send message", "messages", |ctx| async move {
                let messages = MessageHelper::new(&ctx);
                mezon_e2e::ensure(
                    messages.send_and_verify("suite message").await?,
                    "message did not appear",
                )
            }))
            .with_scenario(Scenario::new("pin and jump", "messages", |ctx| async move {
                MessageHelper::new(&ctx).pin_and_jump("pinned by suite").await?;
                Ok(())
            }))
            .with_scenario(Scenario::new("group needs two", "direct_messages", |ctx| async move {
                DirectMessageHelper::new(&ctx).create_group(&["qa.bob"]).await
            }));

        let report = runner.run(&suite, &ScenarioFilter::all()).await;
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);

        let failed = report.scenario("group needs two").unwrap();
        assert_eq!(failed.status, ScenarioStatus::Failed);
        assert!(failed.screenshot.as_ref().unwrap().exists());
        assert!(failed.trace.as_ref().unwrap().exists());
        assert!(report.scenario("send message").unwrap().trace.is_none());

        assert_eq!(factory.created().len(), 3);
    }
}

//! Onboarding checklist

use mezon_e2e::helpers::{MessageHelper, OnboardingHelper};
use mezon_e2e::{ensure, Scenario};

use super::{unique_text, Target};

const FEATURE: &str = "onboarding";
const FIRST_MESSAGE_TASK: &str = "Send your first message";

pub(super) fn scenarios(target: &Target) -> Vec<Scenario> {
    vec![first_message_task(target.clone())]
}

fn first_message_task(target: Target) -> Scenario {
    Scenario::new("first message completes onboarding task", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let onboarding = OnboardingHelper::new(&ctx);
            if !onboarding.checklist_visible().await? {
                tracing::info!("onboarding checklist already dismissed for this account");
                return Ok(());
            }
            let pending = onboarding.pending_tasks().await?;
            if !pending.iter().any(|task| task == FIRST_MESSAGE_TASK) {
                tracing::info!("first-message task already completed");
                return Ok(());
            }

            MessageHelper::new(&ctx)
                .send_text(&unique_text("onboarding"))
                .await?;
            ensure(
                onboarding.wait_for_task_completed(FIRST_MESSAGE_TASK).await?,
                "first-message task not marked done",
            )
        }
    })
}

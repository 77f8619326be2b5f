//! Onboarding checklist progress.

use crate::catalog;
use crate::context::TestContext;
use crate::result::E2eResult;

/// Onboarding checklist polling
#[derive(Debug, Clone)]
pub struct OnboardingHelper {
    ctx: TestContext,
}

impl OnboardingHelper {
    /// Helper driven through `ctx`
    #[must_use]
    pub fn new(ctx: &TestContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// The checklist is shown within budget
    pub async fn checklist_visible(&self) -> E2eResult<bool> {
        self.ctx.key_visible("onboarding.checklist").await
    }

    /// Tasks not yet marked done
    pub async fn pending_tasks(&self) -> E2eResult<Vec<String>> {
        let verifier = self.ctx.verifier();
        let all = verifier
            .read_all_texts(&catalog::candidates("onboarding.task")?)
            .await;
        let done = verifier
            .read_all_texts(&catalog::candidates("onboarding.task.done")?)
            .await;
        Ok(all.into_iter().filter(|t| !done.contains(t)).collect())
    }

    /// The task containing `task` is marked done within budget
    pub async fn wait_for_task_completed(&self, task: &str) -> E2eResult<bool> {
        let done = catalog::candidates("onboarding.task.done")?.containing_text(task);
        Ok(self
            .ctx
            .verifier()
            .poll_until_visible(&done, self.ctx.deadline())
            .await)
    }
}

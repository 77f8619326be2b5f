//! Scenario catalogue run by `mezon-e2e run`
//!
//! Each feature module contributes its scenarios; [`catalogue`] assembles
//! them into one suite in a fixed order.

mod clans;
mod direct_messages;
mod file_upload;
mod messages;
mod onboarding;
mod profile;

use mezon_e2e::pages::{ChannelPage, HomePage};
use mezon_e2e::{E2eResult, Suite, TestContext};
use serde::{Deserialize, Serialize};

/// Suite name used in reports
pub const SUITE_NAME: &str = "mezon";

/// Where in the application the scenarios run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Clan holding the test channel
    pub clan: String,
    /// Channel the message scenarios post in
    pub channel: String,
    /// Other users for direct-message scenarios
    pub peers: Vec<String>,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            clan: "QA Clan".to_string(),
            channel: "general".to_string(),
            peers: vec!["qa.bob".to_string(), "qa.carol".to_string()],
        }
    }
}

impl Target {
    /// Target channel `channel` in clan `clan`
    #[must_use]
    pub fn new(clan: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            clan: clan.into(),
            channel: channel.into(),
            ..Self::default()
        }
    }

    /// Set the direct-message peers
    #[must_use]
    pub fn with_peers(mut self, peers: Vec<String>) -> Self {
        self.peers = peers;
        self
    }

    /// Open the home view and switch to the target clan
    pub async fn open_clan(&self, ctx: &TestContext) -> E2eResult<()> {
        let home = HomePage::new(ctx);
        home.open().await?;
        home.select_clan(&self.clan).await
    }

    /// Open the target channel
    pub async fn open_channel(&self, ctx: &TestContext) -> E2eResult<()> {
        self.open_clan(ctx).await?;
        ChannelPage::new(ctx).open_channel(&self.channel).await
    }

    fn peer(&self, index: usize) -> E2eResult<&str> {
        self.peers.get(index).map(String::as_str).ok_or_else(|| {
            mezon_e2e::E2eError::config(format!(
                "E2E_PEERS: scenario needs {} peers, {} configured",
                index + 1,
                self.peers.len()
            ))
        })
    }
}

/// Message text unique to this run
pub(crate) fn unique_text(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix} {}", &id[..8])
}

/// Every scenario, grouped by feature
#[must_use]
pub fn catalogue(target: &Target) -> Suite {
    let mut suite = Suite::new(SUITE_NAME);
    let groups = [
        messages::scenarios(target),
        direct_messages::scenarios(target),
        file_upload::scenarios(target),
        onboarding::scenarios(target),
        clans::scenarios(target),
        profile::scenarios(target),
    ];
    for scenario in groups.into_iter().flatten() {
        suite.add(scenario);
    }
    suite
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mezon_e2e::config::{ScreenshotMode, SuiteConfig};
    use mezon_e2e::trace::TraceMode;
    use mezon_e2e::{MockEngine, MockEngineFactory, ScenarioFilter, ScenarioStatus, SuiteRunner};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    mod catalogue_tests {
        use super::*;

        #[test]
        fn test_names_are_unique() {
            let suite = catalogue(&Target::default());
            let names: HashSet<&str> = suite.scenarios.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names.len(), suite.scenarios.len());
        }

        #[test]
        fn test_features_in_catalogue_order() {
            let suite = catalogue(&Target::default());
            assert_eq!(
                suite.features(),
                vec![
                    "messages",
                    "direct_messages",
                    "file_upload",
                    "onboarding",
                    "clans",
                    "profile"
                ]
            );
        }

        #[test]
        fn test_feature_filter_selects_group() {
            let suite = catalogue(&Target::default());
            let filter = ScenarioFilter::all().with_feature("direct_messages");
            let selected: Vec<_> = suite.scenarios.iter().filter(|s| filter.matches(s)).collect();
            assert!(!selected.is_empty());
            assert!(selected.iter().all(|s| s.feature == "direct_messages"));
        }

        #[test]
        fn test_pattern_filter() {
            let suite = catalogue(&Target::default());
            let filter = ScenarioFilter::all().with_pattern("PIN");
            let names: Vec<_> = suite
                .scenarios
                .iter()
                .filter(|s| filter.matches(s))
                .map(|s| s.name.as_str())
                .collect();
            assert_eq!(names, vec!["pin and jump to message"]);
        }

        #[test]
        fn test_unique_text_differs() {
            let a = unique_text("hello");
            let b = unique_text("hello");
            assert!(a.starts_with("hello "));
            assert_ne!(a, b);
        }

        #[test]
        fn test_missing_peer_is_config_error() {
            let target = Target::default().with_peers(vec!["qa.bob".into()]);
            let err = target.peer(1).unwrap_err();
            assert!(err.to_string().contains("E2E_PEERS"));
        }
    }

    mod blank_app_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_every_scenario_fails_cleanly_on_blank_page() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = SuiteConfig::default()
                .with_output_dir(dir.path())
                .with_workers(4)
                .with_retries(0)
                .with_test_timeout(Duration::from_secs(10))
                .with_resolve_timeout(Duration::from_millis(100))
                .with_verify_timeout(Duration::from_millis(100))
                .with_screenshot(ScreenshotMode::Off)
                .with_trace(TraceMode::Off);
            config.action_timeout = Duration::from_millis(100);
            config.navigation_timeout = Duration::from_millis(100);

            let factory = MockEngineFactory::new(MockEngine::new);
            let runner = SuiteRunner::new(Arc::new(factory), config);
            let suite = catalogue(&Target::default());
            let report = runner.run(&suite, &ScenarioFilter::all()).await;

            assert_eq!(report.total(), suite.scenarios.len());
            for scenario in &report.scenarios {
                assert_eq!(scenario.status, ScenarioStatus::Failed, "{}", scenario.name);
                assert!(scenario.error.is_some());
            }
        }
    }
}

//! Fixture Management
//!
//! Async setup and teardown around a scenario attempt. Fixtures are set up
//! by descending priority and torn down in reverse; when one setup fails the
//! fixtures already set up are torn down before the error is returned.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::accounts::{Account, AccountLease, AccountPool};
use crate::context::TestContext;
use crate::helpers::FileUploadHelper;
use crate::result::{E2eError, E2eResult};
use crate::trace::{TraceKind, TraceStatus};

/// Setup/teardown around a scenario attempt.
///
/// # Example
///
/// ```ignore
/// struct OpenChannel;
///
/// #[async_trait]
/// impl Fixture for OpenChannel {
///     async fn setup(&mut self, ctx: &TestContext) -> E2eResult<()> {
///         ctx.goto("/chat/clans/1/channels/2").await
///     }
///
///     async fn teardown(&mut self, _ctx: &TestContext) -> E2eResult<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Fixture: Send + Sync {
    /// Set up the fixture before the scenario body
    async fn setup(&mut self, ctx: &TestContext) -> E2eResult<()>;

    /// Tear down the fixture after the scenario body
    async fn teardown(&mut self, ctx: &TestContext) -> E2eResult<()>;

    /// Get the fixture name for logging/debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get fixture priority (higher = set up first, tear down last)
    fn priority(&self) -> i32 {
        0
    }
}

/// State of a fixture in the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureState {
    /// Fixture is registered but not set up
    Registered,
    /// Fixture has been set up successfully
    SetUp,
    /// Fixture has been torn down
    TornDown,
    /// Fixture setup or teardown failed
    Failed,
}

struct FixtureEntry {
    fixture: Box<dyn Fixture>,
    state: FixtureState,
}

/// Priority-ordered fixture runner
#[derive(Default)]
pub struct FixtureManager {
    fixtures: Vec<FixtureEntry>,
    setup_order: Vec<usize>,
}

impl std::fmt::Debug for FixtureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureManager")
            .field("fixtures", &self.list())
            .field("set_up", &self.setup_order.len())
            .finish()
    }
}

impl FixtureManager {
    /// Create a new fixture manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture
    pub fn register<F: Fixture + 'static>(&mut self, fixture: F) {
        self.register_boxed(Box::new(fixture));
    }

    /// Register an already boxed fixture
    pub fn register_boxed(&mut self, fixture: Box<dyn Fixture>) {
        self.fixtures.push(FixtureEntry {
            fixture,
            state: FixtureState::Registered,
        });
    }

    /// Number of registered fixtures
    #[must_use]
    pub fn count(&self) -> usize {
        self.fixtures.len()
    }

    /// State of the fixture named `name`
    #[must_use]
    pub fn state(&self, name: &str) -> Option<FixtureState> {
        self.fixtures
            .iter()
            .find(|e| e.fixture.name() == name)
            .map(|e| e.state)
    }

    /// Registered fixture names, in registration order
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.fixtures.iter().map(|e| e.fixture.name()).collect()
    }

    /// Set up every fixture, highest priority first
    ///
    /// # Errors
    ///
    /// `Fixture` naming the failing fixture. Fixtures set up before it are
    /// torn down first.
    pub async fn setup_all(&mut self, ctx: &TestContext) -> E2eResult<()> {
        let mut ordered: Vec<usize> = (0..self.fixtures.len()).collect();
        // stable: equal priorities keep registration order
        ordered.sort_by_key(|&i| std::cmp::Reverse(self.fixtures[i].fixture.priority()));
        self.setup_order.clear();

        for index in ordered {
            let entry = &mut self.fixtures[index];
            if !matches!(entry.state, FixtureState::Registered | FixtureState::TornDown) {
                continue;
            }
            let started = Instant::now();
            let result = entry.fixture.setup(ctx).await;
            let name = entry.fixture.name().to_string();
            match result {
                Ok(()) => {
                    entry.state = FixtureState::SetUp;
                    self.setup_order.push(index);
                    ctx.record(
                        &format!("setup {name}"),
                        TraceKind::Fixture,
                        started.elapsed(),
                        TraceStatus::Ok,
                    );
                    debug!(fixture = %name, "fixture set up");
                }
                Err(e) => {
                    entry.state = FixtureState::Failed;
                    ctx.record(
                        &format!("setup {name}"),
                        TraceKind::Fixture,
                        started.elapsed(),
                        TraceStatus::Error,
                    );
                    if let Err(rollback) = self.teardown_all(ctx).await {
                        warn!(error = %rollback, "teardown after failed setup also failed");
                    }
                    return Err(E2eError::fixture(format!("Fixture '{name}' setup failed: {e}")));
                }
            }
        }
        Ok(())
    }

    /// Tear down every set-up fixture in reverse setup order
    ///
    /// # Errors
    ///
    /// The first teardown error; the remaining fixtures are still torn down.
    pub async fn teardown_all(&mut self, ctx: &TestContext) -> E2eResult<()> {
        let mut first_error: Option<E2eError> = None;
        let order = std::mem::take(&mut self.setup_order);

        for index in order.into_iter().rev() {
            let entry = &mut self.fixtures[index];
            if entry.state != FixtureState::SetUp {
                continue;
            }
            let started = Instant::now();
            match entry.fixture.teardown(ctx).await {
                Ok(()) => {
                    entry.state = FixtureState::TornDown;
                    ctx.record(
                        &format!("teardown {}", entry.fixture.name()),
                        TraceKind::Fixture,
                        started.elapsed(),
                        TraceStatus::Ok,
                    );
                }
                Err(e) => {
                    entry.state = FixtureState::Failed;
                    ctx.record(
                        &format!("teardown {}", entry.fixture.name()),
                        TraceKind::Fixture,
                        started.elapsed(),
                        TraceStatus::Error,
                    );
                    if first_error.is_none() {
                        first_error = Some(E2eError::fixture(format!(
                            "Fixture '{}' teardown failed: {e}",
                            entry.fixture.name()
                        )));
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// Leases an account and seeds its session into the engine context
#[derive(Debug)]
pub struct AuthFixture {
    pool: AccountPool,
    lease: Option<AccountLease>,
}

impl AuthFixture {
    /// Fixture leasing from `pool`
    #[must_use]
    pub const fn new(pool: AccountPool) -> Self {
        Self { pool, lease: None }
    }

    /// Account leased by the last setup
    #[must_use]
    pub fn account(&self) -> Option<&Account> {
        self.lease.as_ref().map(AccountLease::account)
    }
}

#[async_trait]
impl Fixture for AuthFixture {
    async fn setup(&mut self, ctx: &TestContext) -> E2eResult<()> {
        let lease = self.pool.checkout(ctx.deadline()).await?;
        let seed = lease
            .account()
            .session_seed(ctx.config().session_endpoint.clone());
        seed.apply(ctx.engine().as_ref(), &ctx.config().base_url)
            .await?;
        self.lease = Some(lease);
        Ok(())
    }

    async fn teardown(&mut self, _ctx: &TestContext) -> E2eResult<()> {
        if let Some(lease) = self.lease.take() {
            lease.release();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "auth"
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// Generates upload fixture files and removes them at teardown
#[derive(Debug)]
pub struct UploadFilesFixture {
    files: Vec<(String, u64)>,
    helper: Option<FileUploadHelper>,
    paths: Vec<PathBuf>,
}

impl UploadFilesFixture {
    /// Fixture creating `files` as `(name, size)` pairs
    #[must_use]
    pub fn new(files: Vec<(String, u64)>) -> Self {
        Self {
            files,
            helper: None,
            paths: Vec::new(),
        }
    }

    /// Paths created by the last setup, in declaration order
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[async_trait]
impl Fixture for UploadFilesFixture {
    async fn setup(&mut self, ctx: &TestContext) -> E2eResult<()> {
        let mut helper = FileUploadHelper::new(ctx)?;
        self.paths.clear();
        for (name, size) in &self.files {
            self.paths.push(helper.create_fixture(name, *size).await?);
        }
        self.helper = Some(helper);
        Ok(())
    }

    async fn teardown(&mut self, _ctx: &TestContext) -> E2eResult<()> {
        self.paths.clear();
        match self.helper.take() {
            Some(helper) => helper.cleanup(),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "upload-files"
    }
}

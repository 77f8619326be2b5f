//! mezon-e2e: resilient end-to-end UI automation for the Mezon chat client
//!
//! Elements are located through ordered fallback chains of selectors
//! ([`CandidateList`]) so a scenario survives markup drift: a stable
//! `data-e2e` attribute first, then structural CSS, then visible text.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Scenarios (runner)                                              │
//! │      │                                                           │
//! │      ▼                                                           │
//! │  Helpers ──► Page objects ──► Interactor / Verifier / Workflow   │
//! │                                   │                              │
//! │                                   ▼                              │
//! │                           Resolver (fallback chains + polling)   │
//! │                                   │                              │
//! │                                   ▼                              │
//! │                  AutomationEngine (MockEngine | CdpEngine)       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every wait runs under a per-attempt [`Deadline`]; verifications report
//! `false` instead of failing when their condition never holds.

#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod deadline;
pub mod engine;
pub mod fixture;
pub mod helpers;
pub mod interaction;
pub mod logging;
pub mod page_object;
pub mod pages;
pub mod reporter;
pub mod resolver;
mod result;
pub mod runner;
pub mod selector;
pub mod trace;
pub mod verify;
pub mod wait;
pub mod workflow;

pub use accounts::{Account, AccountLease, AccountPool};
pub use auth::{MezonSessionEndpoint, PersistAuth, PersistMeta, SessionSeed};
pub use config::{ScreenshotMode, SuiteConfig, VideoMode};
pub use context::TestContext;
pub use deadline::Deadline;
pub use engine::{
    AutomationEngine, ElementHandle, EngineFactory, MockEngine, MockEngineFactory, Screenshot,
};
#[cfg(feature = "browser")]
pub use engine::{CdpEngine, CdpEngineFactory, CdpOptions};
pub use fixture::{AuthFixture, Fixture, FixtureManager, FixtureState, UploadFilesFixture};
pub use interaction::Interactor;
pub use logging::{init_logging, LogConfig};
pub use page_object::{PageObject, PageObjectBuilder, SimplePageObject, UrlMatcher};
pub use reporter::{FailureMode, RunReport, ScenarioReport, ScenarioStatus};
pub use resolver::{ResolvedElement, Resolver};
pub use result::{ensure, E2eError, E2eResult};
pub use runner::{Scenario, ScenarioFilter, Suite, SuiteRunner};
pub use selector::{Candidate, CandidateList, Pick, Selector};
pub use trace::{StepTrace, TraceEntry, TraceKind, TraceMode, TraceStatus};
pub use verify::{Verification, Verifier};
pub use wait::{PollOptions, WaitResult};
pub use workflow::{PinJumpState, Workflow, WorkflowState};

/// Everything a scenario module usually needs
pub mod prelude {
    pub use super::accounts::*;
    pub use super::auth::*;
    pub use super::config::*;
    pub use super::context::*;
    pub use super::deadline::*;
    pub use super::engine::{AutomationEngine, EngineFactory, MockElement, MockEngine};
    pub use super::fixture::*;
    pub use super::helpers::*;
    pub use super::pages::*;
    pub use super::page_object::{wait_until_loaded, PageObject};
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::selector::*;
    pub use super::workflow::*;
}

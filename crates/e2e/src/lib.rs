//! Plan UI E2E Test Framework
//!
//! This crate drives the pipeline-management web UI through a browser and
//! checks the state it renders against the API responses behind it:
//! - Spawns the UI server as a subprocess
//! - Controls Playwright through a JSON line bridge
//! - Provides one helper per workflow interaction (files, environments, plans)
//! - Runs the acceptance scenario end to end and records its steps
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── ServerHandle::spawn() -> base url                    │
//! │    ├── PlaywrightHandle::launch() -> impl Page              │
//! │    └── run_on(page, Scenario) -> ScenarioResult             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  helpers (over dyn Page)                                    │
//! │    ├── files: open_folders, select_file, save               │
//! │    ├── environment: select, add, details                    │
//! │    ├── plan: go_to_plan, apply_plan, go_back_to             │
//! │    └── checks: startup, changes/backfills, errors           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  plan::PlanState                                            │
//! │    Idle -> Drafting -> [AwaitingConfirmation] -> Running    │
//! │         -> Completed -> Idle                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod helpers;
pub mod locator;
pub mod page;
pub mod path;
pub mod plan;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod server;

pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use page::{Expectation, NetworkResponse, Page, ResponseWaiter, Timeouts};
pub use plan::{PlanAction, PlanState};
pub use runner::ScenarioRunner;
pub use scenario::Scenario;

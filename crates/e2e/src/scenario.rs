//! Acceptance scenarios built from the helper library

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::helpers::{
    add_environment, apply_plan, await_startup, check_changes_and_backfills, check_environment_details,
    check_errors, check_file, check_model_change, go_back_to, go_to_plan, select_environment, select_file,
    set_file_content_and_save, ApplyPlan, ChangesAndBackfills, EnvironmentDetails, ModelChange, Startup,
};
use crate::page::Page;
use crate::plan::PlanAction;

pub const EDITOR_ROUTE: &str = "/editor";

/// Example project the basic demo expects to be served; the UI names a
/// project after its directory
pub const BASIC_PROJECT: &str = "basic";

pub const INCREMENTAL_MODEL_PATH: &str = "models/incremental_model.sql";

/// Incremental model with a row limit added
pub const INCREMENTAL_MODEL_LIMITED: &str = r#"
  MODEL (
    name sqlmesh_example.incremental_model,
    kind INCREMENTAL_BY_TIME_RANGE (
        time_column event_date
    ),
    start '2020-01-01',
    cron '@daily',
    grain (id, event_date)
  );

  SELECT
      id,
      item_id,
      event_date,
  FROM
      sqlmesh_example.seed_model
  WHERE
      event_date between @start_date and @end_date
  LIMIT 3
"#;

/// Incremental model with the row limit removed again
pub const INCREMENTAL_MODEL_UNLIMITED: &str = r#"
  MODEL (
    name sqlmesh_example.incremental_model,
    kind INCREMENTAL_BY_TIME_RANGE (
        time_column event_date
    ),
    start '2020-01-01',
    cron '@daily',
    grain (id, event_date)
  );

  SELECT
      id,
      item_id,
      event_date,
  FROM
      sqlmesh_example.seed_model
  WHERE
      event_date between @start_date and @end_date
"#;

const DEV_INCREMENTAL_MODEL: &str = "sqlmesh_example__dev.incremental_model";

/// A completed workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub duration_ms: u64,
}

/// Progress log of a running scenario
#[derive(Debug, Default)]
pub struct StepLog {
    completed: Vec<StepRecord>,
    current: Option<(String, Instant)>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the current step and start `name`
    pub fn step(&mut self, name: impl Into<String>) {
        self.close_current();
        let name = name.into();
        info!("{}", name);
        self.current = Some((name, Instant::now()));
    }

    fn close_current(&mut self) {
        if let Some((name, started)) = self.current.take() {
            self.completed.push(StepRecord {
                name,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }
    }

    /// Name of the step in progress
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|(name, _)| name.as_str())
    }

    /// Steps that finished; an aborted step is not included
    pub fn completed(&self) -> &[StepRecord] {
        &self.completed
    }

    /// Close the step in progress and return every record
    pub fn finish(mut self) -> Vec<StepRecord> {
        self.close_current();
        self.completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    BasicDemo,
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::BasicDemo => "basic-demo",
        }
    }

    pub async fn run(&self, page: &dyn Page, log: &mut StepLog) -> E2eResult<()> {
        match self {
            Scenario::BasicDemo => basic_demo(page, log).await,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic-demo" | "basic" => Ok(Scenario::BasicDemo),
            other => Err(E2eError::assertion(format!("unknown scenario: {}", other))),
        }
    }
}

async fn plan_and_apply(page: &dyn Page, opts: ApplyPlan<'_>) -> E2eResult<()> {
    go_to_plan(page, opts.env, opts.action).await?;
    apply_plan(page, opts).await?;
    after_apply(page, opts.env).await
}

async fn after_apply(page: &dyn Page, env: &str) -> E2eResult<()> {
    go_back_to(page, EDITOR_ROUTE).await?;
    check_errors(page, "No Errors").await?;
    check_changes_and_backfills(page, ChangesAndBackfills::backfills(0)).await?;
    check_environment_details(page, &EnvironmentDetails::new(env)).await
}

fn breaking_change_in_dev() -> ModelChange<'static> {
    ModelChange {
        group: "Modified Directly",
        model: DEV_INCREMENTAL_MODEL,
        change: "Breaking Change",
    }
}

fn one_breaking_change(backfills: u32) -> ChangesAndBackfills {
    ChangesAndBackfills {
        direct: Some(1),
        indirect: Some(1),
        backfills: Some(backfills),
        ..Default::default()
    }
}

/// Promote the example project to prod, branch it into dev and push model
/// edits through both environments
pub async fn basic_demo(page: &dyn Page, log: &mut StepLog) -> E2eResult<()> {
    log.step("Load application");
    await_startup(
        page,
        &Startup {
            project_name: Some(BASIC_PROJECT.to_string()),
            ..Default::default()
        },
    )
    .await?;
    check_environment_details(
        page,
        &EnvironmentDetails {
            env: "prod",
            action_disabled: Some(false),
            selector_disabled: Some(true),
        },
    )
    .await?;
    check_changes_and_backfills(
        page,
        ChangesAndBackfills {
            added: Some(3),
            backfills: Some(3),
            ..Default::default()
        },
    )
    .await?;
    check_errors(page, "No Errors").await?;
    check_file(page, "config.yaml").await?;

    log.step("Initial prod backfill");
    let backfill = PlanAction::ApplyChangesAndBackfill;
    let virtual_update = PlanAction::ApplyVirtualUpdate;
    plan_and_apply(page, ApplyPlan::new("prod", backfill)).await?;

    log.step("Add dev");
    add_environment(page, "dev").await?;

    log.step("Apply changes to dev");
    check_changes_and_backfills(page, ChangesAndBackfills::backfills(0)).await?;
    plan_and_apply(page, ApplyPlan::new("dev", virtual_update)).await?;

    log.step("Change model");
    select_file(page, INCREMENTAL_MODEL_PATH, None).await?;
    set_file_content_and_save(page, INCREMENTAL_MODEL_PATH, INCREMENTAL_MODEL_LIMITED).await?;

    log.step("Apply changes to dev");
    check_changes_and_backfills(page, one_breaking_change(2)).await?;
    go_to_plan(page, "dev", backfill).await?;
    check_model_change(page, breaking_change_in_dev()).await?;
    apply_plan(page, ApplyPlan::new("dev", backfill)).await?;
    after_apply(page, "dev").await?;

    log.step("Select prod");
    select_environment(page, "prod").await?;
    check_environment_details(page, &EnvironmentDetails::new("prod")).await?;

    log.step("Apply virtual update to prod");
    check_changes_and_backfills(page, one_breaking_change(0)).await?;
    plan_and_apply(page, ApplyPlan::new("prod", virtual_update).confirmed()).await?;

    log.step("Select dev");
    select_environment(page, "dev").await?;
    check_environment_details(page, &EnvironmentDetails::new("dev")).await?;
    check_changes_and_backfills(page, ChangesAndBackfills::backfills(0)).await?;

    log.step("Change model");
    set_file_content_and_save(page, INCREMENTAL_MODEL_PATH, INCREMENTAL_MODEL_UNLIMITED).await?;

    log.step("Apply changes to dev");
    check_changes_and_backfills(page, one_breaking_change(2)).await?;
    go_to_plan(page, "dev", backfill).await?;
    check_model_change(page, breaking_change_in_dev()).await?;
    apply_plan(page, ApplyPlan::new("dev", backfill)).await?;
    after_apply(page, "dev").await?;

    log.step("End");
    Ok(())
}

//! Plan page helpers

use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::helpers::ids;
use crate::locator::Locator;
use crate::page::{Expectation, Page};
use crate::plan::{PlanAction, PlanControl, PlanEvent, PlanState};

/// Route of the plan page for an environment
pub fn plan_route(env: &str) -> String {
    format!("/plan/environments/{}", env)
}

/// Parameters of a plan application
#[derive(Debug, Clone, Copy)]
pub struct ApplyPlan<'a> {
    pub env: &'a str,
    pub action: PlanAction,

    /// The application asks to confirm this environment/action pair
    pub expect_confirmation: bool,
}

impl<'a> ApplyPlan<'a> {
    pub fn new(env: &'a str, action: PlanAction) -> Self {
        Self { env, action, expect_confirmation: false }
    }

    pub fn confirmed(mut self) -> Self {
        self.expect_confirmation = true;
        self
    }
}

fn plan() -> Locator {
    Locator::test_id(ids::PLAN)
}

fn confirmation() -> Locator {
    Locator::test_id(ids::MODAL_CONFIRMATION)
}

fn confirm_button(env: &str) -> Locator {
    confirmation().button(format!("Yes, Run {}", env))
}

/// Locator of a plan control while `action` is the expected primary action
pub fn control_locator(control: PlanControl, action: PlanAction) -> Locator {
    match control {
        PlanControl::Primary => plan().button(action.label()),
        PlanControl::StartOver => plan().button(PlanAction::StartOver.label()),
        PlanControl::Cancel => plan().button(PlanAction::Cancel.label()),
        PlanControl::GoBack => plan().button(PlanAction::GoBack.label()),
        PlanControl::Confirmation => confirmation(),
    }
}

/// Assert every visibility predicate of `state`
pub async fn expect_state(page: &dyn Page, state: PlanState, action: PlanAction) -> E2eResult<()> {
    debug!("Expect plan state {}", state);

    let timeouts = page.timeouts();
    for predicate in state.predicates() {
        let locator = control_locator(predicate.control, action);
        let expectation = if predicate.visible {
            Expectation::Visible
        } else {
            Expectation::Hidden
        };
        let timeout = if predicate.extended {
            timeouts.extended
        } else {
            timeouts.default
        };
        page.expect(&locator, expectation, timeout).await?;
    }

    Ok(())
}

/// Open the plan page of the current environment
///
/// Returns once the plan is drafted with `action` as its primary button.
pub async fn go_to_plan(page: &dyn Page, env: &str, action: PlanAction) -> E2eResult<PlanState> {
    info!("Go to plan for {} expecting {}", env, action);

    let link = Locator::test_id(ids::ENVIRONMENT_DETAILS).get_by_role_named("link", "Plan");
    page.expect_visible(&link).await?;
    page.click(&link).await?;
    page.wait_for_url(&plan_route(env)).await?;

    page.expect_visible(&plan()).await?;

    let state = PlanState::Idle.transition(PlanEvent::Open)?;
    expect_state(page, state, action).await?;
    Ok(state)
}

/// Run the primary action of a drafted plan to completion
pub async fn apply_plan(page: &dyn Page, opts: ApplyPlan<'_>) -> E2eResult<PlanState> {
    info!("Apply plan to {}: {}", opts.env, opts.action);

    if !opts.action.is_apply() {
        return Err(E2eError::assertion(format!("{} does not apply a plan", opts.action)));
    }

    page.expect_visible(&plan()).await?;

    let mut state = PlanState::Drafting;
    expect_state(page, state, opts.action).await?;

    page.click(&control_locator(PlanControl::Primary, opts.action)).await?;
    state = state.transition(PlanEvent::Apply {
        requires_confirmation: opts.expect_confirmation,
    })?;

    if state == PlanState::AwaitingConfirmation {
        expect_state(page, state, opts.action).await?;
        let confirm = confirm_button(opts.env);
        page.expect_visible(&confirm).await?;
        page.click(&confirm).await?;
        state = state.transition(PlanEvent::Confirm)?;
    } else {
        page.expect_hidden(&confirmation()).await.map_err(|e| match e {
            E2eError::Timeout(_) => E2eError::assertion(format!(
                "confirmation requested for {} on {} without being expected",
                opts.action, opts.env
            )),
            other => other,
        })?;
    }

    expect_state(page, state, opts.action).await?;

    state = state.transition(PlanEvent::Finish)?;
    expect_state(page, state, opts.action).await?;

    info!("Plan applied to {}", opts.env);
    Ok(state)
}

/// Leave a completed plan through its Go Back control
pub async fn go_back_to(page: &dyn Page, route: &str) -> E2eResult<()> {
    page.click(&Locator::title_exact(PlanAction::GoBack.label())).await?;
    page.wait_for_url(route).await
}

/// Expected entry of the plan stage tracker
#[derive(Debug, Clone, Copy)]
pub struct ModelChange<'a> {
    /// Change group, e.g. "Modified Directly"
    pub group: &'a str,
    pub model: &'a str,
    /// Change classification, e.g. "Breaking Change"
    pub change: &'a str,
}

pub async fn check_model_change(page: &dyn Page, expected: ModelChange<'_>) -> E2eResult<()> {
    let tracker = Locator::test_id(ids::PLAN_STAGE_TRACKER);
    page.expect_visible(&tracker).await?;

    let group = tracker.get_by_title(expected.group);
    page.expect_visible(&group).await?;
    page.expect_visible(&group.get_by_text(expected.model)).await?;
    page.expect_visible(&group.get_by_text(expected.change)).await
}

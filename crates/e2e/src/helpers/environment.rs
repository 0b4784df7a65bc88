//! Environment selector helpers

use tracing::info;

use crate::error::E2eResult;
use crate::helpers::{environment_details, environment_label, ids};
use crate::page::Page;

/// Switch to an existing environment
pub async fn select_environment(page: &dyn Page, env: &str) -> E2eResult<()> {
    info!("Select environment {}", env);

    let select = environment_details().get_by_test_id(ids::SELECT_ENVIRONMENT);
    page.expect_visible(&select).await?;
    page.click(&select.get_by_role("button")).await?;

    let item = select
        .get_by_test_id(ids::SELECT_ENVIRONMENT_LIST)
        .get_by_text_exact(env);
    page.expect_visible(&item).await?;
    page.click(&item).await?;

    // The active entry stays listed but can no longer be picked
    page.expect_disabled(&item).await?;

    let selected = select.button(environment_label(env));
    page.expect_visible(&selected).await?;
    page.expect_enabled(&selected).await
}

/// Create an environment through the selector's add panel
///
/// Adding an environment also makes it the selected one.
pub async fn add_environment(page: &dyn Page, env: &str) -> E2eResult<()> {
    info!("Add environment {}", env);

    let details = environment_details();
    page.expect_visible(&details.get_by_test_id(ids::SELECT_ENVIRONMENT)).await?;
    page.click(&details.button(environment_label(""))).await?;

    let add = details
        .get_by_test_id(ids::SELECT_ENVIRONMENT_LIST)
        .get_by_test_id(ids::ADD_ENVIRONMENT);
    page.expect_visible(&add).await?;
    page.fill(&add.get_by_role("textbox"), env).await?;

    let add_button = add.button("Add");
    page.expect_visible(&add_button).await?;
    page.click(&add_button).await?;

    page.expect_visible(&details.button(environment_label(env))).await
}

/// Expected state of the environment details panel
#[derive(Debug, Clone, Default)]
pub struct EnvironmentDetails<'a> {
    pub env: &'a str,

    /// Whether the Plan link is expected to be disabled
    pub action_disabled: Option<bool>,

    /// Whether the environment selector is expected to be disabled
    pub selector_disabled: Option<bool>,
}

impl<'a> EnvironmentDetails<'a> {
    pub fn new(env: &'a str) -> Self {
        Self { env, ..Default::default() }
    }
}

pub async fn check_environment_details(page: &dyn Page, expected: &EnvironmentDetails<'_>) -> E2eResult<()> {
    let details = environment_details();
    page.expect_visible(&details).await?;

    let selector = details.button(environment_label(expected.env));
    page.expect_visible(&selector).await?;

    if let Some(disabled) = expected.selector_disabled {
        if disabled {
            page.expect_disabled(&selector).await?;
        } else {
            page.expect_enabled(&selector).await?;
        }
    }

    if let Some(disabled) = expected.action_disabled {
        let plan = details.get_by_role_named("link", "Plan");
        page.expect_visible(&plan).await?;
        if disabled {
            page.expect_disabled(&plan).await?;
        } else {
            page.expect_enabled(&plan).await?;
        }
    }

    Ok(())
}

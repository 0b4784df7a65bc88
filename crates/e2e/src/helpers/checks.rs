//! Readiness and page state checks

use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::helpers::{environment_details, ids};
use crate::locator::Locator;
use crate::page::{Page, ResponseWaiter};

pub const MODULES_ROUTE: &str = "/api/modules";
pub const META_ROUTE: &str = "/api/meta";
pub const EVENTS_ROUTE: &str = "/api/events";
pub const FILES_ROUTE: &str = "/api/files";
pub const ENVIRONMENTS_ROUTE: &str = "/api/environments";
pub const MODELS_ROUTE: &str = "/api/models";
pub const PLAN_ROUTE: &str = "/api/plan";

/// Endpoints the application requests while loading, in await order
/// after `/api/modules`
const LOAD_ROUTES: [&str; 6] = [
    EVENTS_ROUTE,
    META_ROUTE,
    MODELS_ROUTE,
    ENVIRONMENTS_ROUTE,
    FILES_ROUTE,
    PLAN_ROUTE,
];

/// What the application must report while loading
#[derive(Debug, Clone)]
pub struct Startup {
    /// Modules `/api/modules` must list
    pub modules: Vec<String>,

    /// Project name `/api/files` must report
    pub project_name: Option<String>,

    /// Route the root redirects to
    pub landing_route: String,
}

impl Default for Startup {
    fn default() -> Self {
        Self {
            modules: ["docs", "editor", "errors", "plans", "files"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            project_name: None,
            landing_route: "/editor".to_string(),
        }
    }
}

/// Load the application and gate on its startup requests
pub async fn await_startup(page: &dyn Page, expected: &Startup) -> E2eResult<()> {
    let modules = page.expect_response(MODULES_ROUTE).await?;
    let mut waiters: Vec<ResponseWaiter> = Vec::with_capacity(LOAD_ROUTES.len());
    for route in LOAD_ROUTES {
        waiters.push(page.expect_response(route).await?);
    }

    page.goto("/").await?;

    let response = page.await_response(modules).await?;
    response.expect_status(200)?;
    let listed: Vec<&str> = response
        .json()?
        .as_array()
        .map(|modules| modules.iter().filter_map(|m| m.as_str()).collect())
        .unwrap_or_default();
    for module in &expected.modules {
        if !listed.contains(&module.as_str()) {
            return Err(E2eError::assertion(format!(
                "module {} missing from {}: {:?}",
                module, MODULES_ROUTE, listed
            )));
        }
    }

    page.wait_for_url(&expected.landing_route).await?;

    for waiter in waiters {
        let route = waiter.url.clone();
        let response = page.await_response(waiter).await?;
        response.expect_status(200)?;

        if route == FILES_ROUTE {
            if let Some(project) = &expected.project_name {
                let name = response.json()?.get("name").and_then(|n| n.as_str());
                if name != Some(project.as_str()) {
                    return Err(E2eError::assertion(format!(
                        "expected project {}, got {:?}",
                        project, name
                    )));
                }
            }
        }
    }

    info!("Application loaded");
    Ok(())
}

/// Counters shown in the environment details panel; `None` is not checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangesAndBackfills {
    pub added: Option<u32>,
    pub direct: Option<u32>,
    pub indirect: Option<u32>,
    pub backfills: Option<u32>,
}

impl ChangesAndBackfills {
    pub const ADDED: &'static str = "Added";
    pub const DIRECT: &'static str = "Directly Modified";
    pub const INDIRECT: &'static str = "Indirectly Modified";
    pub const BACKFILLS: &'static str = "Backfills";

    pub fn backfills(count: u32) -> Self {
        Self { backfills: Some(count), ..Default::default() }
    }

    fn counters(&self) -> [(&'static str, Option<u32>); 4] {
        [
            (Self::ADDED, self.added),
            (Self::DIRECT, self.direct),
            (Self::INDIRECT, self.indirect),
            (Self::BACKFILLS, self.backfills),
        ]
    }
}

pub async fn check_changes_and_backfills(page: &dyn Page, expected: ChangesAndBackfills) -> E2eResult<()> {
    let details = environment_details();
    page.expect_visible(&details).await?;

    for (label, count) in expected.counters() {
        if let Some(count) = count {
            let counter = details.get_by_title_exact(label);
            page.expect_visible(&counter).await?;
            page.expect_visible(&counter.get_by_text_exact(count.to_string())).await?;
        }
    }

    Ok(())
}

/// Assert the error indicator shows `label`, e.g. "No Errors"
pub async fn check_errors(page: &dyn Page, label: &str) -> E2eResult<()> {
    let navigation = Locator::test_id(ids::PAGE_NAVIGATION);
    page.expect_visible(&navigation).await?;
    page.expect_visible(&navigation.get_by_text_exact(label)).await
}

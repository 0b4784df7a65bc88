//! Interaction and verification helpers
//!
//! One async procedure per concern of the workflow. Every helper drives the
//! page through [`crate::page::Page`], registers response waits before the
//! action that triggers them and returns only once its last assertion holds.

pub mod checks;
pub mod environment;
pub mod files;
pub mod plan;

pub use checks::{await_startup, check_changes_and_backfills, check_errors, ChangesAndBackfills, Startup};
pub use environment::{add_environment, check_environment_details, select_environment, EnvironmentDetails};
pub use files::{check_file, normalize_content, open_folders, select_file, set_file_content_and_save};
pub use plan::{apply_plan, check_model_change, go_back_to, go_to_plan, ApplyPlan, ModelChange};

use crate::locator::Locator;

/// Test identifiers exposed by the application
pub mod ids {
    pub const EDITOR: &str = "editor";
    pub const CODE_EDITOR: &str = "code-editor";
    pub const EDITOR_FOOTER: &str = "editor-footer";
    pub const EDITOR_TABS: &str = "editor-tabs";
    pub const FILE_EXPLORER: &str = "file-explorer";
    pub const PLAN: &str = "plan";
    pub const PLAN_STAGE_TRACKER: &str = "plan-stage-tracker";
    pub const ENVIRONMENT_DETAILS: &str = "environment-details";
    pub const PAGE_NAVIGATION: &str = "page-navigation";
    pub const SELECT_ENVIRONMENT: &str = "select-environment";
    pub const SELECT_ENVIRONMENT_LIST: &str = "select-environment-list";
    pub const ADD_ENVIRONMENT: &str = "add-environment";
    pub const MODAL_CONFIRMATION: &str = "modal-confirmation";
}

/// Title of the indicator shown for files without pending edits
pub const SAVED: &str = "saved";

/// Title of the indicator shown for files with pending edits
pub const UNSAVED: &str = "unsaved";

pub(crate) fn editor() -> Locator {
    Locator::test_id(ids::EDITOR)
}

pub(crate) fn file_explorer() -> Locator {
    Locator::test_id(ids::FILE_EXPLORER)
}

pub(crate) fn environment_details() -> Locator {
    Locator::test_id(ids::PAGE_NAVIGATION).get_by_test_id(ids::ENVIRONMENT_DETAILS)
}

/// Accessible name of the environment selector button
pub(crate) fn environment_label(env: &str) -> String {
    format!("Environment:{}", env)
}

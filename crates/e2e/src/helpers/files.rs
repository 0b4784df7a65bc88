//! File explorer and editor helpers

use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::helpers::checks::PLAN_ROUTE;
use crate::helpers::{editor, file_explorer, ids, SAVED, UNSAVED};
use crate::locator::Locator;
use crate::page::Page;
use crate::path::{cumulative_titles, TargetPath};

/// Key combination that saves the active editor tab
pub const SAVE_SHORTCUT: &str = "Control+S";

/// Lines of `text`, trimmed, with blank lines dropped
pub fn normalize_content(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
}

/// Open each folder in turn, outermost first
///
/// The explorer titles nested folders with their cumulative path, so
/// `["models", "sub"]` activates `models` and then `models/sub` (with the
/// page's separator). A folder that never shows up fails the wait.
pub async fn open_folders(page: &dyn Page, folders: &[String]) -> E2eResult<()> {
    let explorer = file_explorer();
    page.expect_visible(&explorer).await?;

    for title in cumulative_titles(folders, page.separator()) {
        info!("Open folder {}", title);
        let folder = explorer.get_by_title_exact(&title);
        page.expect_visible(&folder).await?;
        page.click(&folder).await?;
    }

    Ok(())
}

/// Assert a file is listed in the explorer
///
/// Entries are titled with their full path, so a nested file is looked up
/// as `models/a.sql` rather than `a.sql`.
pub async fn check_file(page: &dyn Page, path: &str) -> E2eResult<()> {
    let target = TargetPath::parse(path, page.separator());
    info!("Check file {} located at {}", target.leaf, target.location());

    open_folders(page, &target.folders).await?;

    let explorer = file_explorer();
    page.expect_visible(&explorer).await?;
    page.expect_visible(&explorer.get_by_title_exact(&target.normalized)).await
}

/// Open a file from the explorer and verify the editor shows what the API
/// returned for it
pub async fn select_file(page: &dyn Page, path: &str, model_name: Option<&str>) -> E2eResult<()> {
    let target = TargetPath::parse(path, page.separator());
    info!("Select file {} located at {}", target.leaf, target.location());

    open_folders(page, &target.folders).await?;

    let api_file = page.expect_response(&target.api_route()).await?;

    let editor = editor();
    page.expect_visible(&editor).await?;
    let code_editor = editor.get_by_test_id(ids::CODE_EDITOR);
    page.expect_visible(&code_editor).await?;
    let tabs = Locator::test_id(ids::EDITOR_TABS);
    page.expect_visible(&tabs).await?;
    let tab = tabs.get_by_title(&target.normalized);
    page.expect_hidden(&tab).await?;

    let explorer = file_explorer();
    page.expect_visible(&explorer).await?;
    let file = explorer.get_by_title_exact(&target.normalized);
    page.expect_visible(&file).await?;

    info!("Selecting {}", target.leaf);
    page.click(&file).await?;

    let response = page.await_response(api_file).await?;
    response.expect_status(200)?;
    let body = response.json()?;

    expect_field(body, "path", &target.logical)?;
    expect_field(body, "name", &target.leaf)?;

    let api_content = body
        .get("content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| E2eError::assertion(format!("{} response has no content", target.logical)))?;
    let rendered = page.inner_text(&code_editor.get_by_role("textbox")).await?;

    if normalize_content(&rendered) != normalize_content(api_content) {
        return Err(E2eError::ContentMismatch { path: target.logical });
    }

    page.expect_visible(&tab).await?;

    if let Some(model) = model_name {
        page.expect_visible(&code_editor.get_by_text(model)).await?;
    }

    Ok(())
}

fn expect_field(body: &serde_json::Value, field: &str, expected: &str) -> E2eResult<()> {
    match body.get(field).and_then(|v| v.as_str()) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(E2eError::assertion(format!(
            "expected {} to equal {:?}, got {:?}",
            field, expected, actual
        ))),
    }
}

/// Replace the content of an open file and save it
///
/// The tab and footer indicators must read `saved` before the edit,
/// `unsaved` after it, and `saved` again once both the file save and the
/// plan recomputation it triggers have answered 204.
pub async fn set_file_content_and_save(page: &dyn Page, path: &str, content: &str) -> E2eResult<()> {
    let target = TargetPath::parse(path, page.separator());
    info!("Set new content for {} and save", target.leaf);

    let editor = editor();
    page.expect_visible(&editor).await?;
    let code_editor = editor.get_by_test_id(ids::CODE_EDITOR);
    page.expect_visible(&code_editor).await?;
    let footer = editor.get_by_test_id(ids::EDITOR_FOOTER);
    page.expect_visible(&footer).await?;
    let tabs = editor.get_by_test_id(ids::EDITOR_TABS);
    page.expect_visible(&tabs).await?;
    let tab = tabs.get_by_title(&target.normalized);
    page.expect_visible(&tab).await?;

    expect_indicators(page, &tab, &footer, SAVED).await?;

    let textbox = code_editor.get_by_role("textbox");
    page.fill(&textbox, content).await?;

    expect_indicators(page, &tab, &footer, UNSAVED).await?;

    let api_file = page.expect_response(&target.api_route()).await?;
    let api_plan = page.expect_response(PLAN_ROUTE).await?;
    page.press(&textbox, SAVE_SHORTCUT).await?;

    page.await_response(api_file)
        .await?
        .expect_status(204)?
        .expect_empty_body()?;
    page.await_response(api_plan)
        .await?
        .expect_status(204)?
        .expect_empty_body()?;

    expect_indicators(page, &tab, &footer, SAVED).await
}

async fn expect_indicators(page: &dyn Page, tab: &Locator, footer: &Locator, title: &str) -> E2eResult<()> {
    page.expect_visible(&tab.get_by_title_exact(title)).await?;
    page.expect_visible(&footer.get_by_title_exact(title)).await
}

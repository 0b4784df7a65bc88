//! Playwright browser automation
//!
//! A generated node script keeps one browser page open and executes
//! requests read line by line from stdin, answering each with a JSON line
//! on stdout. Requests are handled strictly in order. Response waits are
//! registered as promises inside the script so a response that arrives
//! before `await_response` is sent is still captured.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{Expectation, NetworkResponse, Page, ResponseWaiter, Timeouts};
use crate::path::PathSeparator;

/// Environment variable selecting the browser engine
pub const BROWSER_ENV: &str = "UI_TEST_BROWSER";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    /// Browser named by `UI_TEST_BROWSER`, chromium when unset or unknown
    pub fn from_env() -> Self {
        match std::env::var(BROWSER_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!("Unknown {}={}, falling back to chromium", BROWSER_ENV, value);
                Browser::Chromium
            }),
            Err(_) => Browser::Chromium,
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Playwright(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory whose `node_modules` provides `@playwright/test`
    pub node_project_dir: PathBuf,

    pub default_timeout: Duration,
    pub extended_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            browser: Browser::from_env(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_project_dir: PathBuf::from("web/client"),
            default_timeout: timeouts.default,
            extended_timeout: timeouts.extended,
        }
    }
}

/// A request sent to the bridge script
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Goto { route: &'a str },
    WaitForUrl { route: &'a str, timeout_ms: u64 },
    ExpectResponse { waiter: u64, url: &'a str, timeout_ms: u64 },
    AwaitResponse { waiter: u64 },
    Click { locator: &'a Locator, timeout_ms: u64 },
    Fill { locator: &'a Locator, text: &'a str, timeout_ms: u64 },
    Press { locator: &'a Locator, key: &'a str, timeout_ms: u64 },
    InnerText { locator: &'a Locator, timeout_ms: u64 },
    Expect { locator: &'a Locator, expectation: Expectation, timeout_ms: u64 },
    Close,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: Request<'a>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
    bridge: Mutex<BridgeProcess>,
    next_id: AtomicU64,
    next_waiter: AtomicU64,

    // Holds the generated script for the lifetime of the bridge
    _script_dir: tempfile::TempDir,
}

impl PlaywrightHandle {
    /// Launch the bridge and wait for the browser page to open
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, build_script(&config))?;

        let node_modules = config.node_project_dir.join("node_modules");
        info!(
            "Launching {} via Playwright bridge (base url {})",
            config.browser.as_str(),
            config.base_url
        );

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .env("NODE_PATH", &node_modules)
            .current_dir(&config.node_project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;

        let mut bridge = BridgeProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = read_reply(&mut bridge.stdout).await?;
        if !ready.ok {
            return Err(E2eError::Playwright(
                ready.error.unwrap_or_else(|| "browser failed to launch".to_string()),
            ));
        }

        Ok(Self {
            config,
            bridge: Mutex::new(bridge),
            next_id: AtomicU64::new(1),
            next_waiter: AtomicU64::new(1),
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    pub fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.node_project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn call(&self, request: Request<'_>, describe: impl FnOnce() -> String) -> E2eResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut line = serde_json::to_string(&Envelope { id, request })?;
        line.push('\n');

        let mut bridge = self.bridge.lock().await;
        debug!("bridge <- {}", line.trim_end());
        bridge.stdin.write_all(line.as_bytes()).await?;
        bridge.stdin.flush().await?;

        let reply = read_reply(&mut bridge.stdout).await?;
        if reply.id != id {
            return Err(E2eError::Bridge(format!(
                "reply id {} does not match request id {}",
                reply.id, id
            )));
        }

        if reply.ok {
            return Ok(reply.result);
        }

        let error = reply.error.unwrap_or_default();
        if reply.timeout {
            debug!("bridge timeout: {}", error);
            Err(E2eError::Timeout(describe()))
        } else {
            Err(E2eError::Playwright(format!("{}: {}", describe(), error)))
        }
    }

    fn ms(duration: Duration) -> u64 {
        duration.as_millis() as u64
    }

    /// Close the browser and wait for the bridge to exit
    pub async fn close(&self) -> E2eResult<()> {
        self.call(Request::Close, || "close".to_string()).await?;
        let mut bridge = self.bridge.lock().await;
        let status = bridge.child.wait().await?;
        if !status.success() {
            warn!("Playwright bridge exited with {}", status);
        }
        Ok(())
    }
}

async fn read_reply(stdout: &mut Lines<BufReader<ChildStdout>>) -> E2eResult<Reply> {
    loop {
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge exited unexpectedly".to_string()))?;

        // Anything the page logs to the console is forwarded, not parsed
        if !line.starts_with('{') {
            debug!("bridge: {}", line);
            continue;
        }

        debug!("bridge -> {}", line);
        return Ok(serde_json::from_str(&line)?);
    }
}

#[async_trait]
impl Page for PlaywrightHandle {
    async fn goto(&self, route: &str) -> E2eResult<()> {
        self.call(Request::Goto { route }, || format!("goto {}", route)).await?;
        Ok(())
    }

    async fn wait_for_url(&self, route: &str) -> E2eResult<()> {
        let timeout_ms = Self::ms(self.config.default_timeout);
        self.call(Request::WaitForUrl { route, timeout_ms }, || format!("url {}", route))
            .await?;
        Ok(())
    }

    async fn expect_response(&self, url: &str) -> E2eResult<ResponseWaiter> {
        let waiter = self.next_waiter.fetch_add(1, Ordering::SeqCst);
        let timeout_ms = Self::ms(self.config.extended_timeout);
        self.call(Request::ExpectResponse { waiter, url, timeout_ms }, || {
            format!("register response wait for {}", url)
        })
        .await?;
        Ok(ResponseWaiter { id: waiter, url: url.to_string() })
    }

    async fn await_response(&self, waiter: ResponseWaiter) -> E2eResult<NetworkResponse> {
        let url = waiter.url.clone();
        let result = self
            .call(Request::AwaitResponse { waiter: waiter.id }, || format!("response {}", url))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let timeout_ms = Self::ms(self.config.default_timeout);
        self.call(Request::Click { locator, timeout_ms }, || format!("click {}", locator))
            .await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let timeout_ms = Self::ms(self.config.default_timeout);
        self.call(Request::Fill { locator, text, timeout_ms }, || format!("fill {}", locator))
            .await?;
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()> {
        let timeout_ms = Self::ms(self.config.default_timeout);
        self.call(Request::Press { locator, key, timeout_ms }, || {
            format!("press {} on {}", key, locator)
        })
        .await?;
        Ok(())
    }

    async fn inner_text(&self, locator: &Locator) -> E2eResult<String> {
        let timeout_ms = Self::ms(self.config.default_timeout);
        let result = self
            .call(Request::InnerText { locator, timeout_ms }, || format!("text of {}", locator))
            .await?;
        match result {
            serde_json::Value::String(text) => Ok(text),
            other => Err(E2eError::Bridge(format!("inner text was not a string: {}", other))),
        }
    }

    async fn expect(
        &self,
        locator: &Locator,
        expectation: Expectation,
        timeout: Duration,
    ) -> E2eResult<()> {
        let timeout_ms = Self::ms(timeout);
        self.call(Request::Expect { locator, expectation, timeout_ms }, || {
            format!("{} to be {} within {} ms", locator, expectation, timeout_ms)
        })
        .await?;
        Ok(())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            default: self.config.default_timeout,
            extended: self.config.extended_timeout,
        }
    }

    fn separator(&self) -> PathSeparator {
        PathSeparator::for_browser(self.config.browser)
    }
}

/// Build the bridge script for a configuration
pub fn build_script(config: &PlaywrightConfig) -> String {
    let mut script = String::new();

    script.push_str(&format!(
        r#"
const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');
const readline = require('readline');

const respond = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const isTimeout = (e) => e && (e.name === 'TimeoutError' || /Timeout \d+ms exceeded|timed out/i.test(e.message));

(async () => {{
  let browser;
  try {{
    browser = await {browser}.launch({{ headless: {headless} }});
  }} catch (error) {{
    respond({{ id: 0, ok: false, error: error.message }});
    process.exit(1);
  }}
  const context = await browser.newContext({{
    baseURL: '{base_url}',
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  page.on('console', (msg) => console.error('[page] ' + msg.text()));
  const waiters = new Map();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        base_url = config.base_url,
        width = config.viewport_width,
        height = config.viewport_height,
    ));

    script.push_str(
        r#"
  const locate = (chain) => {
    let loc = page;
    for (const s of chain) {
      switch (s.kind) {
        case 'test_id': loc = loc.getByTestId(s.id); break;
        case 'title': loc = loc.getByTitle(s.text, { exact: s.exact }); break;
        case 'role': loc = s.name == null ? loc.getByRole(s.role) : loc.getByRole(s.role, { name: s.name }); break;
        case 'text': loc = loc.getByText(s.text, { exact: s.exact }); break;
        default: throw new Error('unknown selector kind: ' + s.kind);
      }
    }
    return loc;
  };

  const handle = async (req) => {
    switch (req.op) {
      case 'goto':
        await page.goto(req.route);
        return null;
      case 'wait_for_url':
        await page.waitForURL(req.route, { timeout: req.timeout_ms });
        return null;
      case 'expect_response': {
        const pending = page.waitForResponse(req.url, { timeout: req.timeout_ms });
        pending.catch(() => {});
        waiters.set(req.waiter, pending);
        return null;
      }
      case 'await_response': {
        const pending = waiters.get(req.waiter);
        if (pending === undefined) throw new Error('unknown waiter: ' + req.waiter);
        waiters.delete(req.waiter);
        const resp = await pending;
        const streaming = (resp.headers()['content-type'] || '').includes('text/event-stream');
        const text = streaming ? '' : await resp.text().catch(() => '');
        let body = null;
        if (text.length > 0) {
          try { body = JSON.parse(text); } catch (_) { body = text; }
        }
        return { url: new URL(resp.url()).pathname, status: resp.status(), body };
      }
      case 'click':
        await locate(req.locator.chain).click({ timeout: req.timeout_ms });
        return null;
      case 'fill':
        await locate(req.locator.chain).fill(req.text, { timeout: req.timeout_ms });
        return null;
      case 'press':
        await locate(req.locator.chain).press(req.key, { timeout: req.timeout_ms });
        return null;
      case 'inner_text':
        return await locate(req.locator.chain).innerText({ timeout: req.timeout_ms });
      case 'expect': {
        const loc = expect(locate(req.locator.chain));
        const opts = { timeout: req.timeout_ms };
        switch (req.expectation) {
          case 'visible': await loc.toBeVisible(opts); break;
          case 'hidden': await loc.toBeHidden(opts); break;
          case 'enabled': await loc.toBeEnabled(opts); break;
          case 'disabled': await loc.toBeDisabled(opts); break;
          default: throw new Error('unknown expectation: ' + req.expectation);
        }
        return null;
      }
      case 'close':
        await browser.close();
        return null;
      default:
        throw new Error('unknown op: ' + req.op);
    }
  };

  respond({ id: 0, ok: true, result: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (line.trim().length === 0) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (error) {
      respond({ id: 0, ok: false, error: 'malformed request: ' + error.message });
      continue;
    }
    try {
      const result = await handle(req);
      respond({ id: req.id, ok: true, result });
    } catch (error) {
      respond({ id: req.id, ok: false, error: error.message, timeout: isTimeout(error) });
    }
    if (req.op === 'close') break;
  }
  process.exit(0);
})();
"#,
    );

    script
}

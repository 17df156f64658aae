//! Playwright browser automation over a Node.js bridge process

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::intercept::{CapturedExchange, InterceptId, RequestMatcher};
use crate::page::{Locator, Page, PageFactory};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Extra time granted to the bridge on top of a command's own timeout
const BRIDGE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
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
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// How long a single action may wait for its element
    pub action_timeout: Duration,

    /// How long a page load may take
    pub navigation_timeout: Duration,

    /// Node executable
    pub node_binary: PathBuf,

    /// Directory whose `node_modules` provides `playwright`
    pub project_dir: PathBuf,

    /// Time allowed for the browser to launch
    pub launch_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout: Duration::from_secs(4),
            navigation_timeout: Duration::from_secs(60),
            node_binary: PathBuf::from("node"),
            project_dir: PathBuf::from("."),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

/// Bridge launch parameters, handed to the script through the environment
#[derive(Debug, Serialize)]
struct BridgeConfig<'a> {
    browser: &'a str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    action_timeout_ms: u64,
    navigation_timeout_ms: u64,
}

impl<'a> BridgeConfig<'a> {
    fn from_config(config: &'a PlaywrightConfig) -> Self {
        Self {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            action_timeout_ms: config.action_timeout.as_millis() as u64,
            navigation_timeout_ms: config.navigation_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Launches one bridge process per page
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
    script_path: PathBuf,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightLauncher {
    /// Verify Playwright is available and stage the bridge script
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.project_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;
        debug!("Bridge script staged at {}", script_path.display());

        Ok(Self {
            config,
            script_path,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl PageFactory for PlaywrightLauncher {
    type Page = PlaywrightHandle;

    async fn new_page(&self) -> E2eResult<PlaywrightHandle> {
        PlaywrightHandle::launch(&self.config, &self.script_path).await
    }
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// A browser page living in its own bridge process
pub struct PlaywrightHandle {
    io: Mutex<BridgeIo>,
    child: Mutex<Child>,
    next_id: AtomicU64,
    next_intercept: AtomicU64,
    matchers: StdMutex<HashMap<InterceptId, RequestMatcher>>,
    action_timeout: Duration,
    navigation_timeout: Duration,
}

impl PlaywrightHandle {
    /// Spawn the bridge and wait for the browser to be ready
    pub async fn launch(config: &PlaywrightConfig, script_path: &Path) -> E2eResult<Self> {
        let bridge_config = serde_json::to_string(&BridgeConfig::from_config(config))?;

        info!("Launching {} via Playwright bridge", config.browser.as_str());

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(script_path)
            .current_dir(&config.project_dir)
            .env("REGISTRATION_E2E_BRIDGE_CONFIG", bridge_config)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Bridge(format!(
                    "failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[bridge] {}", line);
                }
            });
        }

        let mut io = BridgeIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = timeout(config.launch_timeout, read_reply(&mut io.stdout))
            .await
            .map_err(|_| E2eError::Bridge("browser did not start in time".to_string()))??;
        if !ready.ready {
            return Err(E2eError::Bridge(format!(
                "browser launch failed: {}",
                ready.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
            next_intercept: AtomicU64::new(1),
            matchers: StdMutex::new(HashMap::new()),
            action_timeout: config.action_timeout,
            navigation_timeout: config.navigation_timeout,
        })
    }

    /// Send a command and wait for its reply
    async fn request(&self, cmd: &str, mut args: Value, deadline: Duration) -> E2eResult<BridgeReply> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        args["id"] = json!(id);
        args["cmd"] = json!(cmd);
        let mut line = serde_json::to_string(&args)?;
        line.push('\n');

        debug!("bridge <- {}", line.trim_end());

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let wait = async {
            loop {
                let reply = read_reply(&mut io.stdout).await?;
                if reply.id == Some(id) {
                    return Ok::<_, E2eError>(reply);
                }
                debug!("Ignoring bridge reply for {:?}", reply.id);
            }
        };

        timeout(deadline + BRIDGE_GRACE, wait)
            .await
            .map_err(|_| E2eError::Bridge(format!("no reply to '{}' from bridge", cmd)))?
    }

    /// Run an element action, turning Playwright timeouts into element timeouts
    async fn act(&self, cmd: &str, locator: &Locator, mut args: Value) -> E2eResult<Value> {
        args["locator"] = serde_json::to_value(locator)?;
        let reply = self.request(cmd, args, self.action_timeout).await?;
        if reply.ok {
            return Ok(reply.value);
        }

        let message = reply.error.unwrap_or_default();
        match reply.kind.as_deref() {
            Some("TimeoutError") => Err(E2eError::ElementTimeout {
                what: format!("{} {}", cmd, locator),
                timeout_ms: self.action_timeout.as_millis() as u64,
            }),
            _ => Err(E2eError::Bridge(format!("{} {}: {}", cmd, locator, message))),
        }
    }

    fn matcher(&self, id: InterceptId) -> String {
        self.matchers
            .lock()
            .ok()
            .and_then(|m| m.get(&id).map(|m| m.to_string()))
            .unwrap_or_else(|| format!("intercept #{}", id.0))
    }
}

async fn read_reply(stdout: &mut Lines<BufReader<ChildStdout>>) -> E2eResult<BridgeReply> {
    loop {
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge exited".to_string()))?;
        debug!("bridge -> {}", line);
        match serde_json::from_str::<BridgeReply>(&line) {
            Ok(reply) => return Ok(reply),
            // Anything the page logs to stdout is not part of the protocol.
            Err(_) => debug!("Skipping non-protocol output: {}", line),
        }
    }
}

fn expect_ok(cmd: &str, reply: BridgeReply) -> E2eResult<Value> {
    if reply.ok {
        Ok(reply.value)
    } else {
        Err(E2eError::Bridge(format!(
            "{}: {}",
            cmd,
            reply.error.unwrap_or_default()
        )))
    }
}

#[async_trait]
impl Page for PlaywrightHandle {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let reply = self
            .request("goto", json!({ "url": url }), self.navigation_timeout)
            .await?;
        if !reply.ok && reply.kind.as_deref() == Some("TimeoutError") {
            return Err(E2eError::ElementTimeout {
                what: format!("navigation to {}", url),
                timeout_ms: self.navigation_timeout.as_millis() as u64,
            });
        }
        expect_ok("goto", reply).map(drop)
    }

    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()> {
        self.act("click", locator, json!({ "force": force })).await.map(drop)
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.act("type", locator, json!({ "text": text })).await.map(drop)
    }

    async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        self.act("clear", locator, json!({})).await.map(drop)
    }

    async fn focus(&self, locator: &Locator) -> E2eResult<()> {
        self.act("focus", locator, json!({})).await.map(drop)
    }

    async fn scroll_to_end(&self, locator: &Locator) -> E2eResult<()> {
        self.act("scroll_to_end", locator, json!({})).await.map(drop)
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self.act("is_visible", locator, json!({})).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn expect_exchange(&self, matcher: &RequestMatcher) -> E2eResult<InterceptId> {
        let id = InterceptId(self.next_intercept.fetch_add(1, Ordering::SeqCst));
        let reply = self
            .request(
                "expect_exchange",
                json!({ "intercept": id.0, "matcher": matcher }),
                self.action_timeout,
            )
            .await?;
        expect_ok("expect_exchange", reply)?;

        if let Ok(mut matchers) = self.matchers.lock() {
            matchers.insert(id, matcher.clone());
        }
        debug!("Intercept #{} registered for {}", id.0, matcher);
        Ok(id)
    }

    async fn await_exchange(
        &self,
        id: InterceptId,
        wait: Duration,
    ) -> E2eResult<CapturedExchange> {
        let timeout_ms = wait.as_millis() as u64;
        let reply = self
            .request(
                "await_exchange",
                json!({ "intercept": id.0, "timeout_ms": timeout_ms }),
                wait,
            )
            .await?;

        if !reply.ok && reply.kind.as_deref() == Some("InterceptTimeout") {
            return Err(E2eError::InterceptTimeout {
                matcher: self.matcher(id),
                timeout_ms,
            });
        }
        let value = expect_ok("await_exchange", reply)?;
        Ok(serde_json::from_value(value)?)
    }

    async fn observed_requests(&self, id: InterceptId) -> E2eResult<usize> {
        let reply = self
            .request("observed_requests", json!({ "intercept": id.0 }), self.action_timeout)
            .await?;
        let value = expect_ok("observed_requests", reply)?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Bridge(format!("unexpected request count {}", value)))
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let reply = self
            .request(
                "screenshot",
                json!({ "path": path.to_string_lossy() }),
                self.action_timeout,
            )
            .await?;
        expect_ok("screenshot", reply).map(drop)
    }

    async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.request("close", json!({}), self.action_timeout).await {
            warn!("Bridge did not acknowledge close: {}", e);
        }

        let mut child = self.child.lock().await;
        if timeout(Duration::from_secs(5), child.wait()).await.is_ok() {
            return Ok(());
        }

        // Try a graceful shutdown before killing
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && timeout(Duration::from_millis(500), child.wait()).await.is_ok()
                {
                    return Ok(());
                }
            }
        }

        child.kill().await?;
        Ok(())
    }
}

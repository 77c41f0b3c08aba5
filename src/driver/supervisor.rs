use std::collections::HashMap;
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use reqwest::Url;

use super::target::{Browser, Platform};
use crate::error::{DriverdockError, Result};

/// An owned driver process plus the endpoint it is bound to.
#[derive(Debug)]
struct DriverProcess {
    child: Child,
    endpoint: Url,
}

impl DriverProcess {
    /// Liveness comes from the process handle itself, not a network ping.
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn shutdown(&mut self) {
        // kill() fails when the process already exited, which is fine.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Starts, stops and tracks driver processes. At most one live process per
/// browser, held in a registry behind one coarse mutex: operations are
/// infrequent enough that serializing them across browsers never hurts.
///
/// A process that dies outside the supervisor's knowledge is only noticed
/// on the next liveness probe or start/stop attempt; nothing is restarted
/// automatically.
pub struct DriverSupervisor {
    driver_dir: PathBuf,
    registry: Mutex<HashMap<Browser, DriverProcess>>,
}

impl DriverSupervisor {
    /// `driver_dir` is the directory holding the driver executables under
    /// their original vendor names; it must exist.
    pub fn new(driver_dir: impl Into<PathBuf>) -> Result<Self> {
        let driver_dir = driver_dir.into();
        if !driver_dir.is_dir() {
            return Err(DriverdockError::Config(format!(
                "driver directory does not exist: {}",
                driver_dir.display()
            )));
        }

        Ok(Self {
            driver_dir,
            registry: Mutex::new(HashMap::new()),
        })
    }

    /// Start the driver for a browser and return the URI it listens on.
    ///
    /// With `kill_existing` false, a start conflict shuts down **every**
    /// supervised process before the error is raised; a failed start must
    /// be treated as having cleared all running drivers. With it true the
    /// conflicting process alone is stopped and replaced.
    ///
    /// `port` of `None` (or 0) picks an OS-assigned ephemeral port.
    pub fn start(
        &self,
        browser: Browser,
        kill_existing: bool,
        port: Option<u16>,
    ) -> Result<Url> {
        if browser == Browser::Edge && Platform::host() != Platform::Windows {
            return Err(DriverdockError::UnsupportedOs {
                browser,
                os: std::env::consts::OS,
            });
        }

        // Filesystem preconditions come before any registry interaction so
        // a missing binary leaves the registry slot empty.
        let binary = self.driver_dir.join(browser.binary_name(Platform::host()));
        if !binary.is_file() {
            return Err(DriverdockError::ExecutableMissing(binary));
        }
        if fs::metadata(&binary)?.permissions().readonly() {
            return Err(DriverdockError::ExecutableReadOnly(binary));
        }

        let mut registry = self.lock_registry();

        if registry.contains_key(&browser) {
            if !kill_existing {
                // Deliberate fail-safe: clear every driver, not just the
                // conflicting one.
                Self::shutdown_locked(&mut registry);
                return Err(DriverdockError::AlreadyRunning(browser));
            }
            if let Some(mut existing) = registry.remove(&browser) {
                existing.shutdown();
            }
        }

        let port = match port {
            Some(port) if port > 0 => port,
            _ => free_port()?,
        };

        let mut command = Command::new(&binary);
        match browser {
            // chromium-family drivers take --port=N, geckodriver --port N
            Browser::Chrome | Browser::Edge => {
                command.arg(format!("--port={}", port));
            }
            Browser::Firefox => {
                command.args(["--port", &port.to_string()]);
            }
        }

        let child = command.stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
        tracing::info!(browser = %browser, port, pid = child.id(), "driver started");

        let endpoint = Url::parse(&format!("http://localhost:{}/", port))
            .expect("driver endpoint URL is always well-formed");
        registry.insert(
            browser,
            DriverProcess {
                child,
                endpoint: endpoint.clone(),
            },
        );

        Ok(endpoint)
    }

    /// Stop a browser's driver. Returns whether anything was running, so
    /// stopping an idle browser is always safe.
    pub fn stop(&self, browser: Browser) -> bool {
        let mut registry = self.lock_registry();
        match registry.remove(&browser) {
            Some(mut process) => {
                process.shutdown();
                tracing::info!(browser = %browser, "driver stopped");
                true
            }
            None => false,
        }
    }

    /// Whether the driver process for a browser is currently alive.
    pub fn is_running(&self, browser: Browser) -> bool {
        let mut registry = self.lock_registry();
        match registry.get_mut(&browser) {
            Some(process) => process.is_alive(),
            None => false,
        }
    }

    /// Endpoint URI of a running driver (requires a prior start).
    pub fn endpoint(&self, browser: Browser) -> Result<Url> {
        let registry = self.lock_registry();
        registry
            .get(&browser)
            .map(|process| process.endpoint.clone())
            .ok_or(DriverdockError::NotRunning(browser))
    }

    /// Shut down every supervised driver process.
    pub fn shutdown_all(&self) {
        let mut registry = self.lock_registry();
        Self::shutdown_locked(&mut registry);
    }

    fn shutdown_locked(registry: &mut HashMap<Browser, DriverProcess>) {
        for (browser, mut process) in registry.drain() {
            tracing::debug!(browser = %browser, "shutting down driver");
            process.shutdown();
        }
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<Browser, DriverProcess>> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DriverSupervisor {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// Ask the OS for a free ephemeral port.
fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

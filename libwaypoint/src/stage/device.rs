//! Capture devices
//!
//! Opening a device is asynchronous and may never finish, so the
//! [`DeviceBroker`] runs it on its own tokio runtime under a timeout and
//! reports back over a crossbeam channel that the capture stage polls on
//! every tick.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DeviceError, Result, WaypointError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrigin {
    Live,
    Fallback,
}

/// A committed still
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub origin: FrameOrigin,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn live(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            origin: FrameOrigin::Live,
            captured_at: Utc::now(),
        }
    }

    /// Static stand-in used when no live stream is available
    pub fn fallback() -> Self {
        Self {
            width: 640,
            height: 480,
            origin: FrameOrigin::Fallback,
            captured_at: Utc::now(),
        }
    }
}

/// An open stream
pub trait FrameSource: Send {
    fn grab(&mut self) -> std::result::Result<Frame, DeviceError>;

    /// Release the stream; further grabs fail
    fn stop(&mut self);
}

#[async_trait]
pub trait CaptureDevice: Send + Sync {
    fn name(&self) -> &str;

    async fn open(&self) -> std::result::Result<Box<dyn FrameSource>, DeviceError>;
}

/// A host without capture hardware
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevice;

#[async_trait]
impl CaptureDevice for NoDevice {
    fn name(&self) -> &str {
        "none"
    }

    async fn open(&self) -> std::result::Result<Box<dyn FrameSource>, DeviceError> {
        Err(DeviceError::Unavailable)
    }
}

/// Behavior of a [`SimulatedDevice`]
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub grant: bool,
    pub deny_reason: String,
    /// Delay before the open answers
    pub delay: Duration,
    /// Never answer
    pub hang: bool,
    pub width: u32,
    pub height: u32,

    /// Number of times open has been called
    pub open_calls: Arc<Mutex<usize>>,
    /// Number of streams that have been stopped
    pub stopped: Arc<Mutex<usize>>,
    /// Number of frames grabbed
    pub grabs: Arc<Mutex<usize>>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            grant: true,
            deny_reason: "permission denied by user".to_string(),
            delay: Duration::from_millis(0),
            hang: false,
            width: 640,
            height: 480,
            open_calls: Arc::new(Mutex::new(0)),
            stopped: Arc::new(Mutex::new(0)),
            grabs: Arc::new(Mutex::new(0)),
        }
    }
}

fn bump(counter: &Arc<Mutex<usize>>) {
    if let Ok(mut count) = counter.lock() {
        *count += 1;
    }
}

fn read(counter: &Arc<Mutex<usize>>) -> usize {
    counter.lock().map(|c| *c).unwrap_or(0)
}

/// Software camera with scriptable answers
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice {
    config: SimulatedConfig,
}

impl SimulatedDevice {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }

    pub fn granting() -> Self {
        Self::default()
    }

    pub fn denying(reason: &str) -> Self {
        Self::new(SimulatedConfig {
            grant: false,
            deny_reason: reason.to_string(),
            ..Default::default()
        })
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self::new(SimulatedConfig {
            delay,
            ..Default::default()
        })
    }

    pub fn hanging() -> Self {
        Self::new(SimulatedConfig {
            hang: true,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    pub fn open_calls(&self) -> usize {
        read(&self.config.open_calls)
    }

    pub fn stopped(&self) -> usize {
        read(&self.config.stopped)
    }

    pub fn grabs(&self) -> usize {
        read(&self.config.grabs)
    }
}

struct SimulatedStream {
    width: u32,
    height: u32,
    live: bool,
    stopped: Arc<Mutex<usize>>,
    grabs: Arc<Mutex<usize>>,
}

impl FrameSource for SimulatedStream {
    fn grab(&mut self) -> std::result::Result<Frame, DeviceError> {
        if !self.live {
            return Err(DeviceError::Stream("stream already stopped".to_string()));
        }
        bump(&self.grabs);
        Ok(Frame::live(self.width, self.height))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            bump(&self.stopped);
        }
    }
}

#[async_trait]
impl CaptureDevice for SimulatedDevice {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn open(&self) -> std::result::Result<Box<dyn FrameSource>, DeviceError> {
        bump(&self.config.open_calls);

        if self.config.hang {
            std::future::pending::<()>().await;
        }
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
        if !self.config.grant {
            return Err(DeviceError::PermissionDenied(self.config.deny_reason.clone()));
        }

        Ok(Box::new(SimulatedStream {
            width: self.config.width,
            height: self.config.height,
            live: true,
            stopped: Arc::clone(&self.config.stopped),
            grabs: Arc::clone(&self.config.grabs),
        }))
    }
}

type Opened = std::result::Result<Box<dyn FrameSource>, DeviceError>;

/// A pending device open
pub struct Acquisition {
    id: Uuid,
    rx: Receiver<Opened>,
}

impl Acquisition {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The answer, once there is one
    pub fn poll(&self) -> Option<Opened> {
        match self.rx.try_recv() {
            Ok(opened) => Some(opened),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(DeviceError::Stream(
                "device task ended without answering".to_string(),
            ))),
        }
    }

    /// Block up to `limit` for the answer
    pub fn wait(&self, limit: Duration) -> Option<Opened> {
        self.rx.recv_timeout(limit).ok()
    }
}

impl fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquisition").field("id", &self.id).finish()
    }
}

/// Opens a [`CaptureDevice`] off the host thread
pub struct DeviceBroker {
    device: Arc<dyn CaptureDevice>,
    runtime: tokio::runtime::Runtime,
    timeout: Duration,
}

impl DeviceBroker {
    /// # Errors
    ///
    /// Returns an error if the tokio runtime cannot be created
    pub fn new(device: Arc<dyn CaptureDevice>, timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("waypoint-device")
            .enable_time()
            .build()
            .map_err(|e| WaypointError::Runtime(format!("device runtime: {}", e)))?;

        Ok(Self {
            device,
            runtime,
            timeout,
        })
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start opening the device. If the [`Acquisition`] is dropped before
    /// the answer arrives, a stream that does open is stopped right away.
    pub fn request(&self) -> Acquisition {
        let (tx, rx) = bounded(1);
        let id = Uuid::new_v4();
        let device = Arc::clone(&self.device);
        let limit = self.timeout;

        self.runtime.spawn(async move {
            let opened = match tokio::time::timeout(limit, device.open()).await {
                Ok(opened) => opened,
                Err(_) => {
                    warn!(
                        device = device.name(),
                        timeout_ms = limit.as_millis() as u64,
                        "device open timed out"
                    );
                    Err(DeviceError::TimedOut(limit))
                }
            };

            if let Err(unsent) = tx.send(opened) {
                debug!(%id, "acquisition abandoned");
                if let Ok(mut source) = unsent.into_inner() {
                    source.stop();
                }
            }
        });

        Acquisition { id, rx }
    }
}

impl fmt::Debug for DeviceBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBroker")
            .field("device", &self.device.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

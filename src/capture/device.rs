//! Trait abstraction over the controlled capture device to enable testing.
//!
//! The production implementation drives an Android phone through `adb`.
//! Exact command strings are a tool boundary: the contract is the intent
//! of each step, not the shell text.

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Operations the capture sequencer needs from the controlled device
#[async_trait]
pub trait DeviceAutomation: Send + Sync {
    /// Whether the device display is currently powered on
    async fn display_is_on(&self) -> Result<bool>;

    /// Wake the display
    async fn wake(&self) -> Result<()>;

    /// Whether the lock screen is currently showing
    async fn is_locked(&self) -> Result<bool>;

    /// Dismiss the lock screen with a swipe gesture
    async fn unlock(&self) -> Result<()>;

    /// Clear the device-side photo directory (best effort)
    async fn clear_photo_dir(&self) -> Result<()>;

    /// Launch the camera application
    async fn launch_camera(&self) -> Result<()>;

    /// Trigger the camera shutter
    async fn trigger_shutter(&self) -> Result<()>;

    /// Pull captured photos from the device into `dest`
    async fn pull_photos(&self, dest: &Path) -> Result<()>;

    /// Power the display back off
    async fn screen_off(&self) -> Result<()>;
}

/// `adb`-backed device automation
pub struct AdbAutomation {
    adb_path: String,
    device_photo_dir: String,
}

impl AdbAutomation {
    /// Create an automation handle
    ///
    /// # Arguments
    ///
    /// * `adb_path` - Path or name of the adb binary (usually just "adb")
    /// * `device_photo_dir` - On-device camera output directory
    pub fn new(adb_path: impl Into<String>, device_photo_dir: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            device_photo_dir: device_photo_dir.into(),
        }
    }

    /// Run one adb invocation and capture its output
    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("running adb {:?}", args);
        let output = tokio::process::Command::new(&self.adb_path)
            .args(args)
            .output()
            .await
            .map_err(|e| BridgeError::DeviceCommand(format!("adb {:?}: {}", args, e)))?;

        if !output.status.success() {
            return Err(BridgeError::DeviceCommand(format!(
                "adb {:?} exited with {}: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }

    async fn shell_stdout(&self, command: &str) -> Result<String> {
        let output = self.run(&["shell", command]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl DeviceAutomation for AdbAutomation {
    async fn display_is_on(&self) -> Result<bool> {
        let stdout = self
            .shell_stdout("dumpsys power | grep 'Display Power'")
            .await?;
        Ok(stdout.contains("state=ON"))
    }

    async fn wake(&self) -> Result<()> {
        self.run(&["shell", "input", "keyevent", "KEYCODE_WAKEUP"])
            .await?;
        Ok(())
    }

    async fn is_locked(&self) -> Result<bool> {
        let stdout = self
            .shell_stdout("dumpsys window | grep mDreamingLockscreen")
            .await?;
        Ok(stdout.contains("mDreamingLockscreen=true"))
    }

    async fn unlock(&self) -> Result<()> {
        // Bottom-to-top swipe in the middle of the screen
        self.run(&["shell", "input", "swipe", "540", "1800", "540", "400"])
            .await?;
        Ok(())
    }

    async fn clear_photo_dir(&self) -> Result<()> {
        let command = format!("rm -f {}/*", self.device_photo_dir);
        self.run(&["shell", &command]).await?;
        Ok(())
    }

    async fn launch_camera(&self) -> Result<()> {
        self.run(&[
            "shell",
            "am",
            "start",
            "-a",
            "android.media.action.STILL_IMAGE_CAMERA",
        ])
        .await?;
        Ok(())
    }

    async fn trigger_shutter(&self) -> Result<()> {
        self.run(&["shell", "input", "keyevent", "KEYCODE_CAMERA"])
            .await?;
        Ok(())
    }

    async fn pull_photos(&self, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.run(&["pull", &self.device_photo_dir, &dest]).await?;
        Ok(())
    }

    async fn screen_off(&self) -> Result<()> {
        self.run(&["shell", "input", "keyevent", "KEYCODE_SLEEP"])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Scriptable device mock that records the call order
    #[derive(Clone, Default)]
    pub struct MockDevice {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub display_on: Arc<Mutex<bool>>,
        pub locked: Arc<Mutex<bool>>,
        /// Step names that should fail when invoked
        pub failing_steps: Arc<Mutex<Vec<String>>>,
        pub pulled_to: Arc<Mutex<Option<PathBuf>>>,
    }

    impl MockDevice {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn call_log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fail_on(&self, step: &str) {
            self.failing_steps.lock().unwrap().push(step.to_string());
        }

        fn record(&self, step: &str) -> Result<()> {
            self.calls.lock().unwrap().push(step.to_string());
            if self.failing_steps.lock().unwrap().iter().any(|s| s == step) {
                return Err(BridgeError::DeviceCommand(format!("mock {} failure", step)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DeviceAutomation for MockDevice {
        async fn display_is_on(&self) -> Result<bool> {
            self.record("display_is_on")?;
            Ok(*self.display_on.lock().unwrap())
        }

        async fn wake(&self) -> Result<()> {
            self.record("wake")
        }

        async fn is_locked(&self) -> Result<bool> {
            self.record("is_locked")?;
            Ok(*self.locked.lock().unwrap())
        }

        async fn unlock(&self) -> Result<()> {
            self.record("unlock")
        }

        async fn clear_photo_dir(&self) -> Result<()> {
            self.record("clear_photo_dir")
        }

        async fn launch_camera(&self) -> Result<()> {
            self.record("launch_camera")
        }

        async fn trigger_shutter(&self) -> Result<()> {
            self.record("trigger_shutter")
        }

        async fn pull_photos(&self, dest: &Path) -> Result<()> {
            *self.pulled_to.lock().unwrap() = Some(dest.to_path_buf());
            self.record("pull_photos")
        }

        async fn screen_off(&self) -> Result<()> {
            self.record("screen_off")
        }
    }
}

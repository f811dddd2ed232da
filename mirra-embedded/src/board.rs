use mirra_api::{SleepPlan, WakeSource};

use crate::clock::{Clock, PowerControl};
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::radio::{Radio, RadioTransport};
use crate::state::RetainedMemory;
use crate::storage::{FileSystem, OpenMode};

/// Concrete peripheral types of one board.
pub trait Platform {
    type Radio: Radio;
    type Clock: Clock;
    type Power: PowerControl;
    type FileSystem: FileSystem;
    type Retained: RetainedMemory;
}

/// The peripherals a node or gateway drives.
pub struct Board<P: Platform> {
    pub transport: RadioTransport<P::Radio>,
    pub clock: P::Clock,
    pub power: P::Power,
    pub fs: P::FileSystem,
    pub retained: P::Retained,
}

impl<P: Platform> Board<P> {
    pub fn new(
        radio: P::Radio,
        clock: P::Clock,
        power: P::Power,
        fs: P::FileSystem,
        retained: P::Retained,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            transport: RadioTransport::new(radio, transport),
            clock,
            power,
            fs,
            retained,
        }
    }

    pub fn now(&self) -> u32 {
        self.clock.read_epoch()
    }

    /// Light sleeps until `epoch`, returns at once if it already passed.
    pub async fn light_sleep_until(&mut self, epoch: u32) {
        let seconds = epoch.saturating_sub(self.now());
        if seconds > 0 {
            log::debug!("Light sleep for {}s", seconds);
            self.power.light_sleep(seconds).await;
        }
    }

    /// Arms the wake source of `plan` and enters deep sleep.
    pub async fn deep_sleep(&mut self, plan: &SleepPlan) {
        if plan.source == WakeSource::RtcAlarm {
            let alarm = self.now().saturating_add(plan.duration);
            self.clock.write_alarm(alarm);
            self.clock.enable_alarm();
        }

        self.transport.sleep();
        log::info!("Deep sleep for {}s ({:?})", plan.duration, plan.source);

        let wake_pin = self.clock.interrupt_pin();
        self.power.deep_sleep(plan.source, plan.duration, wake_pin).await;
    }

    /// Opens every file in `paths`, creating missing ones.
    ///
    /// If storage cannot be opened the filesystem is formatted and the device
    /// restarted.
    pub fn ensure_files(&mut self, paths: &[&str]) -> Result<()> {
        for path in paths {
            if let Err(e) = self.fs.open(path, OpenMode::Append) {
                log::error!("Failed to open {}: {}. Formatting storage and restarting", path, e);
                if let Err(e) = self.fs.format() {
                    log::error!("Format failed: {}", e);
                }
                self.power.restart();
                return Err(Error::StorageFault);
            }
        }
        Ok(())
    }
}

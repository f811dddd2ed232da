use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embassy_time::{Instant, Timer};
use mirra_api::WakeSource;

use crate::clock::{Clock, PowerControl};

/// Epoch clock shared by every simulated device.
///
/// Runs at wall speed while anyone is awake. Once every attached device is
/// sleeping, time jumps to the earliest wake-up. A manual clock only moves
/// when advanced, and sleeps complete at once.
pub struct VirtualTime {
    base: u32,
    origin: Instant,
    wall_clock: bool,
    skipped: Cell<u32>,
    devices: Cell<usize>,
    sleepers: RefCell<Vec<u32>>,
}

impl VirtualTime {
    pub fn new(base: u32) -> Rc<Self> {
        Self::build(base, true)
    }

    pub fn manual(base: u32) -> Rc<Self> {
        Self::build(base, false)
    }

    fn build(base: u32, wall_clock: bool) -> Rc<Self> {
        Rc::new(Self {
            base,
            origin: Instant::now(),
            wall_clock,
            skipped: Cell::new(0),
            devices: Cell::new(0),
            sleepers: RefCell::new(Vec::new()),
        })
    }

    pub fn now(&self) -> u32 {
        let elapsed = if self.wall_clock {
            Instant::now().duration_since(self.origin).as_secs() as u32
        } else {
            0
        };
        self.base
            .saturating_add(elapsed)
            .saturating_add(self.skipped.get())
    }

    pub fn advance(&self, seconds: u32) {
        self.skipped.set(self.skipped.get().saturating_add(seconds));
    }

    fn attach(&self) {
        self.devices.set(self.devices.get() + 1);
    }

    fn detach(&self) {
        self.devices.set(self.devices.get().saturating_sub(1));
    }

    pub async fn sleep_until(&self, target: u32) {
        if !self.wall_clock {
            self.advance(target.saturating_sub(self.now()));
            return;
        }

        self.sleepers.borrow_mut().push(target);

        while self.now() < target {
            let earliest = {
                let sleepers = self.sleepers.borrow();
                if sleepers.len() >= self.devices.get() {
                    sleepers.iter().copied().min()
                } else {
                    None
                }
            };

            let now = self.now();
            match earliest {
                Some(earliest) if earliest > now => self.advance(earliest - now),
                _ => Timer::after_millis(10).await,
            }
        }

        let mut sleepers = self.sleepers.borrow_mut();
        if let Some(position) = sleepers.iter().position(|&t| t == target) {
            sleepers.remove(position);
        }
    }
}

pub struct MockClock {
    time: Rc<VirtualTime>,
    offset: i64,
    alarm: Option<u32>,
    alarm_enabled: bool,
}

impl MockClock {
    pub fn new(time: Rc<VirtualTime>) -> Self {
        Self {
            time,
            offset: 0,
            alarm: None,
            alarm_enabled: false,
        }
    }

    /// The armed alarm, if enabled.
    pub fn alarm(&self) -> Option<u32> {
        self.alarm.filter(|_| self.alarm_enabled)
    }
}

impl Clock for MockClock {
    fn read_epoch(&self) -> u32 {
        (self.time.now() as i64 + self.offset).clamp(0, u32::MAX as i64) as u32
    }

    fn write_epoch(&mut self, epoch: u32) {
        self.offset = epoch as i64 - self.time.now() as i64;
    }

    fn write_alarm(&mut self, epoch: u32) {
        self.alarm = Some(epoch);
        self.alarm_enabled = false;
    }

    fn enable_alarm(&mut self) {
        self.alarm_enabled = true;
    }

    fn interrupt_pin(&self) -> u8 {
        4
    }
}

/// Power control over [`VirtualTime`]. Deep sleep returns after the sleep
/// instead of restarting, the caller runs the next wake itself.
pub struct MockPower {
    time: Rc<VirtualTime>,
    deep_sleeps: Vec<(WakeSource, u32)>,
    restarts: u32,
}

impl MockPower {
    pub fn new(time: Rc<VirtualTime>) -> Self {
        time.attach();
        Self {
            time,
            deep_sleeps: Vec::new(),
            restarts: 0,
        }
    }

    pub fn deep_sleeps(&self) -> &[(WakeSource, u32)] {
        &self.deep_sleeps
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl Drop for MockPower {
    fn drop(&mut self) {
        self.time.detach();
    }
}

impl PowerControl for MockPower {
    async fn light_sleep(&mut self, seconds: u32) {
        let target = self.time.now().saturating_add(seconds);
        self.time.sleep_until(target).await;
    }

    async fn deep_sleep(&mut self, source: WakeSource, seconds: u32, _wake_pin: u8) {
        self.deep_sleeps.push((source, seconds));
        let target = self.time.now().saturating_add(seconds);
        self.time.sleep_until(target).await;
    }

    fn restart(&mut self) {
        log::warn!("Restart requested");
        self.restarts += 1;
    }
}

use mirra_api::WakeSource;

/// Battery backed real-time clock holding epoch seconds.
pub trait Clock {
    fn read_epoch(&self) -> u32;

    fn write_epoch(&mut self, epoch: u32);

    fn write_alarm(&mut self, epoch: u32);

    fn enable_alarm(&mut self);

    /// GPIO the alarm output is wired to
    fn interrupt_pin(&self) -> u8;
}

#[allow(async_fn_in_trait)]
pub trait PowerControl {
    /// Sleeps with RAM retained, execution continues afterwards.
    async fn light_sleep(&mut self, seconds: u32);

    /// Powers down until `source` fires.
    ///
    /// On hardware this never returns; the device restarts at its entry point
    /// and only retained memory and the filesystem survive.
    async fn deep_sleep(&mut self, source: WakeSource, seconds: u32, wake_pin: u8);

    fn restart(&mut self);
}

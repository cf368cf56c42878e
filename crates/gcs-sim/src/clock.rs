//! Wall-clock ticker for the idle display and standby drain

use crate::driver::SimulationDriver;

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Formatted wall-clock shown while no mission runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockReading {
    /// e.g. `09:41 PM`
    pub time: String,
    /// e.g. `March 4, 2025`
    pub date: String,
}

impl ClockReading {
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            time: instant.format("%I:%M %p").to_string(),
            date: instant.format("%B %-d, %Y").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(&Local::now())
    }
}

/// Independent 1 Hz ticker. Drains the standby battery only while idle.
pub struct IdleClock {
    reading_tx: watch::Sender<ClockReading>,
    handle: Option<JoinHandle<()>>,
}

impl IdleClock {
    /// Spawn the ticker on the current Tokio runtime
    pub fn spawn(driver: SimulationDriver) -> Self {
        let (reading_tx, _) = watch::channel(ClockReading::now());
        let tx = reading_tx.clone();
        let period = driver.config().clock_period();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                tx.send_replace(ClockReading::now());
                if let Some(battery) = driver.standby_tick() {
                    debug!("Standby drain, battery {:.4}%", battery.percentage);
                }
            }
        });

        Self {
            reading_tx,
            handle: Some(handle),
        }
    }

    pub fn reading(&self) -> ClockReading {
        self.reading_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClockReading> {
        self.reading_tx.subscribe()
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for IdleClock {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::location::NoLocation;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_reading_format() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 4, 21, 41, 7).unwrap();
        let reading = ClockReading::at(&instant);
        assert_eq!(reading.time, "09:41 PM");
        assert_eq!(reading.date, "March 4, 2025");
    }

    #[test]
    fn test_reading_morning() {
        let instant = Utc.with_ymd_and_hms(2024, 12, 25, 0, 5, 0).unwrap();
        assert_eq!(ClockReading::at(&instant).time, "12:05 AM");
    }

    #[tokio::test(start_paused = true)]
    async fn test_standby_drain_while_idle() {
        let driver = SimulationDriver::new(SimConfig::seeded(1), Arc::new(NoLocation)).unwrap();
        let _clock = IdleClock::spawn(driver.clone());

        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let expected = 98.7 - 10.0 * driver.config().power.standby_drain;
        assert!((driver.battery().percentage - expected).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_standby_drain_during_mission() {
        let driver = SimulationDriver::new(SimConfig::seeded(2), Arc::new(NoLocation)).unwrap();
        let clock = IdleClock::spawn(driver.clone());
        driver.start();

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        driver.stop();

        // only mission drain applied: at least the base rate per tick
        let cfg = driver.config();
        let pct = driver.battery().percentage;
        assert!(pct <= 98.7 - 5.0 * cfg.power.mission_drain_base + 1e-9);
        assert!(pct >= 98.7 - 5.0 * cfg.power.max_drain_per_tick() - 1e-9);
        drop(clock);
    }
}

//! In-memory flight history and the dashboard overview cards

use gcs_core::{MissionId, MissionRecord, MissionSummary};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

/// Battery above this reads as healthy on the overview card
const HEALTHY_BATTERY_PERCENT: f64 = 20.0;

/// Append-only record of flown missions
#[derive(Default)]
pub struct MissionHistory {
    records: RwLock<Vec<MissionRecord>>,
}

impl MissionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn an engine summary into a numbered record and keep it
    pub fn record(
        &self,
        summary: MissionSummary,
        location: &str,
        recorded_at: DateTime<Utc>,
    ) -> MissionRecord {
        let mut records = self.records.write();
        let name = format!("Mission #{}", records.len() + 1);
        let record = MissionRecord::from_summary(name, location, summary, recorded_at);

        info!(
            "Recorded {} ({}, {}, {} detections)",
            record.name,
            record.duration,
            record.status,
            record.detections.len()
        );
        records.push(record.clone());
        record
    }

    /// All records, newest first
    pub fn list(&self) -> Vec<MissionRecord> {
        self.records.read().iter().rev().cloned().collect()
    }

    pub fn get(&self, id: &MissionId) -> Option<MissionRecord> {
        self.records.read().iter().find(|r| &r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn total_flight_seconds(&self) -> u64 {
        self.records.read().iter().map(|r| r.elapsed_seconds).sum()
    }
}

/// One card in the overview strip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewStat {
    pub id: &'static str,
    pub label: &'static str,
    pub value: String,
    pub subtext: String,
}

/// Total flights, total flight time and system battery cards
pub fn overview_stats(history: &MissionHistory, battery_percent: f64) -> Vec<OverviewStat> {
    let hours = history.total_flight_seconds() as f64 / 3600.0;

    vec![
        OverviewStat {
            id: "flights",
            label: "Total Flights",
            value: format!("{} Flights", history.len()),
            subtext: "Completed Missions".to_string(),
        },
        OverviewStat {
            id: "flightTime",
            label: "Total Flight Time",
            value: format!("{:.1} Hours", hours),
            subtext: "Accumulated drone flight duration".to_string(),
        },
        OverviewStat {
            id: "battery",
            label: "System Battery",
            value: format!("{:.1}%", battery_percent),
            subtext: if battery_percent > HEALTHY_BATTERY_PERCENT {
                "Healthy"
            } else {
                "Low"
            }
            .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gcs_core::{DetectionEvent, MissionStatus, SiteCategory, FALLBACK_HOME};

    fn summary(secs: u64, battery: f64) -> MissionSummary {
        MissionSummary {
            flight_time: gcs_core::format_flight_time(secs),
            elapsed_seconds: secs,
            home: FALLBACK_HOME,
            flight_path: vec![FALLBACK_HOME; secs as usize],
            bounds: None,
            distance_flown_m: 0.0,
            detections: vec![DetectionEvent::new(SiteCategory::Enclosed, "Flower Pots")],
            final_battery_percent: battery,
        }
    }

    #[test]
    fn test_records_are_numbered_and_listed_newest_first() {
        let history = MissionHistory::new();
        let at = Utc.with_ymd_and_hms(2025, 7, 9, 14, 0, 0).unwrap();

        history.record(summary(30, 90.0), "Sector 7G", at);
        let second = history.record(summary(45, 80.0), "Sector 7G", at);

        assert_eq!(second.name, "Mission #2");
        assert_eq!(second.date, "July 9, 2025");
        assert_eq!(second.duration, "00:45");

        let listed = history.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Mission #2");
        assert_eq!(listed[1].name, "Mission #1");
    }

    #[test]
    fn test_lookup_by_id() {
        let history = MissionHistory::new();
        let record = history.record(summary(10, 95.0), "Sector 7G", Utc::now());

        assert_eq!(history.get(&record.id).unwrap().name, record.name);
        assert!(history.get(&MissionId::new()).is_none());
    }

    #[test]
    fn test_depleted_battery_is_interrupted() {
        let history = MissionHistory::new();
        let record = history.record(summary(10, 0.0), "Sector 7G", Utc::now());
        assert_eq!(record.status, MissionStatus::Interrupted);
    }

    #[test]
    fn test_overview_stats() {
        let history = MissionHistory::new();
        history.record(summary(5_400, 60.0), "Sector 7G", Utc::now());
        history.record(summary(1_800, 40.0), "Sector 7G", Utc::now());

        let stats = overview_stats(&history, 87.26);
        assert_eq!(stats[0].value, "2 Flights");
        assert_eq!(stats[1].value, "2.0 Hours");
        assert_eq!(stats[2].value, "87.3%");
        assert_eq!(stats[2].subtext, "Healthy");

        let low = overview_stats(&history, 20.0);
        assert_eq!(low[2].subtext, "Low");
    }

    #[test]
    fn test_empty_overview() {
        let stats = overview_stats(&MissionHistory::new(), 98.7);
        assert_eq!(stats[0].value, "0 Flights");
        assert_eq!(stats[1].value, "0.0 Hours");
    }
}

//! One-line renderings for terminal output.

use chrono::{DateTime, Utc};

use vitalwatch_application::{SyncPhase, SyncState};
use vitalwatch_domain::{
    AlertLog, Anomaly, DashboardSnapshot, PatientProfile, PatientSnapshot, Reading,
};

const MISSING: &str = "--";

fn clock(at: &DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

fn number(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.decimals$}"))
}

fn stale_suffix<D>(state: &SyncState<D>) -> String {
    match &state.error {
        Some(failure) => format!(" (stale: {})", failure.message),
        None => String::new(),
    }
}

pub fn dashboard_line(state: &SyncState<DashboardSnapshot>) -> String {
    match (state.phase(), &state.data, &state.error) {
        (SyncPhase::Ready, Some(snapshot), _) => {
            let counts = snapshot.derived_counts();
            format!(
                "[{}] patients={} active={} critical={} warning={}{}",
                clock(&snapshot.summary.timestamp),
                snapshot.summary.summary.total_patients,
                counts.active,
                counts.critical,
                counts.warning,
                stale_suffix(state),
            )
        }
        (SyncPhase::Error, _, Some(failure)) => format!("{failure}"),
        _ => "Loading dashboard...".to_string(),
    }
}

pub fn patient_line(state: &SyncState<PatientSnapshot>) -> String {
    match (state.phase(), &state.data, &state.error) {
        (SyncPhase::Ready, Some(snapshot), _) => {
            let latest = snapshot
                .latest_reading()
                .map_or_else(|| "no readings".to_string(), reading_line);
            format!(
                "{} | {} readings | {} active anomalies | {}{}",
                snapshot.profile.name,
                snapshot.history.len(),
                snapshot.active_anomalies().len(),
                latest,
                stale_suffix(state),
            )
        }
        (SyncPhase::Error, _, Some(failure)) => format!("{failure}"),
        _ => "Loading patient...".to_string(),
    }
}

pub fn patient_header(profile: &PatientProfile) -> String {
    let mut line = format!("{} {}", profile.patient_id, profile.name);
    if let Some(age) = profile.age {
        line.push_str(&format!(", {age}"));
    }
    if let Some(gender) = &profile.gender {
        line.push_str(&format!(" {gender}"));
    }
    if !profile.conditions.is_empty() {
        line.push_str(&format!(" [{}]", profile.conditions.join(", ")));
    }
    if !profile.is_active {
        line.push_str(" (inactive)");
    }
    line
}

pub fn reading_line(reading: &Reading) -> String {
    let pressure = reading
        .blood_pressure()
        .map_or_else(|| MISSING.to_string(), |bp| bp.to_string());
    format!(
        "{} HR {} BP {} SpO2 {}% T {}",
        clock(&reading.recorded_at),
        number(reading.heart_rate(), 0),
        pressure,
        number(reading.spo2(), 0),
        number(reading.temperature(), 1),
    )
}

pub fn anomaly_line(anomaly: &Anomaly) -> String {
    let who = anomaly
        .patient_name
        .as_deref()
        .unwrap_or(&anomaly.patient_id);
    let alerts = anomaly
        .alerts
        .iter()
        .map(|alert| alert.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let mut line = format!(
        "[{}] {} {} at {}: {}",
        anomaly.severity.label(),
        anomaly.id,
        who,
        clock(&anomaly.detected_at),
        alerts
    );
    if anomaly.acknowledged {
        match &anomaly.acknowledged_by {
            Some(by) => line.push_str(&format!(" (acknowledged by {by})")),
            None => line.push_str(" (acknowledged)"),
        }
    }
    line
}

pub fn alert_log_line(entry: &AlertLog) -> String {
    format!(
        "{} {} {} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.patient_id,
        entry.severity.as_deref().unwrap_or(MISSING),
        entry.message.as_deref().unwrap_or(MISSING),
    )
}

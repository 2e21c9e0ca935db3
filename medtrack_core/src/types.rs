//! Core domain types for the medication refill tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Dosage units and dose outcomes
//! - Medication records and their dose history
//! - Derived status snapshots
//! - Create/update payloads handed to the store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Dosage Types
// ============================================================================

/// Unit the dosage amount is expressed in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DosageUnit {
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "mcg")]
    Mcg,
    #[serde(rename = "ml")]
    Ml,
    #[serde(rename = "IU")]
    Iu,
    #[serde(rename = "units")]
    Units,
}

impl DosageUnit {
    pub const ALL: [DosageUnit; 6] = [
        DosageUnit::Mg,
        DosageUnit::G,
        DosageUnit::Mcg,
        DosageUnit::Ml,
        DosageUnit::Iu,
        DosageUnit::Units,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DosageUnit::Mg => "mg",
            DosageUnit::G => "g",
            DosageUnit::Mcg => "mcg",
            DosageUnit::Ml => "ml",
            DosageUnit::Iu => "IU",
            DosageUnit::Units => "units",
        }
    }
}

impl fmt::Display for DosageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DosageUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DosageUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = DosageUnit::ALL.iter().map(|u| u.as_str()).collect();
                format!("invalid dosage unit '{}' (expected one of: {})", s, valid.join(", "))
            })
    }
}

// ============================================================================
// Dose Records
// ============================================================================

/// Outcome tag of a dose record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Taken,
    Missed,
    Scheduled,
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DoseStatus::Taken => "taken",
            DoseStatus::Missed => "missed",
            DoseStatus::Scheduled => "scheduled",
        })
    }
}

/// Outcome a caller may record for a dose.
///
/// Only real outcomes can be written through the store; `scheduled`
/// records are produced for display by the schedule generator and never
/// come in as user input.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoseOutcome {
    Taken,
    Missed,
}

impl From<DoseOutcome> for DoseStatus {
    fn from(outcome: DoseOutcome) -> Self {
        match outcome {
            DoseOutcome::Taken => DoseStatus::Taken,
            DoseOutcome::Missed => DoseStatus::Missed,
        }
    }
}

impl FromStr for DoseOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "taken" => Ok(DoseOutcome::Taken),
            "missed" => Ok(DoseOutcome::Missed),
            other => Err(format!(
                "invalid dose status '{}' (expected taken or missed)",
                other
            )),
        }
    }
}

/// One occurrence of a dose: a timestamp string and its outcome.
///
/// The timestamp is a calendar date, optionally followed by a time of day
/// (`2024-03-01` or `2024-03-01T01:00:00`). Records are identified by the
/// exact timestamp string.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseRecord {
    pub date: String,
    pub status: DoseStatus,
}

impl DoseRecord {
    pub fn new(date: impl Into<String>, status: DoseStatus) -> Self {
        Self {
            date: date.into(),
            status,
        }
    }

    /// True if the timestamp starts with the given `YYYY-MM-DD` day string
    pub fn falls_on(&self, day: &str) -> bool {
        self.date.starts_with(day)
    }
}

// ============================================================================
// Medication
// ============================================================================

/// A tracked prescription and its dose history
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage_amount: f64,
    pub dosage_unit: DosageUnit,
    /// Doses per day
    pub frequency: u32,
    pub start_date: NaiveDate,
    pub quantity_received: u32,
    /// Informational only; supply is derived from `quantity_received`
    pub days_supply: u32,
    #[serde(default)]
    pub doses: Vec<DoseRecord>,
}

impl Medication {
    /// Build a medication with an empty dose history from a create payload
    pub fn from_new(id: impl Into<String>, new: NewMedication) -> Self {
        Self {
            id: id.into(),
            name: new.name.trim().to_string(),
            dosage_amount: new.dosage_amount,
            dosage_unit: new.dosage_unit,
            frequency: new.frequency,
            start_date: new.start_date,
            quantity_received: new.quantity_received,
            days_supply: new.days_supply,
            doses: Vec::new(),
        }
    }

    pub fn count_doses(&self, status: DoseStatus) -> usize {
        self.doses.iter().filter(|d| d.status == status).count()
    }

    /// Dosage rendered as amount followed by unit, e.g. `10mg`
    pub fn dosage_label(&self) -> String {
        format!("{}{}", self.dosage_amount, self.dosage_unit)
    }

    /// Apply the fields present in an update, leaving the rest unchanged
    pub fn apply_update(&mut self, update: MedicationUpdate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(amount) = update.dosage_amount {
            self.dosage_amount = amount;
        }
        if let Some(unit) = update.dosage_unit {
            self.dosage_unit = unit;
        }
        if let Some(frequency) = update.frequency {
            self.frequency = frequency;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(quantity) = update.quantity_received {
            self.quantity_received = quantity;
        }
        if let Some(days_supply) = update.days_supply {
            self.days_supply = days_supply;
        }
    }

    /// Record a dose outcome.
    ///
    /// A record with the exact same timestamp has its status replaced;
    /// otherwise a new record is appended.
    pub fn record_dose(&mut self, dose: DoseUpdate) {
        let status = DoseStatus::from(dose.status);
        match self.doses.iter_mut().find(|d| d.date == dose.date) {
            Some(existing) => existing.status = status,
            None => self.doses.push(DoseRecord::new(dose.date, status)),
        }
    }
}

// ============================================================================
// Status Snapshot
// ============================================================================

/// Supply classification of a medication
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SupplyStatus {
    OnTrack,
    RunningLow,
    Overdue,
}

impl SupplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyStatus::OnTrack => "on-track",
            SupplyStatus::RunningLow => "running-low",
            SupplyStatus::Overdue => "overdue",
        }
    }

    /// Human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            SupplyStatus::OnTrack => "On Track",
            SupplyStatus::RunningLow => "Running Low",
            SupplyStatus::Overdue => "Refill Overdue",
        }
    }
}

impl fmt::Display for SupplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived view of a medication, recomputed on every read and never stored
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationStatus<'a> {
    pub medication: &'a Medication,
    pub doses_remaining: u32,
    pub days_remaining: u32,
    pub refill_date: NaiveDate,
    pub status: SupplyStatus,
    pub adherence_percentage: u8,
    pub percent_remaining: u8,
}

// ============================================================================
// Store Payloads
// ============================================================================

/// Fields required to create a medication
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMedication {
    pub name: String,
    pub dosage_amount: f64,
    pub dosage_unit: DosageUnit,
    pub frequency: u32,
    pub start_date: NaiveDate,
    pub quantity_received: u32,
    pub days_supply: u32,
}

/// Partial update; `None` fields are left unchanged
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MedicationUpdate {
    pub name: Option<String>,
    pub dosage_amount: Option<f64>,
    pub dosage_unit: Option<DosageUnit>,
    pub frequency: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub quantity_received: Option<u32>,
    pub days_supply: Option<u32>,
}

impl MedicationUpdate {
    pub fn is_empty(&self) -> bool {
        *self == MedicationUpdate::default()
    }
}

/// A dose outcome to record against a medication
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseUpdate {
    pub date: String,
    pub status: DoseOutcome,
}

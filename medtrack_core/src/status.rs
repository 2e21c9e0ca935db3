//! Status calculation for medications.
//!
//! Derives supply, adherence and refill timing from a medication's dose
//! history. Every function takes the evaluation date explicitly, so results
//! are deterministic for a given record and day:
//! - Taken doses consume supply; missed doses only lower adherence
//! - Days remaining is whole days of supply at the prescribed frequency
//! - The refill date is projected forward from the evaluation date

use crate::{DoseRecord, DoseStatus, Medication, MedicationStatus, SupplyStatus};
use chrono::{Days, Local, NaiveDate};

/// Days of supply at or below which a medication is running low
const RUNNING_LOW_DAYS: u32 = 7;

/// Days remaining that raise a refill alert: due today and one week out
const REFILL_ALERT_DAYS: [u32; 2] = [0, 7];

/// Today's date on the local wall clock
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Compute the status snapshot of a medication as of `today`
pub fn compute_status(medication: &Medication, today: NaiveDate) -> MedicationStatus<'_> {
    let taken = medication.count_doses(DoseStatus::Taken) as u64;
    let missed = medication.count_doses(DoseStatus::Missed) as u64;

    let adherence_percentage = if taken + missed > 0 {
        rounded_percent(taken, taken + missed)
    } else {
        100
    };

    let quantity = u64::from(medication.quantity_received);
    // Bounded by quantity_received, so the narrowing is lossless
    let doses_remaining = quantity.saturating_sub(taken) as u32;

    let days_remaining = if medication.frequency > 0 {
        doses_remaining / medication.frequency
    } else {
        0
    };

    let refill_date = today
        .checked_add_days(Days::new(u64::from(days_remaining)))
        .unwrap_or(NaiveDate::MAX);

    let percent_remaining = if quantity > 0 {
        rounded_percent(u64::from(doses_remaining), quantity)
    } else {
        0
    };

    let status = if days_remaining == 0 {
        SupplyStatus::Overdue
    } else if days_remaining <= RUNNING_LOW_DAYS {
        SupplyStatus::RunningLow
    } else {
        SupplyStatus::OnTrack
    };

    tracing::trace!(
        "Status for {}: {} doses / {} days remaining, {}",
        medication.id,
        doses_remaining,
        days_remaining,
        status
    );

    MedicationStatus {
        medication,
        doses_remaining,
        days_remaining,
        refill_date,
        status,
        adherence_percentage,
        percent_remaining,
    }
}

/// Select medications whose supply runs out exactly today or in exactly a week.
///
/// Medications at any other number of days are left out so each alert fires
/// once per threshold. Results are ordered by days remaining, soonest first.
pub fn select_refill_candidates(
    medications: &[Medication],
    today: NaiveDate,
) -> Vec<MedicationStatus<'_>> {
    let mut candidates: Vec<_> = medications
        .iter()
        .map(|m| compute_status(m, today))
        .filter(|s| REFILL_ALERT_DAYS.contains(&s.days_remaining))
        .collect();
    candidates.sort_by_key(|s| s.days_remaining);
    candidates
}

/// Scheduled doses from the start date through `today` that have no record yet.
///
/// Each day has `frequency` slots. Slot `i` counts as recorded when the
/// medication already holds more than `i` records on that day, matched by
/// date prefix in insertion order. Open slots are emitted as `scheduled`
/// records stamped `<day>T<ii>:00:00`. Nothing is written back, so repeated
/// calls on the same record yield the same sequence.
pub fn generate_scheduled_doses(
    medication: &Medication,
    today: NaiveDate,
) -> impl Iterator<Item = DoseRecord> + '_ {
    medication
        .start_date
        .iter_days()
        .take_while(move |day| *day <= today)
        .flat_map(move |day| {
            let day_str = day.format("%Y-%m-%d").to_string();
            let recorded = medication
                .doses
                .iter()
                .filter(|dose| dose.falls_on(&day_str))
                .count() as u32;
            (recorded..medication.frequency).map(move |slot| {
                DoseRecord::new(
                    format!("{}T{:02}:00:00", day_str, slot),
                    DoseStatus::Scheduled,
                )
            })
        })
}

/// `round(100 * part / whole)` with exact halves rounded up; `whole` must be non-zero
///
/// Integer arithmetic, so a ratio such as 57/200 (28.5%) yields 29.
fn rounded_percent(part: u64, whole: u64) -> u8 {
    let percent = (part * 200 + whole) / (whole * 2);
    percent.min(100) as u8
}

//! Input validation for store payloads.
//!
//! Every rule is checked and all violations are reported together, so the
//! caller can show the full list at once.

use crate::{DoseUpdate, Error, MedicationUpdate, NewMedication, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

impl NewMedication {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        check_name(&self.name, &mut errors);
        check_dosage_amount(self.dosage_amount, &mut errors);
        check_positive("Frequency", self.frequency, &mut errors);
        check_positive("Quantity", self.quantity_received, &mut errors);
        check_positive("Days supply", self.days_supply, &mut errors);

        finish(errors)
    }
}

impl MedicationUpdate {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if let Some(ref name) = self.name {
            check_name(name, &mut errors);
        }
        if let Some(amount) = self.dosage_amount {
            check_dosage_amount(amount, &mut errors);
        }
        if let Some(frequency) = self.frequency {
            check_positive("Frequency", frequency, &mut errors);
        }
        if let Some(quantity) = self.quantity_received {
            check_positive("Quantity", quantity, &mut errors);
        }
        if let Some(days_supply) = self.days_supply {
            check_positive("Days supply", days_supply, &mut errors);
        }

        finish(errors)
    }
}

impl DoseUpdate {
    pub fn validate(&self) -> Result<()> {
        if is_valid_timestamp(&self.date) {
            Ok(())
        } else {
            Err(Error::Validation(vec![format!(
                "Invalid dose date '{}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)",
                self.date
            )]))
        }
    }
}

/// Accepts a bare date, a local date-time, or an RFC 3339 timestamp
pub fn is_valid_timestamp(s: &str) -> bool {
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok();
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("Medication name is required".to_string());
    }
}

fn check_dosage_amount(amount: f64, errors: &mut Vec<String>) {
    if !amount.is_finite() || amount <= 0.0 {
        errors.push("Dosage amount must be greater than 0".to_string());
    }
}

fn check_positive(field: &str, value: u32, errors: &mut Vec<String>) {
    if value == 0 {
        errors.push(format!("{} must be greater than 0", field));
    }
}

fn finish(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DosageUnit, DoseOutcome};

    fn valid_new() -> NewMedication {
        NewMedication {
            name: "Atorvastatin".into(),
            dosage_amount: 20.0,
            dosage_unit: DosageUnit::Mg,
            frequency: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity_received: 90,
            days_supply: 90,
        }
    }

    #[test]
    fn test_valid_new_medication() {
        assert!(valid_new().validate().is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let new = NewMedication {
            name: "   ".into(),
            dosage_amount: -1.0,
            frequency: 0,
            quantity_received: 0,
            days_supply: 0,
            ..valid_new()
        };

        match new.validate() {
            Err(Error::Validation(errors)) => {
                assert_eq!(errors.len(), 5);
                assert!(errors.contains(&"Medication name is required".to_string()));
                assert!(errors.contains(&"Frequency must be greater than 0".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_dosage_rejected() {
        let new = NewMedication {
            dosage_amount: f64::NAN,
            ..valid_new()
        };
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_update_checks_only_present_fields() {
        assert!(MedicationUpdate::default().validate().is_ok());

        let update = MedicationUpdate {
            frequency: Some(0),
            name: Some("Renamed".into()),
            ..Default::default()
        };
        match update.validate() {
            Err(Error::Validation(errors)) => {
                assert_eq!(errors, vec!["Frequency must be greater than 0".to_string()])
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_dose_timestamps() {
        for ok in [
            "2024-03-01",
            "2024-03-01T08:00",
            "2024-03-01T01:00:00",
            "2024-03-01T01:00:00.250",
            "2024-03-01T01:00:00Z",
            "2024-03-01T01:00:00+02:00",
        ] {
            assert!(is_valid_timestamp(ok), "{} should be accepted", ok);
        }

        for bad in ["", "yesterday", "2024-13-01", "2024-02-30", "03/01/2024"] {
            assert!(!is_valid_timestamp(bad), "{} should be rejected", bad);
        }

        let dose = DoseUpdate {
            date: "not-a-date".into(),
            status: DoseOutcome::Taken,
        };
        assert!(matches!(dose.validate(), Err(Error::Validation(_))));
    }
}

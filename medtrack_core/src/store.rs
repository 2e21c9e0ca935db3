//! Medication persistence with file locking.
//!
//! The store is the only stateful part of the system. Callers load a
//! consistent snapshot, hand it to the status calculator, and write changes
//! back through a single read-modify-write cycle.

use crate::{
    DoseUpdate, Error, Medication, MedicationUpdate, NewMedication, Result,
};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// File name of the medication store inside the data directory
pub const STORE_FILE_NAME: &str = "medications.json";

/// Repository of medication records
///
/// Implementors provide whole-collection load and save; the record-level
/// operations are built on top of them.
pub trait MedicationRepository {
    fn load_all(&self) -> Result<Vec<Medication>>;

    fn save_all(&mut self, medications: &[Medication]) -> Result<()>;

    /// Load, modify and save the collection as one unit
    fn modify<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Medication>) -> Result<T>,
    {
        let mut medications = self.load_all()?;
        let out = f(&mut medications)?;
        self.save_all(&medications)?;
        Ok(out)
    }

    /// All medications in insertion order
    fn list(&self) -> Result<Vec<Medication>> {
        self.load_all()
    }

    fn get(&self, id: &str) -> Result<Option<Medication>> {
        Ok(self.load_all()?.into_iter().find(|m| m.id == id))
    }

    /// Validate and store a new medication with a fresh id and no dose history
    fn create(&mut self, new: NewMedication) -> Result<Medication> {
        new.validate()?;

        let medication = Medication::from_new(Uuid::new_v4().to_string(), new);
        let created = medication.clone();
        self.modify(move |medications| {
            medications.push(medication);
            Ok(())
        })?;

        tracing::info!("Created medication {} ({})", created.id, created.name);
        Ok(created)
    }

    fn update(&mut self, id: &str, update: MedicationUpdate) -> Result<Medication> {
        update.validate()?;

        let updated = self.modify(|medications| {
            let medication = find_mut(medications, id)?;
            medication.apply_update(update);
            Ok(medication.clone())
        })?;

        tracing::info!("Updated medication {}", id);
        Ok(updated)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.modify(|medications| {
            let index = medications
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            medications.remove(index);
            Ok(())
        })?;

        tracing::info!("Deleted medication {}", id);
        Ok(())
    }

    /// Record a dose outcome, replacing any record with the same timestamp
    fn record_dose(&mut self, id: &str, dose: DoseUpdate) -> Result<Medication> {
        dose.validate()?;

        let date = dose.date.clone();
        let status = dose.status;
        let updated = self.modify(|medications| {
            let medication = find_mut(medications, id)?;
            medication.record_dose(dose);
            Ok(medication.clone())
        })?;

        tracing::debug!("Recorded {:?} dose at {} for {}", status, date, id);
        Ok(updated)
    }
}

fn find_mut<'a>(medications: &'a mut [Medication], id: &str) -> Result<&'a mut Medication> {
    medications
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

// ============================================================================
// JSON file store
// ============================================================================

/// JSON-array medication store with file locking
///
/// Writers hold an exclusive lock on a sidecar `.lock` file for the whole
/// read-modify-write cycle, so concurrent processes never lose updates.
/// The store file itself is replaced atomically on every save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store using the standard file name inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn open_lock_file(&self) -> Result<File> {
        self.ensure_parent_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Read the store; the caller must hold the lock
    fn read_locked(&self) -> Result<Vec<Medication>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;

        if contents.trim().is_empty() {
            tracing::warn!("Medication store {:?} is empty, treating as no records", self.path);
            return Ok(Vec::new());
        }

        // A corrupt store is never replaced by an empty list: the next save
        // would overwrite every record.
        let medications: Vec<Medication> = serde_json::from_str(&contents).map_err(|e| {
            Error::Store(format!(
                "{} is not a valid medication store: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!("Loaded {} medications from {:?}", medications.len(), self.path);
        Ok(medications)
    }

    /// Atomically replace the store; the caller must hold the lock
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn write_locked(&self, medications: &[Medication]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store("store path missing parent".into()))?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(medications)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} medications to {:?}", medications.len(), self.path);
        Ok(())
    }
}

impl MedicationRepository for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Medication>> {
        if !self.path.exists() {
            tracing::debug!("No medication store at {:?}, starting empty", self.path);
            return Ok(Vec::new());
        }

        let lock = self.open_lock_file()?;
        lock.lock_shared()?;
        let result = self.read_locked();
        lock.unlock()?;
        result
    }

    fn save_all(&mut self, medications: &[Medication]) -> Result<()> {
        let lock = self.open_lock_file()?;
        lock.lock_exclusive()?;
        self.write_locked(medications)?;
        lock.unlock()?;
        Ok(())
    }

    fn modify<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Medication>) -> Result<T>,
    {
        let lock = self.open_lock_file()?;
        lock.lock_exclusive()?;

        // On error the lock is released when the file is dropped
        let mut medications = self.read_locked()?;
        let out = f(&mut medications)?;
        self.write_locked(&medications)?;

        lock.unlock()?;
        Ok(out)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Vec-backed store for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    medications: Vec<Medication>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_medications(medications: Vec<Medication>) -> Self {
        Self { medications }
    }
}

impl MedicationRepository for MemoryStore {
    fn load_all(&self) -> Result<Vec<Medication>> {
        Ok(self.medications.clone())
    }

    fn save_all(&mut self, medications: &[Medication]) -> Result<()> {
        self.medications = medications.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DosageUnit, DoseOutcome, DoseStatus};
    use chrono::NaiveDate;

    fn new_medication(name: &str) -> NewMedication {
        NewMedication {
            name: name.into(),
            dosage_amount: 5.0,
            dosage_unit: DosageUnit::Mg,
            frequency: 2,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            quantity_received: 60,
            days_supply: 30,
        }
    }

    fn taken(date: &str) -> DoseUpdate {
        DoseUpdate {
            date: date.into(),
            status: DoseOutcome::Taken,
        }
    }

    #[test]
    fn test_create_and_reload() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(temp_dir.path());

        let created = store.create(new_medication("Amlodipine")).unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());
        assert!(created.doses.is_empty());

        let reopened = JsonFileStore::in_dir(temp_dir.path());
        let all = reopened.list().unwrap();
        assert_eq!(all, vec![created.clone()]);
        assert_eq!(reopened.get(&created.id).unwrap(), Some(created));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_missing_store_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(&temp_dir.path().join("not-yet"));

        assert!(store.list().unwrap().is_empty());
        // Reads never create files
        assert!(!temp_dir.path().join("not-yet").exists());
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(temp_dir.path());

        for name in ["B", "A", "C"] {
            store.create(new_medication(name)).unwrap();
        }

        let names: Vec<String> = store.list().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_update_and_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(temp_dir.path());
        let created = store.create(new_medication("Sertraline")).unwrap();

        let updated = store
            .update(
                &created.id,
                MedicationUpdate {
                    quantity_received: Some(90),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity_received, 90);
        assert_eq!(updated.name, "Sertraline");

        store.delete(&created.id).unwrap();
        assert!(store.list().unwrap().is_empty());

        assert!(matches!(store.delete(&created.id), Err(Error::NotFound(_))));
        assert!(matches!(
            store.update(&created.id, MedicationUpdate::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_input_is_not_written() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(temp_dir.path());

        let mut bad = new_medication("Bad");
        bad.quantity_received = 0;
        assert!(matches!(store.create(bad), Err(Error::Validation(_))));
        assert!(!store.path().exists());

        let created = store.create(new_medication("Good")).unwrap();
        let result = store.update(
            &created.id,
            MedicationUpdate {
                dosage_amount: Some(0.0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.get(&created.id).unwrap().unwrap().dosage_amount, 5.0);
    }

    #[test]
    fn test_record_dose_upserts_by_timestamp() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(temp_dir.path());
        let created = store.create(new_medication("Levothyroxine")).unwrap();

        store.record_dose(&created.id, taken("2024-03-01T00:00:00")).unwrap();
        store.record_dose(&created.id, taken("2024-03-01T01:00:00")).unwrap();
        let updated = store
            .record_dose(
                &created.id,
                DoseUpdate {
                    date: "2024-03-01T00:00:00".into(),
                    status: DoseOutcome::Missed,
                },
            )
            .unwrap();

        assert_eq!(updated.doses.len(), 2);
        assert_eq!(updated.doses[0].status, DoseStatus::Missed);
        assert_eq!(updated.doses[1].status, DoseStatus::Taken);

        assert!(matches!(
            store.record_dose("missing", taken("2024-03-01")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.record_dose(&created.id, taken("March 1st")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_corrupt_store_is_an_error_and_left_intact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(STORE_FILE_NAME);
        std::fs::write(&path, "[{ invalid json").unwrap();

        let mut store = JsonFileStore::new(&path);
        assert!(matches!(store.list(), Err(Error::Store(_))));
        assert!(matches!(
            store.create(new_medication("Ignored")),
            Err(Error::Store(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{ invalid json");
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(temp_dir.path());
        store.create(new_medication("Omeprazole")).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["medications.json", "medications.json.lock"]);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    let mut store = JsonFileStore::in_dir(&dir);
                    for i in 0..5 {
                        store
                            .create(new_medication(&format!("med-{}-{}", t, i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(JsonFileStore::in_dir(&dir).list().unwrap().len(), 20);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        let created = store.create(new_medication("Warfarin")).unwrap();
        store.record_dose(&created.id, taken("2024-03-02")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].doses.len(), 1);

        let seeded = MemoryStore::with_medications(all);
        assert_eq!(seeded.get(&created.id).unwrap().unwrap().name, "Warfarin");
    }
}

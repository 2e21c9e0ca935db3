use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medtrack_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Prescription medication refill tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate as of this date (YYYY-MM-DD) instead of the system clock
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all medications with their status (default)
    List,

    /// Show one medication with its status and dose history
    Show { id: String },

    /// Add a medication
    Add {
        #[arg(long)]
        name: String,

        /// Dosage amount, e.g. 10
        #[arg(long)]
        dosage: f64,

        /// Dosage unit (mg, g, mcg, ml, IU, units)
        #[arg(long)]
        unit: DosageUnit,

        /// Doses per day
        #[arg(long)]
        frequency: u32,

        /// First day of the prescription (defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Number of doses received
        #[arg(long)]
        quantity: u32,

        /// Expected days the supply should last
        #[arg(long)]
        days_supply: u32,
    },

    /// Update fields of a medication
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dosage: Option<f64>,

        #[arg(long)]
        unit: Option<DosageUnit>,

        #[arg(long)]
        frequency: Option<u32>,

        #[arg(long)]
        start_date: Option<NaiveDate>,

        #[arg(long)]
        quantity: Option<u32>,

        #[arg(long)]
        days_supply: Option<u32>,
    },

    /// Delete a medication
    Delete { id: String },

    /// Record a taken or missed dose
    Dose {
        id: String,

        /// Dose timestamp (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        date: String,

        /// taken or missed
        #[arg(long)]
        status: DoseOutcome,
    },

    /// Show medications due for a refill today or in exactly 7 days
    Refills,

    /// Show scheduled doses without a recorded outcome
    Schedule { id: String },

    /// Export all medications to CSV
    Export {
        /// Directory to write the CSV file to
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    medtrack_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    let mut store = JsonFileStore::new(config.data.store_path());
    tracing::debug!("Using medication store {:?}", store.path());
    let today = cli.today.unwrap_or_else(local_today);
    let json = cli.json;

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => cmd_list(&store, today, json),
        Commands::Show { id } => cmd_show(&store, &id, today, json),
        Commands::Add {
            name,
            dosage,
            unit,
            frequency,
            start_date,
            quantity,
            days_supply,
        } => {
            let new = NewMedication {
                name,
                dosage_amount: dosage,
                dosage_unit: unit,
                frequency,
                start_date: start_date.unwrap_or(today),
                quantity_received: quantity,
                days_supply,
            };
            cmd_add(&mut store, new, json)
        }
        Commands::Update {
            id,
            name,
            dosage,
            unit,
            frequency,
            start_date,
            quantity,
            days_supply,
        } => {
            let update = MedicationUpdate {
                name,
                dosage_amount: dosage,
                dosage_unit: unit,
                frequency,
                start_date,
                quantity_received: quantity,
                days_supply,
            };
            cmd_update(&mut store, &id, update, json)
        }
        Commands::Delete { id } => cmd_delete(&mut store, &id),
        Commands::Dose { id, date, status } => {
            cmd_dose(&mut store, &id, DoseUpdate { date, status }, today, json)
        }
        Commands::Refills => cmd_refills(&store, today, json),
        Commands::Schedule { id } => cmd_schedule(&store, &id, today, json),
        Commands::Export { output_dir } => {
            let dir = output_dir
                .or_else(|| config.export.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            cmd_export(&store, &dir, &config.export.file_prefix, today)
        }
    }
}

fn cmd_list(store: &JsonFileStore, today: NaiveDate, json: bool) -> Result<()> {
    let medications = store.list()?;
    let statuses: Vec<_> = medications
        .iter()
        .map(|m| compute_status(m, today))
        .collect();

    if json {
        return print_json(&statuses);
    }

    if statuses.is_empty() {
        println!("No medications tracked yet.");
        return Ok(());
    }

    for status in &statuses {
        display_status(status);
    }
    Ok(())
}

fn cmd_show(store: &JsonFileStore, id: &str, today: NaiveDate, json: bool) -> Result<()> {
    let medication = find(store, id)?;
    let status = compute_status(&medication, today);

    if json {
        return print_json(&status);
    }

    display_status(&status);
    if medication.doses.is_empty() {
        println!("  No doses recorded.");
    } else {
        println!("  Dose history:");
        for dose in &medication.doses {
            println!("    {:<25} {}", dose.date, dose.status);
        }
    }
    println!();
    Ok(())
}

fn cmd_add(store: &mut JsonFileStore, new: NewMedication, json: bool) -> Result<()> {
    let created = store.create(new)?;

    if json {
        return print_json(&created);
    }

    println!("✓ Added {} ({})", created.name, created.dosage_label());
    println!("  ID: {}", created.id);
    Ok(())
}

fn cmd_update(
    store: &mut JsonFileStore,
    id: &str,
    update: MedicationUpdate,
    json: bool,
) -> Result<()> {
    if update.is_empty() {
        return Err(Error::Validation(vec![
            "Nothing to update: pass at least one field".into(),
        ]));
    }

    let updated = store.update(id, update)?;

    if json {
        return print_json(&updated);
    }

    println!("✓ Updated {}", updated.name);
    Ok(())
}

fn cmd_delete(store: &mut JsonFileStore, id: &str) -> Result<()> {
    store.delete(id)?;
    println!("✓ Deleted medication {}", id);
    Ok(())
}

fn cmd_dose(
    store: &mut JsonFileStore,
    id: &str,
    dose: DoseUpdate,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let date = dose.date.clone();
    let outcome = DoseStatus::from(dose.status);
    let updated = store.record_dose(id, dose)?;
    let status = compute_status(&updated, today);

    if json {
        return print_json(&status);
    }

    println!("✓ Recorded {} dose at {} for {}", outcome, date, updated.name);
    display_status(&status);
    Ok(())
}

fn cmd_refills(store: &JsonFileStore, today: NaiveDate, json: bool) -> Result<()> {
    let medications = store.list()?;
    let candidates = select_refill_candidates(&medications, today);

    if json {
        return print_json(&candidates);
    }

    if candidates.is_empty() {
        println!("No refills due today or in 7 days.");
        return Ok(());
    }

    for status in &candidates {
        if status.days_remaining == 0 {
            println!("⚠ {}: refill due today", status.medication.name);
        } else {
            println!(
                "⚠ {}: refill due in {} days ({})",
                status.medication.name,
                status.days_remaining,
                format_display_date(status.refill_date)
            );
        }
    }
    Ok(())
}

fn cmd_schedule(store: &JsonFileStore, id: &str, today: NaiveDate, json: bool) -> Result<()> {
    let medication = find(store, id)?;
    let scheduled: Vec<DoseRecord> = generate_scheduled_doses(&medication, today).collect();

    if json {
        return print_json(&scheduled);
    }

    if scheduled.is_empty() {
        println!(
            "All doses through {} are recorded.",
            format_display_date(today)
        );
        return Ok(());
    }

    println!("{} open doses for {}:", scheduled.len(), medication.name);
    for dose in &scheduled {
        println!("  {}  {}", dose.date, dose.status);
    }
    Ok(())
}

fn cmd_export(store: &JsonFileStore, dir: &Path, prefix: &str, today: NaiveDate) -> Result<()> {
    let medications = store.list()?;
    let path = export_to_dir(dir, prefix, &medications, today)?;

    println!("✓ Exported {} medications", medications.len());
    println!("  CSV: {}", path.display());
    Ok(())
}

fn find(store: &JsonFileStore, id: &str) -> Result<Medication> {
    store.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn display_status(status: &MedicationStatus<'_>) {
    let medication = status.medication;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {} {}", medication.name, medication.dosage_label());
    println!("╰─────────────────────────────────────────╯");
    println!("  ID: {}", medication.id);
    println!(
        "  {} per day since {}",
        medication.frequency,
        format_display_date(medication.start_date)
    );
    println!();
    println!("  Status: {}", status.status.label());
    println!(
        "  → {} doses remaining ({}%)",
        status.doses_remaining, status.percent_remaining
    );
    println!(
        "  → {} days remaining, refill by {}",
        status.days_remaining,
        format_display_date(status.refill_date)
    );
    println!("  → Adherence: {}%", status.adherence_percentage);
    println!();
}

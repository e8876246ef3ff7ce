use crate::infra::{clock_for, file_store, open_engine, parse_date};
use chrono::{Duration, NaiveDate};
use clap::Args;
use statekeeper::clock::{Clock, FixedClock, SystemClock};
use statekeeper::config::AppConfig;
use statekeeper::error::AppError;
use statekeeper::notify::{MemoryNotifier, TracingNotifier};
use statekeeper::persistence::MemorySnapshotStore;
use statekeeper::workflows::compliance::{
    AuditDraft, AuditEntryType, AuditQuery, ComplianceReport, Frequency, License, LicenseStatus,
    NewComplianceItem, NewStateProfile, Priority, RecurrencePattern,
};
use statekeeper::workflows::{ComplianceEngine, CompletionReport};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ScanArgs {
    /// Evaluate expirations as of this date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV export with License Number, License Type, State, Issuance Date,
    /// Expiration Date and Status columns
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Starting date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_scan(config: &AppConfig, args: ScanArgs) -> Result<(), AppError> {
    let store = file_store(config);
    let mut engine = open_engine(
        config,
        &store,
        clock_for(args.today),
        Arc::new(TracingNotifier),
    )?;

    let outcome = engine.scan_licenses()?;
    engine.flush(&store)?;

    println!("License scan as of {}", engine.today());
    println!(
        "- {} renewal task(s) created | {} already tracked | {} without a state profile | {} expired",
        outcome.created_task_ids.len(),
        outcome.skipped_license_ids.len(),
        outcome.unmatched_license_ids.len(),
        outcome.expired_license_ids.len()
    );
    for task_id in &outcome.created_task_ids {
        if let Some(item) = engine.registry().all_items().find(|item| &item.id == task_id) {
            println!("  - {} (due {})", item.title, item.due_date);
        }
    }
    Ok(())
}

pub(crate) fn run_import(config: &AppConfig, args: ImportArgs) -> Result<(), AppError> {
    let store = file_store(config);
    let mut engine = open_engine(config, &store, clock_for(None), Arc::new(TracingNotifier))?;

    let file = File::open(&args.path)?;
    let summary = engine.import_licenses(file)?;
    engine.flush(&store)?;

    println!(
        "Imported {}: {} added, {} updated ({} on roster)",
        args.path.display(),
        summary.added,
        summary.updated,
        engine.licenses().len()
    );
    Ok(())
}

pub(crate) fn run_report(config: &AppConfig, args: ReportArgs) -> Result<(), AppError> {
    let store = file_store(config);
    let engine = open_engine(config, &store, clock_for(None), Arc::new(TracingNotifier))?;
    let today = args.today.unwrap_or_else(|| engine.today());
    let report = engine.report(today);

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Report unavailable as JSON: {err}"),
        }
    } else {
        render_report(&report);
    }
    Ok(())
}

pub(crate) fn run_demo(config: &AppConfig, args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| SystemClock.today());
    let clock = Arc::new(FixedClock::on(today));
    let notifier = Arc::new(MemoryNotifier::default());
    let mut engine = ComplianceEngine::new(
        &config.engine,
        clock.clone(),
        notifier.clone(),
        config.storage.user_id.clone(),
    );

    println!("Compliance lifecycle demo ({today})");

    let registry = engine.registry_mut();
    let texas = registry.create_state(NewStateProfile::new("Texas", "TX"))?;
    let oklahoma = registry
        .create_state(NewStateProfile::new("Oklahoma", "OK").reciprocal_of(texas.id.clone()))?;
    let california = registry.create_state(NewStateProfile::new("California", "CA"))?;
    println!(
        "- Tracking {}, {} (reciprocal of TX) and {}",
        texas.name, oklahoma.name, california.name
    );

    let mut scheduler = registry.scheduler();
    let ce_hours = scheduler.add_item(
        &texas.id,
        NewComplianceItem::new("Continuing education: 20 hours", today + Duration::days(20))
            .with_priority(Priority::High),
    )?;
    let check_in = scheduler.add_item(
        &texas.id,
        NewComplianceItem::new("Monitoring program check-in", today)
            .recurring(RecurrencePattern::new(Frequency::Monthly, 1).ending_after(3)),
    )?;
    scheduler.add_item(
        &oklahoma.id,
        NewComplianceItem::new("Reciprocity verification", today - Duration::days(5)),
    )?;

    for license in demo_licenses(today) {
        engine.add_license(license)?;
    }
    let scan = engine.scan_licenses()?;
    println!(
        "\nLicense scan: {} renewal task(s), {} unmatched, {} expired",
        scan.created_task_ids.len(),
        scan.unmatched_license_ids.len(),
        scan.expired_license_ids.len()
    );
    for notification in notifier.drain() {
        println!(
            "  [{}] {}: {}",
            notification.severity.label(),
            notification.title,
            notification.description
        );
    }
    let rescan = engine.scan_licenses()?;
    println!(
        "  Second scan created {} task(s)",
        rescan.created_task_ids.len()
    );

    println!("\nCompleting work over three days");
    let first =
        engine.complete_item(&texas.id, &check_in.id, Some("Logged with monitor".into()))?;
    print_completion(&first);
    clock.advance(Duration::days(1));
    if let Some(next) = &first.outcome.next_instance {
        let second = engine.complete_item(&texas.id, &next.id, None)?;
        print_completion(&second);
    }
    clock.advance(Duration::days(1));
    let third =
        engine.complete_item(&texas.id, &ce_hours.id, Some("Certificates uploaded".into()))?;
    print_completion(&third);
    for notification in notifier.drain() {
        println!("  [{}] {}", notification.severity.label(), notification.title);
    }

    let request_date = engine.today();
    engine.registry_mut().record_event(
        &texas.id,
        AuditDraft::new("Board Request", "Board requested CE certificates")
            .with_kind(AuditEntryType::Request)
            .effective_on(request_date),
    )?;

    println!();
    render_report(&engine.report(engine.today()));

    let data = engine.gamification().data();
    println!(
        "\nGamification: {} points | level {} | {} to next level | streak {} | {} achievement(s)",
        data.points,
        data.level,
        data.points_to_next_level(),
        data.weekly_streak,
        data.unlocked_count()
    );

    println!("\nRecent audit entries for Texas:");
    for entry in engine
        .registry()
        .audit_query(&AuditQuery::for_state(texas.id.clone()))
        .iter()
        .take(5)
    {
        println!("  - {} | {} | {}", entry.user, entry.action, entry.description);
    }

    let removed = engine.registry_mut().delete_state(&texas.id)?;
    println!(
        "\nDeleted Texas: {} profile(s) removed, {} remaining, {} archived audit entries",
        removed.len(),
        engine.registry().states().len(),
        engine.registry().archived_audit().len()
    );

    let store = MemorySnapshotStore::default();
    engine.flush(&store)?;
    match serde_json::to_vec(&engine.snapshot()) {
        Ok(bytes) => println!("Snapshot size: {} bytes", bytes.len()),
        Err(err) => println!("Snapshot unavailable: {err}"),
    }

    Ok(())
}

fn demo_licenses(today: NaiveDate) -> Vec<License> {
    let license = |number: &str, license_type: &str, state: &str, days: i64| License {
        id: String::new(),
        license_number: number.to_string(),
        license_type: license_type.to_string(),
        state: state.to_string(),
        issuance_date: today - Duration::days(700),
        expiration_date: today + Duration::days(days),
        status: LicenseStatus::Active,
    };
    vec![
        license("RN-784512", "RN", "TX", 10),
        license("RN-99812", "RN", "CA", 45),
        license("LPN-2231", "LPN", "FL", 7),
    ]
}

fn print_completion(report: &CompletionReport) {
    println!(
        "- Completed \"{}\" (+{} points, total {}, streak {})",
        report.outcome.item.title, report.points_awarded, report.total_points, report.streak
    );
    if let Some(next) = &report.outcome.next_instance {
        println!("  Next occurrence due {}", next.due_date);
    }
    for achievement in &report.unlocked {
        println!(
            "  Achievement unlocked: {} (+{})",
            achievement.title, achievement.points
        );
    }
}

pub(crate) fn render_report(report: &ComplianceReport) {
    println!(
        "Compliance report for {} (renewal window {} days)",
        report.today, report.window_days
    );
    if report.states.is_empty() {
        println!("- No states tracked");
    }
    for state in &report.states {
        println!(
            "- {} ({}) [{}]: {} open | {} overdue | {} due soon | {} completed",
            state.name,
            state.abbreviation,
            state.status_label,
            state.open,
            state.overdue,
            state.due_soon,
            state.completed
        );
        if let Some(next) = &state.next_due {
            println!(
                "  Next due: {} on {} ({})",
                next.title, next.due_date, next.priority_label
            );
        }
    }

    if !report.overdue_items.is_empty() {
        println!("Overdue:");
        for item in &report.overdue_items {
            println!(
                "  - {} due {} ({})",
                item.title, item.due_date, item.priority_label
            );
        }
    }

    if !report.expiring_licenses.is_empty() {
        println!("Expiring licenses:");
        for license in &report.expiring_licenses {
            let when = if license.days_remaining < 0 {
                format!("expired {} days ago", -license.days_remaining)
            } else {
                format!("{} days left", license.days_remaining)
            };
            println!(
                "  - {} {} ({}) on {}: {}",
                license.license_type,
                license.license_number,
                license.state,
                license.expiration_date,
                when
            );
        }
    }
}

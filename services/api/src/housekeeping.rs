use crate::infra::{bootstrap, open_marketplace, Marketplace};
use clap::Args;
use coderr::error::AppError;
use coderr::marketplace::{GuestCleanupReport, RepairReport};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct CleanupArgs {
    /// Delete guests that joined more than this many days ago (defaults to the configured retention)
    #[arg(long)]
    pub(crate) days: Option<i64>,
    /// Only report which accounts would be deleted
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Override the JSON snapshot file backing the marketplace
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RepairArgs {
    /// Override the JSON snapshot file backing the marketplace
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
}

pub(crate) fn run_cleanup(args: CleanupArgs) -> Result<(), AppError> {
    let config = bootstrap(args.data_file)?;
    let service = open_marketplace(&config.marketplace)?;
    let days = args
        .days
        .unwrap_or(config.marketplace.guest_retention_days);
    let report = cleanup(&service, days, args.dry_run)?;
    println!("{}", render_cleanup(&report));
    Ok(())
}

pub(crate) fn run_repair(args: RepairArgs) -> Result<(), AppError> {
    let config = bootstrap(args.data_file)?;
    let service = open_marketplace(&config.marketplace)?;
    let report = service.repair()?;
    println!("{}", render_repair(&report));
    Ok(())
}

fn cleanup(service: &Marketplace, days: i64, dry_run: bool) -> Result<GuestCleanupReport, AppError> {
    Ok(service.cleanup_guests(days, dry_run)?)
}

fn render_cleanup(report: &GuestCleanupReport) -> String {
    let mut lines = vec![format!(
        "Guest accounts joined before {}: {}",
        report.cutoff.format("%Y-%m-%d %H:%M UTC"),
        report.matched
    )];
    if report.matched == 0 {
        lines.push("Nothing to clean up.".to_string());
        return lines.join("\n");
    }

    if !report.sample.is_empty() {
        lines.push(format!("  e.g. {}", report.sample.join(", ")));
    }
    if report.dry_run {
        lines.push("Dry run, nothing was deleted.".to_string());
    } else {
        lines.push(format!("Deleted {} rows:", report.deleted.total()));
        for (table, count) in report.deleted.non_zero() {
            lines.push(format!("  {table:<14} {count}"));
        }
    }
    lines.join("\n")
}

fn render_repair(report: &RepairReport) -> String {
    if report.is_clean() {
        return format!("Checked {} offers, all tiers are consistent.", report.offers_checked);
    }
    format!(
        "Checked {} offers: normalized {} tiers, added {} missing tiers.",
        report.offers_checked, report.details_normalized, report.tiers_added
    )
}

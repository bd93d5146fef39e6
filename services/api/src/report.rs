use crate::infra::{build_service, load_travel_times, ApiService};
use clap::Args;
use shortlist::config::AppConfig;
use shortlist::criteria::format_euros;
use shortlist::{AppError, ListingImporter, PropertyAssessment, PropertyKind};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Listing export (CSV) to import
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Travel-time table (CSV); falls back to the configured table
    #[arg(long)]
    pub(crate) travel_times: Option<PathBuf>,
    /// Only rank one listing type (house or land)
    #[arg(long, value_parser = parse_kind)]
    pub(crate) kind: Option<PropertyKind>,
    /// Show at most this many listings
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

pub(crate) fn parse_kind(raw: &str) -> Result<PropertyKind, String> {
    PropertyKind::parse(raw).ok_or_else(|| format!("unknown listing type '{raw}'"))
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        listings,
        travel_times,
        kind,
        limit,
    } = args;

    let config = AppConfig::load()?;
    let travel = load_travel_times(
        travel_times
            .as_deref()
            .or(config.scoring.travel_times.as_deref()),
    )?;
    let service = build_service(&config, travel)?;
    let report = service.ingest_batch(ListingImporter::from_path(&listings)?)?;
    println!(
        "Imported {} listings from {} ({} duplicates skipped)",
        report.created.len(),
        listings.display(),
        report.duplicates
    );

    print!("{}", render_ranking(&service, kind, limit)?);
    Ok(())
}

/// Unsold listings by aggregate score, highest first, with their strongest
/// aspects and any dealbreakers.
pub(crate) fn render_ranking(
    service: &ApiService,
    kind: Option<PropertyKind>,
    limit: Option<usize>,
) -> Result<String, AppError> {
    let mut ranked: Vec<(PropertyAssessment, String, PropertyKind, u32)> = Vec::new();
    for property in service.properties()? {
        if property.sold || kind.is_some_and(|kind| kind != property.kind()) {
            continue;
        }
        let assessment = service.assessment(property.id)?;
        let property_kind = property.kind();
        ranked.push((assessment, property.address, property_kind, property.price));
    }
    ranked.sort_by(|(left, ..), (right, ..)| {
        right
            .score
            .cmp(&left.score)
            .then(left.property.cmp(&right.property))
    });

    let mut out = String::new();
    let _ = writeln!(out, "\nRanked listings");
    if ranked.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (position, (assessment, address, kind, price)) in ranked
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
    {
        let _ = writeln!(
            out,
            "{:>3}. [{:>3}] {} ({}, {})",
            position + 1,
            assessment.score,
            address,
            kind.label(),
            format_euros(i64::from(*price))
        );
        if let Some(warning) = assessment.dealbreaker_warning() {
            let _ = writeln!(out, "       dealbreaker: {warning}");
            continue;
        }
        for view in assessment.positive.iter().take(3) {
            let _ = writeln!(
                out,
                "       + {}",
                describe(&view.description, view.comment.as_deref())
            );
        }
        for view in assessment.negative.iter().take(3) {
            let _ = writeln!(
                out,
                "       - {}",
                describe(&view.description, view.comment.as_deref())
            );
        }
        if !assessment.potential_problems.is_empty() {
            let names: Vec<&str> = assessment
                .potential_problems
                .iter()
                .map(|view| view.name.as_str())
                .collect();
            let _ = writeln!(out, "       ? unknown: {}", names.join(", "));
        }
    }
    Ok(out)
}

fn describe(description: &str, comment: Option<&str>) -> String {
    match comment {
        Some(comment) => format!("{description} ({comment})"),
        None => description.to_string(),
    }
}

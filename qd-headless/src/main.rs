//! `qd`: command-line front end of the QD engine
//!
//! Results go to stdout (JSON by default), logs to stderr. Set `RUST_LOG=qd_core=debug`
//! to see every calculation step.

mod cli;
mod error;
mod geojson;

use clap::Parser;
use cli::{Cli, Command, OutputFormat};
use error::CliError;
use qd_core::{
    Casing, CasingMaterial, ComplianceReport, EngineConfig, FacilityAnalysis, FragmentResult,
    QdEngine, SafeDistanceResult, UncertaintyResult, WeightUnit,
};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Conversion {
    quantity: f64,
    from: WeightUnit,
    to: WeightUnit,
    result: f64,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    let config = toml::from_str(&text).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn emit_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_safe_distance(result: &SafeDistanceResult) {
    println!(
        "Safe distance: {:.2} ft ({} {}, K = {})",
        result.distance_ft, result.organization, result.k_factor_type, result.k_factor
    );
    println!("Hazard division: {}", result.hazard_division);
    println!("Citation: {}", result.citation);
    if result.used_fallback {
        println!("Note: sub-type not registered, organization default K-factor used");
    }
    println!("Calculation:");
    for (i, step) in result.trace.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    if let Some(risk) = &result.risk {
        println!(
            "Risk-based distance: {:.2} ft (P_f = {:.2e}/yr, {})",
            risk.risk_distance_ft, risk.annual_probability_of_failure, risk.citation
        );
    }
    if let Some(fragment) = &result.fragment {
        print_fragment(fragment);
    }
}

fn print_fragment(fragment: &FragmentResult) {
    println!(
        "Fragment hazard distance: {:.2} ft ({} casing {} in, v0 = {:.2})",
        fragment.hazard_distance_ft,
        fragment.casing_material,
        fragment.casing_thickness_in,
        fragment.initial_velocity
    );
    println!("Fragment citation: {}", fragment.citation);
}

fn print_uncertainty(result: &UncertaintyResult) {
    println!(
        "Mean: {:.2} ft, std dev: {:.2} ft ({} iterations, seed {})",
        result.mean_ft, result.std_dev_ft, result.iterations, result.seed
    );
    println!(
        "{:.0}% interval: [{:.2}, {:.2}] ft",
        result.confidence_level * 100.0,
        result.confidence_interval_ft[0],
        result.confidence_interval_ft[1]
    );
}

fn print_report(report: &ComplianceReport) {
    println!(
        "Facility {} ({}): {:?}",
        report.facility_id, report.facility_name, report.status
    );
    println!(
        "Required separation: {:.2} ft ({})",
        report.safe_distance.distance_ft, report.citation
    );
    for v in &report.violations {
        println!(
            "  VIOLATION {} ({}): {:.2} ft, short by {:.2} ft ({:.1}%)",
            v.feature_id, v.feature_name, v.actual_distance_ft, v.deficiency_ft, v.percent_deficient
        );
    }
    for c in &report.clearances {
        println!(
            "  clear     {} ({}): {:.2} ft",
            c.feature_id, c.feature_name, c.actual_distance_ft
        );
    }
    for i in &report.indeterminate {
        println!("  UNKNOWN   {} ({}): {}", i.feature_id, i.feature_name, i.reason);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Command::MonteCarlo {
        seed: Some(seed), ..
    } = &cli.command
    {
        config.monte_carlo.seed = Some(*seed);
    }
    let engine = QdEngine::new(config)?;
    let text = cli.output == OutputFormat::Text;

    match cli.command {
        Command::Calculate {
            request,
            casing_material,
            casing_thickness,
        } => {
            let mut request = request.to_request();
            if let Some(thickness) = casing_thickness {
                let material = casing_material
                    .as_deref()
                    .map_or(CasingMaterial::Generic, CasingMaterial::from_name);
                request = request.with_casing(Casing::new(material, thickness));
            }
            let result = engine.calculate_safe_distance(&request)?;
            if text {
                print_safe_distance(&result);
            } else {
                emit_json(&result)?;
            }
        }
        Command::Fragments {
            quantity,
            unit,
            material,
            thickness,
        } => {
            let casing = Casing::new(CasingMaterial::from_name(&material), thickness);
            let result = engine.calculate_fragment_distance(quantity, unit, &casing)?;
            if text {
                print_fragment(&result);
            } else {
                emit_json(&result)?;
            }
        }
        Command::Rings {
            request,
            lon,
            lat,
            multiples,
            uncertainty,
            output_file,
        } => {
            let request = request.to_request();
            let rings = if multiples.is_empty() {
                engine.generate_rings(
                    [lon, lat],
                    &request,
                    &qd_core::geometry::DEFAULT_RING_MULTIPLES,
                    uncertainty,
                )?
            } else {
                engine.generate_rings([lon, lat], &request, &multiples, uncertainty)?
            };
            let collection =
                geojson::feature_collection(rings.iter().map(geojson::ring_feature).collect());
            let body = serde_json::to_string_pretty(&collection)?;
            match output_file {
                Some(path) => {
                    std::fs::write(&path, body).map_err(|e| CliError::io(&path, e))?;
                    tracing::info!(path = %path.display(), rings = rings.len(), "rings written");
                }
                None if text => {
                    for ring in &rings {
                        println!("{}: radius {:.2} ft", ring.label, ring.radius_ft);
                    }
                }
                None => println!("{body}"),
            }
        }
        Command::Convert { quantity, from, to } => {
            let result = qd_core::convert(quantity, from, to)?;
            if text {
                println!("{quantity} {from} = {result} {to}");
            } else {
                emit_json(&Conversion {
                    quantity,
                    from,
                    to,
                    result,
                })?;
            }
        }
        Command::MonteCarlo {
            request,
            iterations,
            ..
        } => {
            let result = engine.monte_carlo(&request.to_request(), iterations)?;
            if text {
                print_uncertainty(&result);
            } else {
                emit_json(&result)?;
            }
        }
        Command::Analyze {
            input,
            k_type,
            unit,
        } => {
            let raw = std::fs::read_to_string(&input).map_err(|e| CliError::io(&input, e))?;
            let document: serde_json::Value = serde_json::from_str(&raw)?;
            let (facility, features) = geojson::parse_site(&document)?;
            let analysis = engine.analyze_facility(&facility, &features, k_type, unit)?;
            match (&analysis, text) {
                (FacilityAnalysis::Analyzed(report), true) => print_report(report),
                (FacilityAnalysis::NoWeightSpecified { facility_id }, true) => {
                    println!("Facility {facility_id}: no explosive weight specified");
                }
                (_, false) => emit_json(&analysis)?,
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("qd_core=info,qd_headless=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "qd failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

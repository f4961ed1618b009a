use clap::{Args, Parser, Subcommand, ValueEnum};
use qd_core::{
    CalculationRequest, EnvironmentalConditions, KFactorType, MaterialProperties, Organization,
    WeightUnit,
};
use std::path::PathBuf;

/// Explosives quantity-distance calculator
#[derive(Parser, Debug)]
#[command(name = "qd", version)]
#[command(about = "Explosives safety quantity-distance (QD) calculations", long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Safe separation distance for a quantity of explosives
    Calculate {
        #[command(flatten)]
        request: RequestArgs,

        /// Attach the fragment hazard for this casing material (steel, aluminum, generic)
        #[arg(long, requires = "casing_thickness")]
        casing_material: Option<String>,

        /// Casing thickness in inches
        #[arg(long)]
        casing_thickness: Option<f64>,
    },

    /// Hazardous fragment distance
    Fragments {
        /// Net explosive weight
        #[arg(short, long)]
        quantity: f64,

        /// Weight unit (g, kg, lbs, NEQ)
        #[arg(short, long, default_value = "lbs")]
        unit: WeightUnit,

        /// Casing material (steel, aluminum, generic)
        #[arg(short, long, default_value = "steel")]
        material: String,

        /// Casing thickness in inches
        #[arg(short, long, default_value_t = 0.5)]
        thickness: f64,
    },

    /// Buffer rings around a site as a GeoJSON FeatureCollection
    Rings {
        #[command(flatten)]
        request: RequestArgs,

        /// Site longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Site latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// K-factor multiples, ascending (default 0.25,0.5,0.75,1.0)
        #[arg(long, value_delimiter = ',')]
        multiples: Vec<f64>,

        /// Add uncertainty bands at radius x (1 +/- u)
        #[arg(long)]
        uncertainty: Option<f64>,

        /// Write the GeoJSON here instead of stdout
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Convert a quantity between weight units
    Convert {
        /// Quantity to convert
        quantity: f64,

        /// Source unit
        #[arg(long)]
        from: WeightUnit,

        /// Target unit
        #[arg(long)]
        to: WeightUnit,
    },

    /// Monte Carlo confidence interval of the safe distance
    MonteCarlo {
        #[command(flatten)]
        request: RequestArgs,

        /// Number of samples
        #[arg(short, long, default_value_t = 10_000)]
        iterations: usize,

        /// Fixed seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Siting compliance of a facility against its surroundings
    Analyze {
        /// GeoJSON FeatureCollection; the first feature is the facility
        input: PathBuf,

        /// K-factor category
        #[arg(short, long, default_value = "IBD")]
        k_type: KFactorType,

        /// Unit assumed when the facility does not state one
        #[arg(short, long, default_value = "lbs")]
        unit: WeightUnit,
    },
}

/// Inputs shared by every command that scales a quantity
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Net explosive weight
    #[arg(short, long, allow_hyphen_values = true)]
    pub quantity: f64,

    /// Weight unit (g, kg, lbs, NEQ)
    #[arg(short, long, default_value = "lbs")]
    pub unit: WeightUnit,

    /// Governing organization (DOD, DOE, NATO, AIR_FORCE)
    #[arg(short, long, default_value = "DOD")]
    pub org: Organization,

    /// K-factor category (IBD, ILD, IMD, PTRD, LOP)
    #[arg(short, long, default_value = "IBD")]
    pub k_type: KFactorType,

    /// Facility type, lab designation or LOP class
    #[arg(short, long)]
    pub subtype: Option<String>,

    /// Hazard division
    #[arg(long, default_value = "1.1")]
    pub hazard_division: String,

    /// Material sensitivity (0-1)
    #[arg(long)]
    pub sensitivity: Option<f64>,

    /// TNT equivalence factor
    #[arg(long)]
    pub tnt_equivalence: Option<f64>,

    /// Temperature in kelvin
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Relative humidity in %
    #[arg(long)]
    pub humidity: Option<f64>,

    /// Confinement factor (0-1)
    #[arg(long)]
    pub confinement: Option<f64>,

    /// Attach the risk-based siting block
    #[arg(long)]
    pub risk_based: bool,
}

impl RequestArgs {
    /// Engine request; material and environment are only attached when a flag set them
    pub fn to_request(&self) -> CalculationRequest {
        let mut request = CalculationRequest::new(self.quantity, self.unit, self.org, self.k_type)
            .with_hazard_division(self.hazard_division.clone())
            .risk_based(self.risk_based);
        if let Some(subtype) = &self.subtype {
            request = request.with_subtype(subtype.clone());
        }
        if self.sensitivity.is_some() || self.tnt_equivalence.is_some() {
            let base = MaterialProperties::default();
            request = request.with_material(MaterialProperties::new(
                self.sensitivity.unwrap_or(base.sensitivity),
                base.detonation_velocity,
                self.tnt_equivalence.unwrap_or(base.tnt_equivalence),
            ));
        }
        if self.temperature.is_some() || self.humidity.is_some() || self.confinement.is_some() {
            let base = EnvironmentalConditions::default();
            request = request.with_environment(EnvironmentalConditions::new(
                self.temperature.unwrap_or(base.temperature),
                base.pressure,
                self.humidity.unwrap_or(base.humidity),
                self.confinement.unwrap_or(base.confinement_factor),
            ));
        }
        request
    }
}

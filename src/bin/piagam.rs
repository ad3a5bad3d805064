use clap::{Parser, Subcommand, ValueEnum};
use piagam::{
    AthleteRecord, BatchExportRequest, DirectorySink, EngineConfig, MedalStatus,
    ParticipationRecord, Piagam, kelas_kejuaraan,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "piagam")]
#[command(about = "Tournament ID cards, certificates and participant rosters as PDF", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory receiving the generated PDFs.
    #[arg(long, default_value = "./exports")]
    out: PathBuf,

    /// Local mirror of /templates, /fonts and uploaded photos.
    #[arg(long, env = "PIAGAM_ASSET_ROOT")]
    asset_root: Option<PathBuf>,

    #[arg(long, env = "PIAGAM_API_BASE_URL")]
    api_base_url: Option<String>,

    #[arg(long, env = "PIAGAM_ORG")]
    org: Option<String>,

    /// Hex theme color, e.g. "#1A1A5E".
    #[arg(long)]
    theme: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// One ID card from an athlete JSON file.
    IdCard {
        athlete: PathBuf,

        /// Participant list used to enrich sparse class data.
        #[arg(long)]
        participants: Option<PathBuf>,
    },
    /// One certificate from an athlete JSON file.
    Certificate {
        athlete: PathBuf,

        #[arg(long, value_enum, default_value_t = Medal::Participant)]
        medal: Medal,

        /// Overrides the class label derived from the athlete's participation.
        #[arg(long)]
        class_label: Option<String>,
    },
    /// Certificates for a participant list, merged into one PDF.
    Certificates {
        participants: PathBuf,

        #[arg(long, value_enum, default_value_t = Medal::Participant)]
        medal: Medal,
    },
    /// ID cards for a participant list, merged into one PDF.
    IdCards { participants: PathBuf },
    /// Participant rosters from a batch export request.
    Roster { request: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Medal {
    Gold,
    Silver,
    Bronze,
    Participant,
}

impl From<Medal> for MedalStatus {
    fn from(medal: Medal) -> Self {
        match medal {
            Medal::Gold => MedalStatus::Gold,
            Medal::Silver => MedalStatus::Silver,
            Medal::Bronze => MedalStatus::Bronze,
            Medal::Participant => MedalStatus::Participant,
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)
        .map_err(|err| format!("open '{}': {err}", path.display()))?;
    let value = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|err| format!("parse '{}': {err}", path.display()))?;
    Ok(value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("piagam={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = EngineConfig::from_env()?;
    if let Some(root) = cli.asset_root {
        config.asset_root = Some(root);
    }
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    if let Some(org) = cli.org {
        config.org = org;
    }
    let engine = Piagam::builder()
        .config(config)
        .download_sink(DirectorySink::new(&cli.out))
        .build()?;
    let theme = cli.theme.as_deref();

    let report = match cli.command {
        Commands::IdCard {
            athlete,
            participants,
        } => {
            let athlete: AthleteRecord = read_json(&athlete)?;
            let list: Option<Vec<ParticipationRecord>> =
                participants.as_deref().map(read_json::<Vec<ParticipationRecord>>).transpose()?;
            engine.export_id_card(&athlete, list.as_deref(), theme)?
        }
        Commands::Certificate {
            athlete,
            medal,
            class_label,
        } => {
            let athlete: AthleteRecord = read_json(&athlete)?;
            let class_label = class_label.unwrap_or_else(|| {
                athlete
                    .authoritative_participation()
                    .and_then(|p| p.class.as_ref())
                    .map(kelas_kejuaraan)
                    .unwrap_or_default()
            });
            engine.export_certificate(&athlete, medal.into(), &class_label, theme)?
        }
        Commands::Certificates {
            participants,
            medal,
        } => {
            let list: Vec<ParticipationRecord> = read_json(&participants)?;
            engine.export_certificates(&list, medal.into(), theme)?
        }
        Commands::IdCards { participants } => {
            let list: Vec<ParticipationRecord> = read_json(&participants)?;
            engine.export_id_cards(&list, theme)?
        }
        Commands::Roster { request } => {
            let mut request: BatchExportRequest = read_json(&request)?;
            if request.theme_color.is_none() {
                request.theme_color = cli.theme.clone();
            }
            engine.export_roster(&request)?
        }
    };

    println!(
        "{}: {} page(s), {}",
        cli.out.join(&report.filename).display(),
        report.page_count,
        report
    );
    Ok(())
}

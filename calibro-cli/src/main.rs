mod error;
mod wire;

use calibro::{
    calibrate_camera, estimate_homography, estimate_homography_ransac, CalibroSettings, ErrorKind,
};
use error::CliError;
use log::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};
use structopt::StructOpt;
use wire::{CalibrateRequest, CalibrateResponse, HomographyRequest, HomographyResponse};

#[derive(StructOpt, Clone)]
#[structopt(
    name = "calibro",
    about = "Camera calibration and homography estimation from point correspondences"
)]
struct Opt {
    /// The file where settings are specified.
    ///
    /// This is in the format of `calibro::CalibroSettings`. Missing fields take their defaults.
    #[structopt(short, long)]
    settings: Option<PathBuf>,
    /// Write the response to this file instead of standard output.
    #[structopt(short, long)]
    output: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Clone)]
enum Command {
    /// Estimate a camera from world points and their pixels.
    Calibrate {
        /// The request file, or `-` for standard input.
        #[structopt(parse(from_os_str))]
        request: PathBuf,
    },
    /// Estimate the homography between two sets of pixels.
    Homography {
        /// The request file, or `-` for standard input.
        #[structopt(parse(from_os_str))]
        request: PathBuf,
        /// Tolerate wrong matches with RANSAC and report the inliers.
        #[structopt(long)]
        ransac: bool,
        /// Seed the RANSAC generator. Overrides the seed of the settings file.
        #[structopt(long)]
        seed: Option<u64>,
    },
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();
    if let Err(e) = run(opt) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), CliError> {
    let settings = match &opt.settings {
        Some(path) => {
            let settings: CalibroSettings = read_json(path)?;
            info!("loaded settings from {:?}", path);
            settings
        }
        None => {
            info!("used default settings");
            CalibroSettings::default()
        }
    };

    match opt.command {
        Command::Calibrate { request } => {
            let request: CalibrateRequest = read_json(&request)?;
            let method = request.method()?;
            info!(
                "calibrating from {} correspondences with the {} method",
                request.world.len(),
                method
            );
            let calibration =
                calibrate_camera(&request.world(), &request.image(), method, &settings)
                    .map_err(rejected)?;
            write_json(opt.output.as_deref(), &CalibrateResponse::from(&calibration))
        }
        Command::Homography {
            request,
            ransac,
            seed,
        } => {
            let request: HomographyRequest = read_json(&request)?;
            let method = request.method()?;
            info!(
                "estimating a homography from {} correspondences with the {} method",
                request.a.len(),
                method
            );
            let response = if ransac {
                let rng = match seed.or(settings.seed) {
                    Some(seed) => {
                        debug!("seeding ransac with {}", seed);
                        Xoshiro256PlusPlus::seed_from_u64(seed)
                    }
                    None => Xoshiro256PlusPlus::from_entropy(),
                };
                let outcome =
                    estimate_homography_ransac(&request.a(), &request.b(), method, &settings, rng)
                        .map_err(rejected)?;
                HomographyResponse::from(&outcome)
            } else {
                let homography = estimate_homography(&request.a(), &request.b(), method, &settings)
                    .map_err(rejected)?;
                HomographyResponse::from(&homography)
            };
            write_json(opt.output.as_deref(), &response)
        }
    }
}

/// Warns about errors caused by the request itself rather than by the estimation.
fn rejected(e: calibro::Error) -> calibro::Error {
    if matches!(e.kind(), ErrorKind::InvalidInput | ErrorKind::InsufficientData) {
        warn!("rejected request: {}", e);
    }
    e
}

fn read_json<T>(path: &Path) -> Result<T, CliError>
where
    T: DeserializeOwned,
{
    let reader: Box<dyn Read> = if path == Path::new("-") {
        Box::new(io::stdin())
    } else {
        let file = File::open(path).map_err(|source| CliError::Read {
            path: path.to_owned(),
            source,
        })?;
        Box::new(BufReader::new(file))
    };
    serde_json::from_reader(reader).map_err(|source| CliError::Json {
        path: path.to_owned(),
        source,
    })
}

fn write_json<T>(path: Option<&Path>, value: &T) -> Result<(), CliError>
where
    T: Serialize,
{
    match path {
        Some(path) => {
            let write_error = |source: io::Error| CliError::Write {
                path: path.to_owned(),
                source,
            };
            let mut writer = BufWriter::new(File::create(path).map_err(write_error)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush().map_err(write_error)?;
            info!("wrote the response to {:?}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer).map_err(|source| CliError::Write {
                path: PathBuf::from("-"),
                source,
            })?;
        }
    }
    Ok(())
}

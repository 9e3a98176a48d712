// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fs, path::PathBuf, time::Duration};

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use padseq::{
    audio,
    config::{Engine, Project},
    export::{self, ExportOptions},
    sequencer::{scheduler::step_duration, Session, SessionState},
    util::{duration_minutes_seconds, filename_display},
    verify,
};
use tracing::{info, warn};

/// How long to let voices ring out after the transport stops.
const RING_OUT: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A drum sampler and step sequencer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Verifies a project: transport, pattern and sample files.
    Verify {
        /// The path to the project file.
        project: PathBuf,
    },
    /// Plays a project's pattern through an audio device.
    Play {
        /// The path to the project file.
        project: PathBuf,
        /// The device to play through. Overrides the engine config.
        #[arg(short, long)]
        device: Option<String>,
        /// The path to the engine config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// How long to play, e.g. 30s. Defaults to playing the pattern the given number of
        /// times.
        #[arg(long)]
        duration: Option<String>,
        /// How many times to play the pattern when no duration is given.
        #[arg(short, long, default_value_t = 4)]
        loops: u32,
    },
    /// Renders a project's pattern to a mono 16-bit WAV file.
    Export {
        /// The path to the project file.
        project: PathBuf,
        /// How many times to play the pattern.
        #[arg(short, long, default_value_t = 1)]
        cycles: u32,
        /// The WAV file to write.
        #[arg(short, long)]
        output: PathBuf,
        /// The sample rate to render at. Defaults to the highest rate among the samples.
        #[arg(long)]
        sample_rate: Option<u32>,
    },
    /// Writes a new project with the default pads and an empty pattern.
    New {
        /// The path to write the project to.
        project: PathBuf,
        /// The name of the project.
        #[arg(short, long, default_value = "Untitled")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices.iter() {
                println!("- {}", device);
            }
        }
        Commands::Verify { project } => {
            let project = Project::load(&project)?;
            let report = verify::check_project(&project);
            verify::print_report(&report, &project);
            if report.has_errors() {
                return Err("project failed verification".into());
            }
        }
        Commands::Play {
            project,
            device,
            config,
            duration,
            loops,
        } => {
            let project = Project::load(&project)?;
            let report = verify::check_project(&project);
            if report.has_errors() {
                verify::print_report(&report, &project);
                return Err("project failed verification".into());
            }
            for issue in report.issues.iter() {
                warn!(
                    category = issue.category,
                    subject = issue.subject,
                    "{}",
                    issue.message
                );
            }

            let mut engine = Engine::deserialize(config.as_deref())?;
            if let Some(device) = device {
                engine.set_device(&device);
            }

            let device = audio::get_device(engine.audio())?;
            let session = Session::new(device.clone(), engine.scheduler()?, project.session_state());
            for (pad_id, path) in project.sample_paths() {
                let bytes = fs::read(&path)?;
                session
                    .load_sample(&pad_id, bytes, filename_display(&path))
                    .await?;
            }

            let play_for = match duration {
                Some(duration) => Duration::from(DurationString::from_string(duration)?),
                None => pattern_duration(&session.snapshot()) * loops,
            };
            println!(
                "Playing {} on {} for {}",
                project.name(),
                device,
                duration_minutes_seconds(play_for)
            );

            session.start()?;
            tokio::time::sleep(play_for).await;
            session.stop();
            tokio::time::sleep(RING_OUT).await;
            info!(project = project.name(), "Finished playing");
        }
        Commands::Export {
            project,
            cycles,
            output,
            sample_rate,
        } => {
            let project = Project::load(&project)?;
            let options = ExportOptions {
                cycles,
                sample_rate,
            };
            let rendered = export::export_loop(&project, &options, &output)?;
            println!(
                "Exported {} ({} cycle(s), {}) to {}",
                project.name(),
                cycles,
                duration_minutes_seconds(rendered.duration()),
                output.display()
            );
        }
        Commands::New { project, name } => {
            Project::new(&name, &SessionState::default()).save(&project)?;
            println!("Wrote {} to {}", name, project.display());
        }
    }

    Ok(())
}

/// The time one pass through the pattern takes.
fn pattern_duration(state: &SessionState) -> Duration {
    let transport = &state.transport;
    let seconds =
        step_duration(transport.bpm, transport.steps_per_bar) * transport.pattern_length() as f64;
    if seconds.is_finite() {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

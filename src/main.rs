// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drumpi::config::{self, identity};
use drumpi::kit::Wget;
use drumpi::system::Process;
use drumpi::{artifacts, device, steps};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Provisions a Raspberry Pi as a JACK + DrumGizmo drum sound engine."
)]
struct Cli {
    /// The settings file (default: /etc/drumpi.yaml, if present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Provisions the system when no command is given.
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provisions the system. Run as the operating user through sudo.
    Provision {},
    /// Prints a generated file to stdout instead of writing it.
    Render {
        /// The file to print. Omit to list the available files.
        artifact: Option<String>,
    },
    /// Waits for the audio interface the JACK start script would pick and prints it.
    Devices {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Provision {}) {
        Commands::Provision {} => {
            let system = Process;
            let orchestrator = steps::orchestrator(&settings, &system, &Wget);
            orchestrator.run(identity::invoking_user().as_deref())?;
        }
        Commands::Render { artifact } => {
            let artifacts = artifacts::all(&settings)?;
            match artifact {
                Some(name) => {
                    let Some(artifact) = artifacts.iter().find(|a| a.name == name) else {
                        return Err(format!("no generated file named '{}'", name).into());
                    };
                    print!("{}", artifact.contents);
                }
                None => {
                    println!("Generated files:");
                    for artifact in artifacts {
                        println!("- {} ({})", artifact.name, artifact.path.display());
                    }
                }
            }
        }
        Commands::Devices {} => {
            let poll = settings.poll()?;
            let card = device::wait_for_card(&Process, &poll, &settings.device_patterns())?;
            println!("{}", card);
        }
    }

    Ok(())
}

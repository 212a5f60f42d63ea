// This file is part of fpgactl, a library and tool to inspect and reprogram FPGA management engines and ports.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fpgactl is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fpgactl is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! fpgactl - command-line front end for the fpgactl library.
//!
//! Every subcommand opens the device nodes it is given, does its work on the blocking pool and
//! closes them again. Output is printed to stdout; failures are logged and give a non-zero exit
//! status.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`

mod blocking;
mod fme;
mod port;
mod pr;

use crate::fme::fme_handler;
use crate::port::{port_handler, reset_handler};
use crate::pr::{PrRequest, pr_handler};
use clap::{Parser, Subcommand, arg, command};
use fpgactl::backend::LinuxBackend;
use fpgactl::config::{DEFAULT_CONFIG_FILE, SystemPaths};
use fpgactl::error::FpgactlError;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fpgactl")]
#[command(bin_name = "fpgactl")]
struct Cli {
    #[arg(
        long = "config",
        help = r#"TOML file overriding the host paths used to map device nodes onto sysfs.
Defaults to /etc/fpgactl/config.toml, which may be absent."#
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the identity and capabilities of an FME, e.g. /dev/intel-fpga-fme.0
    Fme { device: PathBuf },
    /// Show a port, its memory regions and the FME that manages it
    Port { device: PathBuf },
    /// Reprogram the accelerator of a port with a raw bitstream
    Pr {
        /// Port node, e.g. /dev/intel-fpga-port.0
        port: PathBuf,
        /// Raw bitstream, already extracted from its container
        file: PathBuf,
        /// PR interface UUID the bitstream was built for
        #[arg(long)]
        interface_uuid: String,
        /// Accelerator UUID the port must report once programmed
        #[arg(long)]
        afu_uuid: Option<String>,
        /// Validate the request without touching the port
        #[arg(long)]
        dry_run: bool,
        /// Stop waiting after this many seconds. The programming itself is not interrupted.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Reset a port and its accelerator
    Reset { device: PathBuf },
}

fn system_paths(config: Option<&PathBuf>) -> Result<SystemPaths, FpgactlError> {
    match config {
        Some(file) if !file.is_file() => Err(FpgactlError::Argument(format!(
            "config file {file:?} does not exist"
        ))),
        Some(file) => SystemPaths::from_file(file),
        None => SystemPaths::from_file(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

async fn run(cli: Cli) -> Result<String, FpgactlError> {
    let paths = system_paths(cli.config.as_ref())?;
    debug!("using {paths:?}");
    let backend = LinuxBackend::shared(paths);
    match cli.command {
        Commands::Fme { device } => fme_handler(backend, device).await,
        Commands::Port { device } => port_handler(backend, device).await,
        Commands::Reset { device } => reset_handler(backend, device).await,
        Commands::Pr {
            port,
            file,
            interface_uuid,
            afu_uuid,
            dry_run,
            timeout,
        } => {
            let request = PrRequest {
                port,
                file,
                interface_uuid,
                afu_uuid,
                dry_run,
            };
            pr_handler(backend, request, timeout).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    match run(cli).await {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

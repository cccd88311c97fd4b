// This file is part of pol_spec_scan.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use clap::{value_parser, Arg, ArgAction, Command};
use log::{error, info};
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger,
    TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::PathBuf;
use std::process::exit;

use pol_spec_scan::application::{self, RunOptions};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("polarization scan")
        .about("Polarization-dependent spectroscopy with rotation stages and a spectrometer.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Scan parameters file")
                .default_value("config/parameters_scan.yaml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("actuator-config")
                .short('a')
                .long("actuator-config")
                .help("Actuator parameters file")
                .default_value("config/parameters_actuator.yaml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("simulate")
                .short('s')
                .long("simulate")
                .action(ArgAction::SetTrue)
                .help("Run the simulation mode"),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Proceed without the operator confirmation"),
        )
        .arg(
            Arg::new("list-devices")
                .long("list-devices")
                .action(ArgAction::SetTrue)
                .help("List the visible devices and exit"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Result file name to override the configuration file"),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("log-level")
                .help("Log level: 0 (Off), 1 (Error), 2 (Warn), 3 (Info), 4 (Debug), 5 (Trace)")
                .default_value("3")
                .value_parser(value_parser!(u32)),
        )
        .get_matches();

    let options = RunOptions {
        filepath_scan: matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_default(),
        filepath_actuator: matches
            .get_one::<PathBuf>("actuator-config")
            .cloned()
            .unwrap_or_default(),
        is_simulation_mode: matches.get_flag("simulate"),
        skip_operator_gate: matches.get_flag("yes"),
        output_file: matches.get_one::<String>("output").cloned(),
    };

    // Check the log filter
    let log_filter = get_log_filter(matches.get_one::<u32>("level"));

    // Initiate the logger
    initiate_logger(log_filter, "pol_spec_scan.log");
    info!("Log level: {log_filter}.");

    // List the devices only
    if matches.get_flag("list-devices") {
        match application::list_available_devices(&options) {
            Ok(devices) => {
                if devices.is_empty() {
                    println!("No device is found.");
                }
                for device in devices {
                    println!("{device}");
                }
            }
            Err(err) => {
                error!("{err}");
                eprintln!("Error: {err}");
                exit(1);
            }
        }

        return;
    }

    // Run the application
    match application::run(&options) {
        Ok(path) => info!("Result is saved to {path:?}."),
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            exit(1);
        }
    }
}

/// Get the log filter.
///
/// # Arguments
/// * `log_level` - Log level.
///
/// # Returns
/// Log filter.
fn get_log_filter(log_level: Option<&u32>) -> LevelFilter {
    match log_level {
        Some(0) => LevelFilter::Off,
        Some(1) => LevelFilter::Error,
        Some(2) => LevelFilter::Warn,
        Some(3) => LevelFilter::Info,
        Some(4) => LevelFilter::Debug,
        Some(5) => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initiate the logger to the terminal and the file. Only the terminal is
/// used if the file can not be created.
///
/// # Arguments
/// * `level` - Log level.
/// * `filepath` - Log file path.
fn initiate_logger(level: LevelFilter, filepath: &str) {
    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond]"
        ))
        .build();

    // Log to the terminal
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    // Log to the file

    match File::create(filepath) {
        Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
        Err(error) => eprintln!("Failed to create the log file: {error}."),
    }

    let _ = CombinedLogger::init(loggers);
}

//! `recur`: expand and sanitize iCalendar events from the command line.
//!
//! Reads one VEVENT (or a bare list of its properties) from a file or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use recurrence_engine::{
    expand_with_options, format_duration, parse_reference_zone, sanitize, EventDescriptor,
    ExpandOptions, Occurrence, TemporalValue, DEFAULT_HORIZON_YEAR,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "recur")]
#[command(version, about = "Expand iCalendar events into concrete occurrences", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every occurrence of an event
    Expand {
        /// VEVENT file; stdin when omitted or `-`
        file: Option<PathBuf>,

        /// Reference timezone (IANA name)
        #[arg(long, default_value = "UTC")]
        tz: String,

        /// Last year generated for rules without COUNT or UNTIL
        #[arg(long, default_value_t = DEFAULT_HORIZON_YEAR)]
        horizon_year: i32,

        /// Print a JSON array instead of one line per occurrence
        #[arg(long)]
        json: bool,
    },

    /// Print the repaired DTSTART, DTEND and DURATION of an event
    Sanitize {
        /// VEVENT file; stdin when omitted or `-`
        file: Option<PathBuf>,

        /// Print JSON instead of property lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Expand {
            file,
            tz,
            horizon_year,
            json,
        } => {
            let reference = parse_reference_zone(&tz)?;
            let event = read_event(file.as_deref())?;
            let options = ExpandOptions { horizon_year };
            let occurrences = expand_with_options(&event, reference, &options)?;
            tracing::debug!(count = occurrences.len(), tz = %tz, "expanded event");
            print_occurrences(&occurrences, json)
        }
        Command::Sanitize { file, json } => {
            let event = sanitize(&read_event(file.as_deref())?)?;
            print_sanitized(&event, json)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_event(file: Option<&Path>) -> Result<EventDescriptor> {
    let text = match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    Ok(EventDescriptor::from_vevent(&text)?)
}

fn print_occurrences(occurrences: &[Occurrence], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(occurrences)?);
    } else {
        for occurrence in occurrences {
            println!("{} / {}", occurrence.start, occurrence.end);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct SanitizedEvent<'a> {
    start: Option<&'a TemporalValue>,
    end: Option<&'a TemporalValue>,
    duration: Option<String>,
}

fn print_sanitized(event: &EventDescriptor, json: bool) -> Result<()> {
    let duration = event.duration.map(format_duration);
    if json {
        let sanitized = SanitizedEvent {
            start: event.start.as_ref(),
            end: event.end.as_ref(),
            duration,
        };
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    if let Some(start) = &event.start {
        println!("{}", property_line("DTSTART", start));
    }
    if let Some(end) = &event.end {
        println!("{}", property_line("DTEND", end));
    }
    if let Some(duration) = duration {
        println!("DURATION:{duration}");
    }
    Ok(())
}

/// `DTSTART;VALUE=DATE:20140829`, `DTSTART;TZID=Europe/Berlin:20140829T080000`, ...
fn property_line(name: &str, value: &TemporalValue) -> String {
    match value {
        TemporalValue::Date(_) => format!("{name};VALUE=DATE:{value}"),
        TemporalValue::Zoned { .. } => format!("{name};{value}"),
        TemporalValue::Floating(_) | TemporalValue::Utc(_) => format!("{name}:{value}"),
    }
}

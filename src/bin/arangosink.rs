#![allow(unknown_lints)]

extern crate arangosink;
extern crate chrono;
extern crate fern;

#[macro_use]
extern crate log;

use arangosink::agent::Agent;
use arangosink::config;
use arangosink::serializer::JsonSerializer;
use arangosink::sink::Registry;
use chrono::Utc;
use std::io;
use std::process;

fn main() {
    let args = match config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("arangosink: {}", e);
            process::exit(2);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("-"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply();
    if let Err(e) = dispatch {
        eprintln!("arangosink: could not set up logging: {}", e);
        process::exit(2);
    }

    info!("arangosink - {}", args.version);

    let registry = Registry::builtin();
    let mut agent = Agent::new(args.flush_batch_size);
    for output in &args.outputs {
        match registry.create(&output.name, &output.config_path, &output.table) {
            Ok(mut built) => {
                built.set_serializer(Box::new(JsonSerializer));
                info!("{}: {}", output.config_path, built.description());
                agent.add_output(output.config_path.clone(), built);
            }
            Err(e) => {
                error!("could not build {}: {}", output.config_path, e);
                process::exit(1);
            }
        }
    }
    if agent.is_empty() {
        warn!("no outputs configured, metrics will be discarded");
    }

    if agent.connect().is_err() {
        process::exit(1);
    }

    let stdin = io::stdin();
    let result = agent.run(stdin.lock());
    agent.close();

    match result {
        Ok(report) => {
            info!(
                "received {} metrics ({} malformed lines) in {} flushes, {} failed writes",
                report.received, report.malformed, report.flushes, report.failed_writes
            );
        }
        Err(e) => {
            error!("failed reading input: {}", e);
            process::exit(1);
        }
    }
}

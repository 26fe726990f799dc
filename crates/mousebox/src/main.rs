use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::warn;

use mousebox::cli::CliArgs;
use mousebox::display::{DisplaySink, NullSink, PacedConsoleSink};
use mousebox::pipeline::{run_detection, RunOutcome};
use mousebox_decoder::{Backend, Configuration, FrameError};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), FrameError> {
    env_logger::init();
    let args = CliArgs::parse();

    if args.list_backends {
        print_available_backends();
        return Ok(());
    }

    let Some(input) = args.input.clone() else {
        return Err(FrameError::configuration(
            "an input video path is required; see --help",
        ));
    };

    let region = args.region_of_interest()?;

    let mut config = Configuration::from_env().unwrap_or_default();
    if let Some(backend) = args.backend.as_deref() {
        config.backend = Backend::from_str(backend)?;
    }
    config.input = Some(input);

    let available = Configuration::available_backends();
    if available.is_empty() {
        return Err(FrameError::configuration(
            "no decoding backend available; rebuild with a backend feature such as \"backend-ffmpeg\"",
        ));
    }
    if !available.contains(&config.backend) {
        return Err(FrameError::unsupported(config.backend.as_str()));
    }

    let provider = config.create_provider()?;
    let metadata = provider.metadata();

    let mut sink: Box<dyn DisplaySink> = if args.display {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::Relaxed);
            }
        });
        Box::new(PacedConsoleSink::new(
            metadata.nominal_fps().unwrap_or(30.0),
            metadata.calculate_total_frames(),
            cancel,
        ))
    } else {
        Box::new(NullSink)
    };

    match run_detection(provider, region, sink.as_mut()).await {
        Ok(outcome) => {
            if outcome.cancelled {
                warn!("cancelled after {} frames", outcome.frames);
            }
            report(&outcome, args.json);
            Ok(())
        }
        Err((err, processed)) => {
            eprintln!("scan failed after {processed} frames");
            Err(err)
        }
    }
}

fn report(outcome: &RunOutcome, json: bool) {
    if json {
        let summary = serde_json::json!({
            "entered": outcome.entry_time.is_some(),
            "entry_seconds": outcome.entry_time.map(|t| t.as_secs_f64()),
            "frames": outcome.frames,
            "fps": outcome.fps,
        });
        println!("{summary}");
        return;
    }
    match outcome.entry_time {
        Some(entry) => println!(
            "Mouse fully entered the box at {:.2} seconds.",
            entry.as_secs_f64()
        ),
        None => println!("Mouse never fully entered the box."),
    }
}

fn print_available_backends() {
    let names: Vec<&'static str> = Configuration::available_backends()
        .iter()
        .map(Backend::as_str)
        .collect();
    if names.is_empty() {
        println!("available backends: (none compiled)");
    } else {
        println!("available backends: {}", names.join(", "));
    }
}

use MIDI_MUSE::{
    Args, GenerationRequest, GenerationResult, GenerationUpdate, Generator, GeneratorConfig,
    HttpBackend, ModelBackend, ModelConfig, ReplayBackend, instrument_name, parse_instrument,
    recover,
};
use anyhow::{Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use std::fs;
use std::sync::Arc;

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
    }
    logger.init();

    let program = parse_instrument(&args.instrument);
    let request = GenerationRequest::new(&args.style, args.bars, program)?;

    info!(
        "Generating {} bars of '{}' for {}..!",
        request.bars(),
        request.style(),
        instrument_name(program)
            .map(|name| format!("{} ({})", name, program))
            .unwrap_or_else(|| format!("program {}", program))
    );

    if args.dry_run {
        return dry_run(&args, &request);
    }

    let config = GeneratorConfig::from(&args);
    let result = match &args.response_file {
        Some(path) => generate(ReplayBackend::from_file(path)?, config, request)?,
        None => generate(HttpBackend::new(ModelConfig::from(&args)), config, request)?,
    };

    let path = match result {
        GenerationResult::Success(path) => path,
        GenerationResult::Failure(why) => {
            bail!("Generation failed, try a different style or run it again: {}", why)
        }
    };

    info!("Done! MIDI written to '{}'..!", path.display());

    if let Some(export) = &args.export {
        fs::copy(&path, export).map_err(|e| {
            anyhow!(
                "Failed to export {} to {}: {}",
                path.display(),
                export.display(),
                e
            )
        })?;
        info!("Exported a copy to '{}'..!", export.display());
    }

    Ok(())
}

/// Recovers notes (from a saved response, or a fresh model call) and prints them.
fn dry_run(args: &Args, request: &GenerationRequest) -> Result<()> {
    let text = match &args.response_file {
        Some(path) => ReplayBackend::from_file(path)?.complete(&[])?,
        None => HttpBackend::new(ModelConfig::from(args))
            .complete(&MIDI_MUSE::build_messages(request))?,
    };

    let notes = recover(&text).map_err(|why| anyhow!("Recovery failed: {}", why))?;
    info!("Recovered {} notes..!", notes.len());

    for (i, note) in notes.iter().enumerate() {
        info!(
            "Note {}: pitch={} start={} duration={} velocity={}",
            i, note.pitch, note.start_time, note.duration, note.velocity
        );
    }

    Ok(())
}

fn generate<B: ModelBackend + 'static>(
    backend: B,
    config: GeneratorConfig,
    request: GenerationRequest,
) -> Result<GenerationResult> {
    let generator = Arc::new(Generator::new(backend, config));
    let generator_for_handler = Arc::clone(&generator);

    ctrlc::set_handler(move || {
        if generator_for_handler.cancel().is_ok() {
            warn!("Ctrl-C received, cancelling after the current step (press again to quit)..!");
        } else {
            warn!("Ctrl-C received again, exiting now..!");
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow!("Error setting Ctrl-C handler: {}", e))?;

    let updates = generator.start(request)?;
    let mut outcome = None;

    for update in updates.iter() {
        match update {
            GenerationUpdate::State(state) => debug!("Attempt state: {:?}", state),
            GenerationUpdate::Progress(percent) => debug!("Encoding: {}%", percent),
            GenerationUpdate::Finished(result) => {
                outcome = Some(result);
                break;
            }
        }
    }

    generator.wait()?;
    outcome.ok_or_else(|| anyhow!("Generation thread exited without a result..!"))
}

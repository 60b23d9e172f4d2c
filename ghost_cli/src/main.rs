use clap::{Parser, Subcommand};
use ghost_core::checkpoint::Checkpoint;
use ghost_core::cues::DispatchOutcome;
use ghost_core::playback::{CueAction, Tone};
use ghost_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ghost")]
#[command(about = "Ghosting drill timeline preview", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory (checkpoints live here)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read settings from this file instead of the default config path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a workout file and list any problems
    Validate {
        file: PathBuf,
    },

    /// Generate and print a workout's timeline
    Timeline {
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Number of passes over the pattern list (overrides the workout)
        #[arg(long, conflicts_with = "unbounded")]
        supersets: Option<u32>,

        /// Keep cycling the pattern list; output is paged
        #[arg(long)]
        unbounded: bool,

        /// Stop after this many events and report a pause
        #[arg(long)]
        max_events: Option<usize>,

        /// Save the cursor when paused (default: a file in the data directory)
        #[arg(long, num_args = 0..=1)]
        checkpoint: Option<Option<PathBuf>>,

        /// Continue from a saved checkpoint
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a virtual clock over the timeline and print cues as they fire
    Play {
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Virtual clock step in milliseconds
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,

        /// Simulate a host without speech
        #[arg(long)]
        no_narration: bool,

        /// Simulate a host without tones
        #[arg(long)]
        no_tones: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    ghost_core::logging::init_with_level(ghost_core::logging::level_for_verbosity(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Timeline {
            file,
            seed,
            supersets,
            unbounded,
            max_events,
            checkpoint,
            resume,
            json,
        } => {
            let supersets = if unbounded {
                Some(Supersets::Unbounded)
            } else {
                supersets.map(Supersets::Count)
            };
            let options = TimelineOptions {
                request: GenerationRequest { seed, supersets },
                max_events: max_events.or(unbounded.then_some(config.generation.batch_size)),
                checkpoint: checkpoint.map(|path| {
                    path.unwrap_or_else(|| config.data.checkpoint_dir().join("latest.json"))
                }),
                resume,
                json,
            };
            cmd_timeline(&file, &config, options)
        }
        Commands::Play {
            file,
            seed,
            tick_ms,
            no_narration,
            no_tones,
        } => cmd_play(&file, &config, seed, tick_ms, !no_narration, !no_tones),
    }
}

fn cmd_validate(file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)?;
    let workout: Workout = serde_json::from_str(&json)?;

    match validate(&workout) {
        Ok(()) => {
            println!(
                "✓ {} is valid ({} patterns, {} shots)",
                workout.name,
                workout.patterns.len(),
                workout.patterns.iter().map(|p| p.shot_count()).sum::<usize>()
            );
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("{}", issue);
            }
            Err(Error::Validation(ValidationErrors(issues)))
        }
    }
}

struct TimelineOptions {
    request: GenerationRequest,
    max_events: Option<usize>,
    checkpoint: Option<PathBuf>,
    resume: Option<PathBuf>,
    json: bool,
}

fn cmd_timeline(file: &Path, config: &Config, options: TimelineOptions) -> Result<()> {
    let workout = load_workout_file(file, LoadOptions::default())?;
    let generator = TimelineGenerator::new(&workout, &config.timing);

    let mut run_id = None;
    let state = match &options.resume {
        Some(path) => {
            let checkpoint = Checkpoint::load(path)?.ok_or_else(|| {
                Error::Checkpoint(format!("no usable checkpoint at {}", path.display()))
            })?;
            checkpoint.ensure_matches(&workout.name)?;
            run_id = Some(checkpoint.run_id);
            Some(checkpoint.state)
        }
        None => None,
    };

    let batch = generator.generate(state, options.request, options.max_events)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&batch.events)?);
    } else {
        for event in &batch.events {
            print_event(event);
        }
    }

    match batch.progress {
        Progress::Done => {
            eprintln!("Done: {} events", batch.events.len());
        }
        Progress::Paused(state) => match &options.checkpoint {
            Some(path) => {
                let mut checkpoint = Checkpoint::new(&workout.name, state);
                if let Some(id) = run_id {
                    checkpoint.run_id = id;
                }
                checkpoint.save(path)?;
                eprintln!("Paused; checkpoint saved to {}", path.display());
            }
            None => {
                eprintln!(
                    "Paused after {} events (pass --checkpoint to continue later)",
                    state.total_events_generated
                );
            }
        },
    }
    Ok(())
}

fn print_event(event: &TimelineEvent) {
    match &event.sub_events {
        SubEvents::Shot(shot) => {
            let split = match (shot.split_step_time, shot.split_step_speed) {
                (Some(at), Some(speed)) => format!("  split {:.2} ({:?})", at, speed),
                _ => String::new(),
            };
            println!(
                "{:>8.2} - {:>8.2}  shot     {:<20} announce {:.2}  beep {:.2}{}",
                event.start_time, event.end_time, event.name, shot.announced_time, shot.beep_time, split
            );
        }
        SubEvents::Message(message) => {
            let countdown = match message.countdown {
                Some(window) => format!("  countdown {:.2}-{:.2}", window.start, window.end),
                None => String::new(),
            };
            println!(
                "{:>8.2} - {:>8.2}  message  {:<20} \"{}\"  tts until {:.2}{}",
                event.start_time, event.end_time, event.name, message.text, message.tts_end, countdown
            );
        }
    }
}

/// Prints what a speech engine would say
struct PrintNarrator;

impl Narrator for PrintNarrator {
    fn speak(&mut self, text: &str, voice: &str, speech_rate: f64) -> Result<()> {
        println!("    say \"{}\" ({}, {:.1}x)", text, voice, speech_rate);
        Ok(())
    }
}

/// Prints what a tone generator would play
struct PrintTones;

impl TonePlayer for PrintTones {
    fn play(&mut self, tone: Tone) -> Result<()> {
        match tone {
            Tone::Beep => println!("    beep"),
            Tone::SplitStep(speed) => println!("    split-step ({:?})", speed),
        }
        Ok(())
    }
}

fn cmd_play(
    file: &Path,
    config: &Config,
    seed: u64,
    tick_ms: u64,
    narration: bool,
    tones: bool,
) -> Result<()> {
    if tick_ms == 0 {
        return Err(Error::Other("--tick-ms must be positive".into()));
    }
    let workout = load_workout_file(file, LoadOptions::default())?;
    let events = TimelineGenerator::new(&workout, &config.timing)
        .generate_all(GenerationRequest::seeded(seed))?;
    let index = PlaybackIndex::new(events);

    let mut cursor = PlaybackCursor::new();
    let mut dispatcher = CueDispatcher::new(
        narration.then(|| Box::new(PrintNarrator) as Box<dyn Narrator>),
        tones.then(|| Box::new(PrintTones) as Box<dyn TonePlayer>),
    );

    let step = tick_ms as f64 / 1000.0;
    let end = index.duration();
    let mut active_key: Option<(String, u64)> = None;
    let mut tick: u64 = 0;
    loop {
        let t = tick as f64 * step;

        let active = index.active_at(t);
        let current = active.map(|a| (a.event.id.clone(), a.event.start_time.to_bits()));
        if current != active_key {
            if let Some(a) = active {
                println!("[{:>7.2}s] {} ({:?})", t, a.event.name, a.event.kind);
            }
            active_key = current;
        }

        for cue in cursor.sample(&index, t) {
            let label = match &cue.action {
                CueAction::Narrate { .. } => "narrate",
                CueAction::Tone(_) => "tone",
            };
            println!("[{:>7.2}s]   {} at {:.2}s", t, label, cue.at);
            if let DispatchOutcome::Unavailable(capability) = dispatcher.dispatch(&cue) {
                tracing::debug!("Cue at {:.2}s needs {}", cue.at, capability);
            }
        }

        if t >= end {
            break;
        }
        tick += 1;
    }

    for report in dispatcher.take_reports() {
        eprintln!("warning: {}", report);
    }
    let stats = dispatcher.stats();
    println!(
        "Finished at {:.2}s: {} cues played, {} skipped, {} without audio",
        end, stats.played, stats.skipped, stats.unavailable
    );
    Ok(())
}

use anyhow::Result;
use clap::Parser;
use mcam::commands::KeyboardCommands;
use mcam::config::McamConfig;
use mcam::display::create_display;
use mcam::source::create_source;
use mcam::App;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mcam")]
#[command(about = "Motion-triggered camera recorder")]
#[command(version)]
#[command(long_about = "Watches a camera feed for motion and, on command, records \
motion footage (with a short pre-roll) to XVID AVI files and logs motion intervals \
to a text file. Controlled with single keys: r toggles recording, t toggles interval \
tracking, d toggles the debug overlay, q quits.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Use the alternate (Pi camera module) capture source
    #[arg(short = 'p', long, help = "Capture from the Pi camera module instead of the default webcam")]
    alternate_source: bool,

    /// Rotate captured frames by this many degrees
    #[arg(short = 'a', long, value_name = "DEGREES", help = "Rotation applied to every captured frame")]
    angle: Option<f32>,

    /// Capture resolution as width and height
    #[arg(short = 'r', long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], help = "Capture resolution")]
    resolution: Option<Vec<u32>>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting")]
    validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting mcam v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match McamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    apply_overrides(&mut config, &args);

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let source = create_source(&config.source).await.map_err(|e| {
        error!("Failed to open capture source: {}", e);
        e
    })?;

    let display = create_display(config.source.resolution).map_err(|e| {
        error!("Failed to open display: {}", e);
        e
    })?;

    let commands = KeyboardCommands::new().map_err(|e| {
        error!("Failed to take over keyboard input: {}", e);
        e
    })?;

    let mut app = App::new(config, source, display, Box::new(commands));
    match app.run().await {
        Ok(()) => {
            info!("mcam exited cleanly");
            Ok(())
        }
        Err(e) => {
            error!("mcam exited with error: {}", e);
            // Returning the error (exit code 1 via anyhow) instead of calling
            // process::exit lets the raw-mode guard inside the keyboard
            // command source restore the terminal
            Err(e.into())
        }
    }
}

/// CLI flags take precedence over the configuration file
fn apply_overrides(config: &mut McamConfig, args: &Args) {
    if args.alternate_source {
        config.source.alternate_source = true;
    }
    if let Some(angle) = args.angle {
        config.detector.rotation_angle = angle;
    }
    if let Some(resolution) = &args.resolution {
        if let [width, height] = resolution[..] {
            config.source.resolution = (width, height);
        }
    }
}

fn init_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mcam={}", log_level)));

    // Compact single-line output: the terminal is in raw mode while running
    let fmt_layer = fmt::layer()
        .compact()
        .with_target(args.debug)
        .with_file(args.debug)
        .with_line_number(args.debug);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

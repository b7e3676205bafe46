use anyhow::{Context, Result};
use clap::Parser;
use focuswatch::{FocusApp, FocusConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "focuswatch")]
#[command(about = "Webcam-driven distraction detection for focus sessions")]
#[command(version)]
#[command(long_about = "Watches the webcam during a focus session and raises an alert when \
a phone, a pet or another person shows up, or when the user is absent, looking away or \
dozing off. Face signals are debounced over consecutive ticks before they count.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "focuswatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// JSON scenario driving the scripted classifier backends
    #[arg(long, value_name = "FILE", help = "Scenario file for the scripted model backends")]
    scenario: Option<String>,

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
    #[arg(long, help = "Validate configuration file and exit without starting detection")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Wait for the 's' key instead of starting detection right away
    #[arg(long, help = "Do not start detection until toggled from the keyboard")]
    no_autostart: bool,

    /// Disable the interactive keyboard controls
    #[arg(long, help = "Disable keyboard controls (useful when not attached to a terminal)")]
    no_keyboard: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.no_keyboard && args.no_autostart {
        anyhow::bail!("--no-autostart requires the keyboard controls");
    }

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting focuswatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = FocusConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    if let Some(scenario) = &args.scenario {
        config.models.scenario_path = Some(scenario.clone());
    }

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut app = FocusApp::new(config).await.map_err(|e| {
        error!("Failed to create application: {}", e);
        e
    })?;

    app.set_keyboard_enabled(!args.no_keyboard);

    app.start(!args.no_autostart).await.map_err(|e| {
        error!("Failed to start: {}", e);
        e
    })?;

    let exit_code = app.run().await.map_err(|e| {
        error!("Error during execution: {}", e);
        e
    })?;

    info!("focuswatch exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

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
        .unwrap_or_else(|_| EnvFilter::new(format!("focuswatch={}", log_level)));

    // Alerts own stdout; logs go to stderr
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let defaults = toml::to_string_pretty(&FocusConfig::default())
        .context("Failed to serialize default configuration")?;

    println!("# focuswatch configuration file");
    println!("# Every key is optional; environment variables override the file,");
    println!("# e.g. FOCUSWATCH__DETECTION__TICK_INTERVAL_MS=250");
    println!();
    println!("{}", defaults);

    Ok(())
}

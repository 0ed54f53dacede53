use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use effectcam::camera::{list_device_details, CapturePlatform, MockPlatform};
use effectcam::{CaptureController, EffectcamApp, EffectcamConfig};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-memory platform, no hardware needed
    Mock,
    /// GStreamer capture (requires the `camera` feature)
    Gstreamer,
}

impl Backend {
    /// Real capture when the build carries it, the in-memory platform otherwise
    const fn for_build() -> Self {
        if cfg!(all(target_os = "linux", feature = "camera")) {
            Backend::Gstreamer
        } else {
            Backend::Mock
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "effectcam")]
#[command(about = "Camera preview with an imaging effect and toggled video recording")]
#[command(version)]
#[command(long_about = "Opens the rear camera when present, shows a live preview with a \
Lomo imaging effect attached and records MP4 video to a temporary file on demand. \
Press SPACE or r to toggle recording, v to simulate hiding/showing the window, q to quit.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "effectcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Capture backend, `gstreamer` by default in `camera` builds
    #[arg(short, long, value_enum, default_value_t = Backend::for_build())]
    backend: Backend,

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
    #[arg(long, help = "Validate configuration file and exit without opening a camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// List capture devices and exit
    #[arg(long, help = "Enumerate capture devices of the selected backend and exit")]
    list_devices: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting effectcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match EffectcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

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
                drop(log_guard);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let platform = create_platform(args.backend)?;

    if args.list_devices {
        let devices = platform.enumerate_devices().await?;
        list_device_details(&devices);
        for device in &devices {
            println!(
                "{}\t{}\tpanel={}\tdefault={}",
                device.id,
                device.name,
                device
                    .panel()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                device.is_default
            );
        }
        return Ok(());
    }

    let controller = CaptureController::new(platform, config).map_err(|e| {
        error!("Failed to create capture controller: {}", e);
        e
    })?;

    let keyboard_enabled = std::io::stdin().is_terminal();
    let mut app = EffectcamApp::new(Arc::new(controller), keyboard_enabled);

    app.initialize().await.map_err(|e| {
        error!("Failed to initialize capture: {}", e);
        e
    })?;

    let exit_code = app.run().await.map_err(|e| {
        error!("Error during execution: {}", e);
        e
    })?;

    info!("Effectcam exited with code: {}", exit_code);

    if exit_code != 0 {
        drop(log_guard);
        std::process::exit(exit_code);
    }
    Ok(())
}

fn create_platform(backend: Backend) -> Result<Arc<dyn CapturePlatform>> {
    match backend {
        Backend::Mock => Ok(Arc::new(MockPlatform::phone())),
        #[cfg(all(target_os = "linux", feature = "camera"))]
        Backend::Gstreamer => Ok(Arc::new(effectcam::GstPlatform::new()?)),
        #[cfg(not(all(target_os = "linux", feature = "camera")))]
        Backend::Gstreamer => Err(anyhow!(
            "GStreamer backend unavailable: rebuild with `--features camera` on Linux"
        )),
    }
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
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
        .unwrap_or_else(|_| EnvFilter::new(format!("effectcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Effectcam Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Override any value with EFFECTCAM_<SECTION>__<KEY>, e.g. EFFECTCAM_CAMERA__PREVIEW_WIDTH=640");
    println!();
    println!("{}", EffectcamConfig::default().to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_follows_build() {
        let args = Args::try_parse_from(["effectcam"]).unwrap();

        #[cfg(all(target_os = "linux", feature = "camera"))]
        assert_eq!(args.backend, Backend::Gstreamer);
        #[cfg(not(all(target_os = "linux", feature = "camera")))]
        assert_eq!(args.backend, Backend::Mock);
    }

    #[test]
    fn test_mock_backend_is_opt_in() {
        let args = Args::try_parse_from(["effectcam", "--backend", "mock"]).unwrap();
        assert_eq!(args.backend, Backend::Mock);

        let args = Args::try_parse_from(["effectcam", "-b", "gstreamer"]).unwrap();
        assert_eq!(args.backend, Backend::Gstreamer);
    }
}

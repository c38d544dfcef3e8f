//! WS2801 border demo
//!
//! Drives a WS2801 strip around a screen with a rainbow that rotates
//! around the border. Each LED's hue comes from its angle around the
//! screen centre, so a correct strand layout shows one smooth color wheel.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/ws2801-spidev --fps 30 -- \
//!     --leds-top 33-56 --leds-left 32-28,X4,27-14 --led-inset-top 5
//! ```
//!
//! Everything after `--` is handed to the sink's own option parser.

#[cfg(not(feature = "hardware"))]
fn main() {
    eprintln!("This binary requires the 'hardware' feature (spidev).");
    eprintln!("Build with: cargo build --release");
    eprintln!("Tests can run without it: cargo test --no-default-features");
    std::process::exit(1);
}

#[cfg(feature = "hardware")]
fn main() -> std::process::ExitCode {
    use clap::Parser;
    use std::process::ExitCode;
    use std::time::Duration;
    use tracing_subscriber::EnvFilter;
    use ws2801_spidev::{Color, Sink, Ws2801Sink, is_running, setup_signal_handler};

    /// Rotating rainbow on a WS2801 ambient-light frame
    #[derive(Parser)]
    #[command(name = "ws2801-spidev")]
    #[command(version)]
    struct Args {
        /// Frames per second
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Brightness (0-100)
        #[arg(long, default_value = "75")]
        brightness: u8,

        /// Width of the virtual screen the strands border
        #[arg(long, default_value = "160")]
        screen_width: i32,

        /// Height of the virtual screen the strands border
        #[arg(long, default_value = "90")]
        screen_height: i32,

        /// Sink options, e.g. `-- --leds-top 0-29 --leds-right 30-45`
        #[arg(last = true)]
        sink_args: Vec<String>,
    }

    /// Hue (0-359) of a border point by its angle around the screen centre.
    fn hue_at(x: i32, y: i32, width: i32, height: i32) -> u16 {
        let dx = x as f32 - width as f32 / 2.0;
        let dy = y as f32 - height as f32 / 2.0;
        let degrees = dy.atan2(dx).to_degrees().rem_euclid(360.0);
        (degrees as u16) % 360
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();

    let sink_argv = std::iter::once("ws2801".to_string()).chain(args.sink_args);
    let mut sink = match Ws2801Sink::from_args(sink_argv) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let running = match setup_signal_handler() {
        Ok(running) => running,
        Err(e) => {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("WS2801 demo v{}", env!("CARGO_PKG_VERSION"));
    sink.print_configuration();

    if let Err(e) = sink.start() {
        tracing::error!("Failed to start sink: {e}");
        return ExitCode::FAILURE;
    }

    // Hues only depend on geometry, so work them out once.
    let hues: Vec<Option<u16>> = (0..sink.num_outputs())
        .map(|output| {
            sink.map_output_to_point(output, args.screen_width, args.screen_height)
                .map(|p| hue_at(p.x, p.y, args.screen_width, args.screen_height))
        })
        .collect();

    let frame_duration = Duration::from_millis(1000 / args.fps.max(1) as u64);
    let mut shift: u16 = 0;
    let mut failed_frames = 0usize;

    while is_running(&running) {
        for (output, hue) in hues.iter().enumerate() {
            if let Some(hue) = hue {
                let color = Color::from_hue(hue + shift).apply_brightness(args.brightness);
                if let Err(e) = sink.set_output_to_rgb(output, color) {
                    tracing::debug!("Output {output} not set: {e}");
                }
            }
        }

        if let Err(e) = sink.commit() {
            failed_frames += 1;
            if failed_frames <= 5 {
                tracing::warn!("Frame not sent: {e}");
            }
        }

        shift = (shift + 2) % 360;
        std::thread::sleep(frame_duration);
    }

    if failed_frames > 0 {
        tracing::warn!("{failed_frames} frames failed to send");
    }

    tracing::info!("Shutting down cleanly.");
    match sink.stop() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Failed to stop sink: {e}");
            ExitCode::FAILURE
        }
    }
}

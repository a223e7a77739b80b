//! Pushes a local video file to an RTSP endpoint in an endless loop so the
//! sensor can run without a camera.

use anyhow::Context;
use clap::Parser;
use common::Environment;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "stream-sim", about = "Loop a video file to an RTSP endpoint")]
struct Args {
    /// Video file to stream
    #[arg(long, default_value = "data/test_video.mp4")]
    video: PathBuf,

    /// RTSP publish URL
    #[arg(long, default_value = "rtsp://127.0.0.1:8554/live")]
    url: String,

    /// Output frame rate
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    fps: u32,
}

fn ffmpeg_args(args: &Args) -> Vec<String> {
    let video = args.video.display().to_string();
    let fps = args.fps.to_string();

    [
        "-hide_banner",
        "-loglevel",
        "warning",
        "-re",
        "-stream_loop",
        "-1",
        "-i",
        video.as_str(),
        "-an",
        "-r",
        fps.as_str(),
        "-c:v",
        "libx264",
        "-preset",
        "ultrafast",
        "-tune",
        "zerolatency",
        "-pix_fmt",
        "yuv420p",
        "-f",
        "rtsp",
        "-rtsp_transport",
        "tcp",
        args.url.as_str(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::setup_logging(Environment::from_env());

    anyhow::ensure!(
        args.video.is_file(),
        "Video file not found: {}",
        args.video.display()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    let mut child = Command::new("ffmpeg")
        .args(ffmpeg_args(&args))
        .stdin(Stdio::null())
        .spawn()
        .context("Failed to spawn ffmpeg - is it installed and on PATH?")?;

    tracing::info!(
        video = %args.video.display(),
        url = %args.url,
        fps = args.fps,
        "Streaming in a loop, Ctrl-C to stop"
    );

    loop {
        if let Some(status) = child.try_wait()? {
            anyhow::bail!("ffmpeg exited unexpectedly: {}", status);
        }
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("Shutdown requested, stopping stream");
            // Already gone if it received the same signal
            let _ = child.kill();
            child.wait()?;
            return Ok(());
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

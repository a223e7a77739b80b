use super::{Frame, SourceError, VideoSource};
use serde::Deserialize;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

const FFPROBE: &str = "ffprobe";
const FFMPEG: &str = "ffmpeg";
const CHANNELS: u32 = 3;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

struct Stream {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
}

/// Decodes any ffmpeg-readable uri (RTSP, file, device) to raw BGR frames
/// through an `ffmpeg` child process.
pub struct FfmpegSource {
    open_timeout: Duration,
    stream: Option<Stream>,
}

impl FfmpegSource {
    pub fn new(open_timeout: Duration) -> Self {
        Self {
            open_timeout,
            stream: None,
        }
    }

    fn network_args(&self, uri: &str) -> Vec<String> {
        let timeout_us = self.open_timeout.as_micros().to_string();
        if uri.starts_with("rtsp://") {
            vec![
                "-rtsp_transport".into(),
                "tcp".into(),
                "-timeout".into(),
                timeout_us,
            ]
        } else if is_network(uri) {
            vec!["-rw_timeout".into(), timeout_us]
        } else {
            Vec::new()
        }
    }

    fn probe(&self, uri: &str) -> Result<(u32, u32), SourceError> {
        let output = Command::new(FFPROBE)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height", "-of", "json"])
            .args(self.network_args(uri))
            .arg(uri)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SourceError::Spawn {
                program: FFPROBE,
                source,
            })?;

        if !output.status.success() {
            return Err(SourceError::Probe {
                uri: uri.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe(&output.stdout).ok_or_else(|| SourceError::NoVideoStream(uri.to_string()))
    }

    /// Frames keep the probed coded size: rotation metadata is ignored,
    /// otherwise rotated sources would arrive transposed.
    fn decoder_args(&self, uri: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-noautorotate"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(self.network_args(uri));
        args.extend(
            ["-i", uri, "-an", "-pix_fmt", "bgr24", "-f", "rawvideo", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    fn spawn_decoder(&self, uri: &str) -> Result<(Child, ChildStdout), SourceError> {
        let mut child = Command::new(FFMPEG)
            .args(self.decoder_args(uri))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                program: FFMPEG,
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Io(std::io::Error::other("ffmpeg stdout not captured")))?;
        Ok((child, stdout))
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.child.kill();
            let _ = stream.child.wait();
        }
    }
}

impl VideoSource for FfmpegSource {
    fn open(&mut self, uri: &str) -> Result<(), SourceError> {
        self.close();

        if !is_network(uri) && !Path::new(uri).exists() {
            return Err(SourceError::NotFound(uri.to_string()));
        }

        let (width, height) = self.probe(uri)?;
        let (child, stdout) = self.spawn_decoder(uri)?;

        tracing::info!(uri, width, height, "Video source opened");

        self.stream = Some(Stream {
            child,
            stdout,
            width,
            height,
        });
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let stream = self.stream.as_mut().ok_or(SourceError::NotOpen)?;

        let (width, height) = (stream.width, stream.height);
        let mut data = vec![0u8; (width * height * CHANNELS) as usize];

        match stream.stdout.read_exact(&mut data) {
            Ok(()) => Ok(Some(Frame::bgr(width, height, data))),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                tracing::debug!("Decoder output ended");
                self.close();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_network(uri: &str) -> bool {
    uri.contains("://") && !uri.starts_with("file://")
}

fn parse_probe(json: &[u8]) -> Option<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_slice(json).ok()?;
    probe
        .streams
        .into_iter()
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        })
}

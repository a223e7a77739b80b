use thiserror::Error;

pub mod ffmpeg;

pub use ffmpeg::FfmpegSource;

/// One decoded frame, interleaved 8-bit BGR.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn bgr(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels: 3,
            data,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to probe {uri}: {reason}")]
    Probe { uri: String, reason: String },

    #[error("No video stream in {0}")]
    NoVideoStream(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not open")]
    NotOpen,
}

/// Lazy frame sequence from a live stream or file.
pub trait VideoSource {
    /// Open `uri`, replacing whatever was open before.
    fn open(&mut self, uri: &str) -> Result<(), SourceError>;

    /// Next frame, or `None` at end of stream.
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = SourceError::Probe {
            uri: "rtsp://cam/live".to_string(),
            reason: "Connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to probe rtsp://cam/live: Connection refused"
        );

        let err = SourceError::NotFound("../data/test_video.mp4".to_string());
        assert_eq!(err.to_string(), "File not found: ../data/test_video.mp4");
    }

    #[test]
    fn test_frame_size() {
        let frame = Frame::bgr(4, 2, vec![0; 24]);
        assert_eq!(frame.size(), (4, 2));
        assert_eq!(frame.channels, 3);
    }
}

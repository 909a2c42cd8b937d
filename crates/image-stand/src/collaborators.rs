//! Outbound collaborators of a round: image generation and transcription.
//!
//! Implementations live outside this crate; the round workflow only sees
//! these traits.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{StandError, StandResult};

/// Output aspect ratio accepted by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    #[default]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Ultrawide,
    #[serde(rename = "auto")]
    Auto,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 11] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Ultrawide,
        AspectRatio::Auto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Ultrawide => "21:9",
            AspectRatio::Auto => "auto",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| StandError::InvalidInput(format!("unknown aspect ratio '{s}'")))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1K")]
    #[default]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::OneK => "1K",
            Resolution::TwoK => "2K",
            Resolution::FourK => "4K",
        }
    }
}

impl FromStr for Resolution {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "1K" => Ok(Resolution::OneK),
            "2K" => Ok(Resolution::TwoK),
            "4K" => Ok(Resolution::FourK),
            _ => Err(StandError::InvalidInput(format!("unknown resolution '{s}'"))),
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            _ => Err(StandError::InvalidInput(format!("unknown output format '{s}'"))),
        }
    }
}

/// Options fixed for the lifetime of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// One call to the image generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Provider reference of a prior image to edit. `None` means a fresh
    /// generation.
    pub reference: Option<String>,
    pub options: GenerationOptions,
}

/// Image bytes returned by a generator.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// Provider-side reference (e.g. the result URL) for later edits.
    pub provider_ref: Option<String>,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Turn a prompt (optionally anchored to a prior image) into image bytes.
    async fn generate(&self, request: &GenerationRequest) -> StandResult<GeneratedImage>;
}

/// Audio container types accepted for transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioMime {
    #[serde(rename = "audio/webm")]
    Webm,
    #[serde(rename = "audio/wav")]
    Wav,
    #[serde(rename = "audio/mpeg")]
    Mpeg,
    #[serde(rename = "audio/ogg")]
    Ogg,
    #[serde(rename = "audio/mp4")]
    Mp4,
    #[serde(rename = "audio/flac")]
    Flac,
}

impl AudioMime {
    pub const ALL: [AudioMime; 6] = [
        AudioMime::Webm,
        AudioMime::Wav,
        AudioMime::Mpeg,
        AudioMime::Ogg,
        AudioMime::Mp4,
        AudioMime::Flac,
    ];

    /// Parse a MIME string, ignoring parameters such as `;codecs=opus`.
    pub fn parse(mime: &str) -> StandResult<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        AudioMime::ALL
            .into_iter()
            .find(|m| m.as_str() == essence)
            .ok_or_else(|| StandError::UnsupportedMimeType(mime.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMime::Webm => "audio/webm",
            AudioMime::Wav => "audio/wav",
            AudioMime::Mpeg => "audio/mpeg",
            AudioMime::Ogg => "audio/ogg",
            AudioMime::Mp4 => "audio/mp4",
            AudioMime::Flac => "audio/flac",
        }
    }

    /// Short format name used by chat-completion audio inputs.
    pub fn format(&self) -> &'static str {
        match self {
            AudioMime::Webm => "webm",
            AudioMime::Wav => "wav",
            AudioMime::Mpeg => "mp3",
            AudioMime::Ogg => "ogg",
            AudioMime::Mp4 => "mp4",
            AudioMime::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Turn recorded speech into text. An empty result is allowed here;
    /// the round rejects it as an empty prompt.
    async fn transcribe(&self, audio: &[u8], mime: AudioMime) -> StandResult<String>;
}

//! Provider-agnostic speech-to-text types.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{LlmError, Result};

/// Audio container formats accepted for transcription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// WAV format
    #[default]
    Wav,
    /// MP3 format
    Mp3,
    /// FLAC format
    Flac,
    /// OGG format
    Ogg,
    /// WebM format
    WebM,
    /// M4A format
    M4a,
    /// Opus format
    Opus,
    /// AAC format
    Aac,
}

impl AudioFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::WebM => "webm",
            Self::M4a => "m4a",
            Self::Opus => "opus",
            Self::Aac => "aac",
        }
    }

    /// MIME type for this format.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::WebM => "audio/webm",
            Self::M4a => "audio/mp4",
            Self::Opus => "audio/opus",
            Self::Aac => "audio/aac",
        }
    }

    /// Parses a format from a file extension (case-insensitive).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "ogg" => Some(Self::Ogg),
            "webm" => Some(Self::WebM),
            "m4a" => Some(Self::M4a),
            "opus" => Some(Self::Opus),
            "aac" => Some(Self::Aac),
            _ => None,
        }
    }
}

/// A transcription request.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Model to use (e.g. "whisper-1").
    pub model: String,
    /// Audio data to transcribe.
    pub audio: Vec<u8>,
    /// Audio container format.
    pub format: AudioFormat,
    /// Optional language hint (ISO 639-1, e.g. "ko").
    pub language: Option<String>,
}

impl TranscriptionRequest {
    /// Creates a new transcription request.
    #[must_use]
    pub fn new(model: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            model: model.into(),
            audio,
            format: AudioFormat::default(),
            language: None,
        }
    }

    /// Sets the audio format.
    #[must_use]
    pub const fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the language hint.
    #[must_use]
    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }
}

/// A transcription result.
#[derive(Debug, Clone)]
pub struct TranscriptionResponse {
    /// Transcript text.
    pub text: String,
}

impl TranscriptionResponse {
    /// Creates a response from transcript text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A speech-to-text backend.
#[async_trait]
pub trait SpeechToTextProvider: Send + Sync {
    /// Transcribes audio data to text.
    ///
    /// # Errors
    ///
    /// Returns a provider error when the backend call fails.
    async fn transcribe(&self, request: &TranscriptionRequest) -> Result<TranscriptionResponse>;

    /// Reads an audio file and transcribes it, detecting the format from
    /// the file extension (defaults to WAV when it cannot be detected).
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or the backend call fails.
    async fn transcribe_file(
        &self,
        model: &str,
        path: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResponse> {
        let audio = std::fs::read(path)
            .map_err(|e| LlmError::internal(format!("Failed to read audio file: {e}")))?;

        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AudioFormat::from_extension)
            .unwrap_or_default();

        let mut request = TranscriptionRequest::new(model, audio).format(format);
        if let Some(lang) = language {
            request = request.language(lang);
        }
        self.transcribe(&request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    mod audio_format {
        use super::*;

        #[test]
        fn from_extension_parses_valid_extensions() {
            for (ext, expected) in [
                ("wav", AudioFormat::Wav),
                ("mp3", AudioFormat::Mp3),
                ("webm", AudioFormat::WebM),
                ("m4a", AudioFormat::M4a),
            ] {
                assert_eq!(AudioFormat::from_extension(ext), Some(expected));
            }
        }

        #[test]
        fn from_extension_is_case_insensitive() {
            assert_eq!(AudioFormat::from_extension("WAV"), Some(AudioFormat::Wav));
            assert_eq!(AudioFormat::from_extension("Mp3"), Some(AudioFormat::Mp3));
        }

        #[test]
        fn from_extension_rejects_unknown() {
            assert_eq!(AudioFormat::from_extension("txt"), None);
            assert_eq!(AudioFormat::from_extension(""), None);
        }

        #[test]
        fn extension_roundtrips() {
            for format in [
                AudioFormat::Wav,
                AudioFormat::Mp3,
                AudioFormat::Flac,
                AudioFormat::Ogg,
                AudioFormat::WebM,
                AudioFormat::M4a,
                AudioFormat::Opus,
                AudioFormat::Aac,
            ] {
                assert_eq!(AudioFormat::from_extension(format.extension()), Some(format));
            }
        }
    }

    mod transcription_request {
        use super::*;

        #[test]
        fn builder_sets_fields() {
            let request = TranscriptionRequest::new("whisper-1", vec![1, 2, 3])
                .format(AudioFormat::Mp3)
                .language("ko");

            assert_eq!(request.model, "whisper-1");
            assert_eq!(request.audio, vec![1, 2, 3]);
            assert_eq!(request.format, AudioFormat::Mp3);
            assert_eq!(request.language.as_deref(), Some("ko"));
        }

        #[test]
        fn defaults_to_wav_without_language() {
            let request = TranscriptionRequest::new("whisper-1", Vec::new());
            assert_eq!(request.format, AudioFormat::Wav);
            assert!(request.language.is_none());
        }
    }
}

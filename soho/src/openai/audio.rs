//! OpenAI Whisper transcription (speech-to-text).

use async_trait::async_trait;

use crate::audio::{SpeechToTextProvider, TranscriptionRequest, TranscriptionResponse};
use crate::error::{LlmError, Result};

use super::client::OpenAi;

#[async_trait]
impl SpeechToTextProvider for OpenAi {
    async fn transcribe(&self, request: &TranscriptionRequest) -> Result<TranscriptionResponse> {
        let url = self.transcriptions_url();

        let filename = format!("audio.{}", request.format.extension());

        let file_part = reqwest::multipart::Part::bytes(request.audio.clone())
            .file_name(filename)
            .mime_str(request.format.mime_type())
            .map_err(|e| LlmError::internal(format!("Invalid MIME type: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .text("model", request.model.clone())
            .text("response_format", "text")
            .part("file", file_part);

        if let Some(ref lang) = request.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .build_multipart_request(&url)
            .multipart(form)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        // response_format=text returns the bare transcript.
        let text = response.text().await.map_err(LlmError::from)?;
        Ok(TranscriptionResponse::new(text.trim()))
    }
}

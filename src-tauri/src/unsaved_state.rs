use percent_encoding::percent_decode_str;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum UnsavedStateError {
    #[error("unsaved-state payload is not valid UTF-8 after decoding")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("unsaved-state payload is not a JSON string array: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsaved-state descriptor needs a message and at least one button label")]
    MissingButtons,
}

/// Prompt shown when the user closes the window with unsaved work: a message
/// followed by the button labels, in the order the front-end sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnsavedStateDescriptor {
    message: String,
    buttons: Vec<String>,
}

impl UnsavedStateDescriptor {
    pub(crate) fn new(message: String, buttons: Vec<String>) -> Result<Self, UnsavedStateError> {
        if message.is_empty() || buttons.is_empty() {
            return Err(UnsavedStateError::MissingButtons);
        }
        Ok(Self { message, buttons })
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    #[cfg(test)]
    pub(crate) fn buttons(&self) -> &[String] {
        &self.buttons
    }

    pub(crate) fn button(&self, index: usize) -> Option<&str> {
        self.buttons.get(index).map(String::as_str)
    }

    /// Message plus buttons, matching the array the front-end sent.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        1 + self.buttons.len()
    }
}

/// Decodes the text following `SETUNSAVED=`.
///
/// `Ok(None)` means the front-end cleared its unsaved state (empty array or
/// empty message).
pub(crate) fn parse_unsaved_payload(
    encoded: &str,
) -> Result<Option<UnsavedStateDescriptor>, UnsavedStateError> {
    let decoded = percent_decode_str(encoded).decode_utf8()?;
    let mut entries: Vec<String> = serde_json::from_str(&decoded)?;
    if entries.first().is_none_or(|message| message.is_empty()) {
        return Ok(None);
    }

    let message = entries.remove(0);
    UnsavedStateDescriptor::new(message, entries).map(Some)
}

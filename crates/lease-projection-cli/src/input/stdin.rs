use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialise a document piped on stdin.
/// Returns None when stdin is a TTY or carries nothing.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_document(trimmed).map(Some)
}

/// JSON first, then YAML.
fn parse_document<T: DeserializeOwned>(text: &str) -> Result<T, Box<dyn std::error::Error>> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            log::debug!("stdin is not JSON ({json_err}), trying YAML");
            serde_yaml::from_str(text)
                .map_err(|e| format!("stdin is neither JSON ({json_err}) nor YAML ({e})").into())
        }
    }
}

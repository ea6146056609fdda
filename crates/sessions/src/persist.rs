//! Shutdown persistence: writes a session's conversation history to a
//! timestamped JSON artifact for post-mortem inspection.

use aura_domain::error::{Error, Result};
use aura_domain::message::Message;
use chrono::Utc;
use std::fs;
use std::path::Path;

use crate::kind::SessionKind;

/// `chat_history_session{id}_{kind}_{YYYYMMDD_HHMMSS}.json`.
pub fn write_history(dir: &Path, session_id: u64, kind: &SessionKind, history: &[Message]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("chat_history_session{session_id}_{}_{timestamp}.json", kind.label());
    let path = dir.join(filename);
    let json = serde_json::to_vec_pretty(history)?;
    fs::write(&path, json).map_err(|e| Error::Other(format!("writing {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_history_produces_expected_filename_prefix() {
        let dir = std::env::temp_dir().join(format!("aura-persist-test-{}", std::process::id()));
        let history = vec![Message::system("hi"), Message::user("hello")];
        write_history(&dir, 7, &SessionKind::Web, &history).unwrap();

        let mut found = false;
        for entry in fs::read_dir(&dir).unwrap() {
            let name = entry.unwrap().file_name().into_string().unwrap();
            if name.starts_with("chat_history_session7_web_") && name.ends_with(".json") {
                found = true;
            }
        }
        assert!(found);
        let _ = fs::remove_dir_all(&dir);
    }
}

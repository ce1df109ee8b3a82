//! JSON export of the current inference result.

use crate::error::ClientError;
use crate::model::ResultSnapshot;
use std::path::{Path, PathBuf};

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// File name used when the user exports without choosing a path.
///
/// The session id comes from the backend, so only ASCII alphanumerics and `-`
/// make it into the name.
pub fn default_file_name(snapshot: &ResultSnapshot) -> String {
    let prefix: String = snapshot
        .session_id
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(8)
        .collect();
    let session = if prefix.is_empty() { "nosession" } else { prefix.as_str() };
    format!(
        "graphcare-{}-{}.json",
        snapshot.exported_at_utc.replace(':', "-").replace('T', "_"),
        session
    )
}

pub fn export_json(path: &Path, snapshot: &ResultSnapshot) -> Result<(), ClientError> {
    let export_err = |message: String| ClientError::Export {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| export_err(e.to_string()))?;
    }
    let body = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, body).map_err(|e| export_err(e.to_string()))?;
    Ok(())
}

/// Export into `dir` under the default name and return the absolute path.
pub fn export_json_into(dir: &Path, snapshot: &ResultSnapshot) -> Result<PathBuf, ClientError> {
    let path = dir.join(default_file_name(snapshot));
    export_json(&path, snapshot)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InferenceResult, RecommendedMeasure};

    fn snapshot() -> ResultSnapshot {
        ResultSnapshot {
            exported_at_utc: "2026-10-16T08:30:00Z".into(),
            session_id: Some("1f0c2a9e-77aa-4c1b".into()),
            source_file: Some("patient.json".into()),
            notes: vec!["lactate 3.1".into()],
            result: InferenceResult {
                probability: 0.42,
                recommended: vec![RecommendedMeasure {
                    measure: "A".into(),
                    reason: "x".into(),
                }],
                similar_cases: Vec::new(),
                labels: Vec::new(),
            },
        }
    }

    #[test]
    fn default_name_uses_timestamp_and_session_prefix() {
        assert_eq!(
            default_file_name(&snapshot()),
            "graphcare-2026-10-16_08-30-00Z-1f0c2a9e.json"
        );
    }

    #[test]
    fn default_name_survives_non_ascii_session_id() {
        let mut snap = snapshot();
        snap.session_id = Some("会话标识符".into());
        assert_eq!(
            default_file_name(&snap),
            "graphcare-2026-10-16_08-30-00Z-nosession.json"
        );
        snap.session_id = Some("会话-ab12cd34ef".into());
        assert_eq!(
            default_file_name(&snap),
            "graphcare-2026-10-16_08-30-00Z--ab12cd3.json"
        );
    }

    #[test]
    fn default_name_never_contains_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let mut snap = snapshot();
        snap.session_id = Some("ab/cd/ef-123".into());
        let name = default_file_name(&snap);
        assert_eq!(name, "graphcare-2026-10-16_08-30-00Z-abcdef-1.json");

        let path = export_json_into(dir.path(), &snap).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.is_file());
    }

    #[test]
    fn export_writes_readable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_json_into(&dir.path().join("nested"), &snapshot()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let back: ResultSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.session_id.as_deref(), Some("1f0c2a9e-77aa-4c1b"));
        assert_eq!(back.notes, vec!["lactate 3.1".to_string()]);
        assert_eq!(back.result.recommended[0].measure, "A");
    }
}

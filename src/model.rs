use crate::error::{ClientError, ValidationError};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub max_file_size: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            user_agent: format!("graphcare-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Which half of the screen is active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Uploading,
    Reviewing,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Uploading => f.write_str("uploading"),
            View::Reviewing => f.write_str("reviewing"),
        }
    }
}

/// User-triggered request kinds. Each kind has its own in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Upload,
    Augment,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Upload => f.write_str("upload"),
            Action::Augment => f.write_str("augmentation"),
        }
    }
}

/// A file chosen for upload. `bytes` is reference counted so a retry after a
/// failed upload does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name);
        Self {
            name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, enforcing the configured size bound.
    pub async fn load(path: &Path, max_size: u64) -> Result<Self, ClientError> {
        let read_err = |source| ClientError::ReadFile {
            path: path.to_path_buf(),
            source,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let meta = tokio::fs::metadata(path).await.map_err(read_err)?;
        if meta.len() > max_size {
            return Err(ValidationError::FileTooLarge {
                name,
                size: meta.len(),
                limit: max_size,
            }
            .into());
        }
        let data = tokio::fs::read(path).await.map_err(read_err)?;
        if data.is_empty() {
            return Err(ValidationError::EmptyFile { name }.into());
        }
        Ok(Self::new(name, data))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// The backend only accepts JSON-ish content types for uploads.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<String>,
    /// Augmentation notes accepted by the backend, oldest first.
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedMeasure {
    pub measure: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub measure: String,
    pub frequency: f64,
}

impl SimilarCase {
    /// Bar width in percent of the track.
    pub fn width_percent(&self) -> u16 {
        if !self.frequency.is_finite() {
            return 0;
        }
        (self.frequency * 100.0).round().clamp(0.0, 100.0) as u16
    }
}

/// Raw model output some backends attach for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLabel {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub probability: f64,
    pub recommended: Vec<RecommendedMeasure>,
    pub similar_cases: Vec<SimilarCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<ModelLabel>,
}

/// Wire shape shared by the upload, augment and demo endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    pub probability: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommended: Vec<RecommendedMeasure>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub similar_cases: Vec<SimilarCase>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<ModelLabel>,
}

impl InferResponse {
    pub fn into_parts(self) -> (Option<String>, InferenceResult) {
        let session_id = self.session_id.filter(|s| !s.trim().is_empty());
        (
            session_id,
            InferenceResult {
                probability: self.probability,
                recommended: self.recommended,
                similar_cases: self.similar_cases,
                labels: self.labels,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentRequest {
    pub session_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Display values for the probability gauge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeReading {
    pub probability: f64,
    pub percent: i64,
    pub angle_deg: u16,
}

impl GaugeReading {
    pub fn from_probability(p: f64) -> Self {
        if !p.is_finite() {
            return Self::empty();
        }
        Self {
            probability: p,
            percent: (p * 100.0).round() as i64,
            angle_deg: (p * 360.0).round().clamp(0.0, 360.0) as u16,
        }
    }

    pub fn empty() -> Self {
        Self {
            probability: 0.0,
            percent: 0,
            angle_deg: 0,
        }
    }
}

/// Exported form of the current result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub exported_at_utc: String,
    pub session_id: Option<String>,
    pub source_file: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub result: InferenceResult,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_matches_rounding_rules_across_unit_interval() {
        for i in 0..=1000 {
            let p = f64::from(i) / 1000.0;
            let g = GaugeReading::from_probability(p);
            assert_eq!(g.percent, (p * 100.0).round() as i64, "p={p}");
            assert_eq!(
                g.angle_deg,
                (p * 360.0).round().clamp(0.0, 360.0) as u16,
                "p={p}"
            );
            assert!(g.angle_deg <= 360);
        }
    }

    #[test]
    fn gauge_clamps_angle_outside_unit_interval() {
        assert_eq!(GaugeReading::from_probability(1.4).angle_deg, 360);
        assert_eq!(GaugeReading::from_probability(-0.2).angle_deg, 0);
        assert_eq!(GaugeReading::from_probability(f64::NAN), GaugeReading::empty());
        let g = GaugeReading::from_probability(0.73);
        assert_eq!(g.percent, 73);
        assert_eq!(g.angle_deg, 263);
    }

    #[test]
    fn bar_width_is_clamped_percentage() {
        let bar = |frequency| SimilarCase {
            measure: "x".into(),
            frequency,
        };
        assert_eq!(bar(0.4).width_percent(), 40);
        assert_eq!(bar(0.125).width_percent(), 13);
        assert_eq!(bar(1.7).width_percent(), 100);
        assert_eq!(bar(-0.1).width_percent(), 0);
        assert_eq!(bar(f64::INFINITY).width_percent(), 0);
    }

    #[test]
    fn response_tolerates_null_lists_and_reasons() {
        let raw = r#"{
            "session_id": "s1",
            "probability": 0.5,
            "recommended": [{"measure": "A", "reason": null}, {"measure": "B"}],
            "similar_cases": null,
            "labels": null
        }"#;
        let resp: InferResponse = serde_json::from_str(raw).unwrap();
        let (session, result) = resp.into_parts();
        assert_eq!(session.as_deref(), Some("s1"));
        assert_eq!(result.recommended.len(), 2);
        assert_eq!(result.recommended[0].reason, "");
        assert_eq!(result.recommended[1].reason, "");
        assert!(result.similar_cases.is_empty());
        assert!(result.labels.is_empty());
    }

    #[test]
    fn blank_session_id_is_treated_as_missing() {
        let resp: InferResponse =
            serde_json::from_str(r#"{"session_id": "  ", "probability": 0.1}"#).unwrap();
        assert_eq!(resp.into_parts().0, None);
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("patient.JSON"), "application/json");
        assert_eq!(content_type_for("report.pdf"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn load_rejects_oversized_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.json");
        std::fs::write(&big, vec![b'x'; 64]).unwrap();
        let err = SelectedFile::load(&big, 16).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::FileTooLarge { size: 64, limit: 16, .. })
        ));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, b"").unwrap();
        let err = SelectedFile::load(&empty, 16).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::EmptyFile { .. })
        ));

        let ok = dir.path().join("patient.json");
        std::fs::write(&ok, br#"{"vitals":{}}"#).unwrap();
        let file = SelectedFile::load(&ok, 1024).await.unwrap();
        assert_eq!(file.name, "patient.json");
        assert_eq!(file.content_type, "application/json");
        assert_eq!(file.size(), 13);
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let err = SelectedFile::load(Path::new("/nonexistent/graphcare/p.json"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ReadFile { .. }));
    }
}

//! Stage catalogue and pipeline phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the fixed document pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Allocate a run identifier on the server.
    Initialize,
    /// Upload the document and fetch it back.
    Upload,
    /// Optical character recognition.
    Ocr,
    /// PII redaction of the OCR text.
    Redact,
    /// Disease extraction from the redacted text.
    Extract,
    /// Disease to ICD code mapping.
    MapCodes,
    /// Completion of partial ICD codes.
    FillCodes,
    /// ICD to HCC risk category mapping.
    MapRisk,
    /// Paginated medical note assembly.
    Paginate,
}

impl PipelineStage {
    /// Every stage, in execution order.
    pub const ALL: [Self; 9] = [
        Self::Initialize,
        Self::Upload,
        Self::Ocr,
        Self::Redact,
        Self::Extract,
        Self::MapCodes,
        Self::FillCodes,
        Self::MapRisk,
        Self::Paginate,
    ];

    /// Highest progress marker, published once the last stage completes.
    pub const MAX_PROGRESS: u8 = 8;

    /// Progress marker value published once this stage has completed.
    ///
    /// Upload shares the first marker with run initialization; every later
    /// stage advances it by one.
    #[must_use]
    pub fn progress_index(self) -> u8 {
        match self {
            Self::Initialize | Self::Upload => 1,
            Self::Ocr => 2,
            Self::Redact => 3,
            Self::Extract => 4,
            Self::MapCodes => 5,
            Self::FillCodes => 6,
            Self::MapRisk => 7,
            Self::Paginate => 8,
        }
    }

    /// The stage that runs after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self as usize + 1).copied()
    }

    /// Machine name used in events and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize_run",
            Self::Upload => "upload",
            Self::Ocr => "ocr",
            Self::Redact => "pii_redaction",
            Self::Extract => "disease_extraction",
            Self::MapCodes => "icd_mapping",
            Self::FillCodes => "fill_icd_codes",
            Self::MapRisk => "hcc_mapping",
            Self::Paginate => "paginated_medical_notes",
        }
    }

    /// Human label for progress displays.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Initialize => "Initializing run",
            Self::Upload => "Uploading document",
            Self::Ocr => "Running OCR",
            Self::Redact => "Redacting PII",
            Self::Extract => "Extracting diseases",
            Self::MapCodes => "Mapping ICD codes",
            Self::FillCodes => "Filling ICD codes",
            Self::MapRisk => "Mapping HCC categories",
            Self::Paginate => "Assembling medical notes",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a pipeline execution currently is.
///
/// `Idle` is initial. `Done` and `Failed` are terminal and mutually
/// exclusive; `Failed` is reachable from every other non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "stage")]
pub enum PipelinePhase {
    /// Nothing has started.
    Idle,
    /// A stage call is in flight.
    Running(PipelineStage),
    /// Every stage completed.
    Done,
    /// A stage failed; the execution is over.
    Failed,
}

impl Default for PipelinePhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl PipelinePhase {
    /// Returns true if no further transitions are accepted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (*self, next) {
            (Self::Done | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Idle, Self::Running(PipelineStage::Initialize)) => true,
            (Self::Running(current), Self::Running(following)) => current.next() == Some(following),
            (Self::Running(PipelineStage::Paginate), Self::Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running(PipelineStage::Initialize) => write!(f, "initializing"),
            Self::Running(PipelineStage::Upload) => write!(f, "uploading"),
            Self::Running(stage) => write!(f, "stage[{stage}]"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_indices() {
        let indices: Vec<u8> = PipelineStage::ALL.iter().map(|s| s.progress_index()).collect();
        assert_eq!(indices, vec![1, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(PipelineStage::Ocr.progress_index(), 2);
        assert_eq!(PipelineStage::FillCodes.progress_index(), 6);
        assert_eq!(PipelineStage::Paginate.progress_index(), PipelineStage::MAX_PROGRESS);
    }

    #[test]
    fn test_next_stage() {
        assert_eq!(PipelineStage::Initialize.next(), Some(PipelineStage::Upload));
        assert_eq!(PipelineStage::FillCodes.next(), Some(PipelineStage::MapRisk));
        assert_eq!(PipelineStage::Paginate.next(), None);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::Redact.to_string(), "pii_redaction");
        assert_eq!(PipelineStage::MapRisk.to_string(), "hcc_mapping");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(PipelinePhase::Idle.to_string(), "idle");
        assert_eq!(PipelinePhase::Running(PipelineStage::Initialize).to_string(), "initializing");
        assert_eq!(PipelinePhase::Running(PipelineStage::Upload).to_string(), "uploading");
        assert_eq!(PipelinePhase::Running(PipelineStage::Ocr).to_string(), "stage[ocr]");
    }

    #[test]
    fn test_phase_transitions() {
        use PipelineStage::*;

        assert!(PipelinePhase::Idle.can_transition_to(PipelinePhase::Running(Initialize)));
        assert!(!PipelinePhase::Idle.can_transition_to(PipelinePhase::Running(Ocr)));
        assert!(PipelinePhase::Running(Upload).can_transition_to(PipelinePhase::Running(Ocr)));
        assert!(!PipelinePhase::Running(Upload).can_transition_to(PipelinePhase::Running(Redact)));
        assert!(!PipelinePhase::Running(Ocr).can_transition_to(PipelinePhase::Running(Upload)));
        assert!(PipelinePhase::Running(Paginate).can_transition_to(PipelinePhase::Done));
        assert!(!PipelinePhase::Running(MapRisk).can_transition_to(PipelinePhase::Done));
        assert!(PipelinePhase::Running(Extract).can_transition_to(PipelinePhase::Failed));
    }

    #[test]
    fn test_terminal_phases_reject_everything() {
        for terminal in [PipelinePhase::Done, PipelinePhase::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(PipelinePhase::Failed));
            assert!(!terminal.can_transition_to(PipelinePhase::Idle));
            assert!(!terminal.can_transition_to(PipelinePhase::Running(PipelineStage::Initialize)));
        }
    }

    #[test]
    fn test_phase_serialize() {
        let json = serde_json::to_string(&PipelinePhase::Running(PipelineStage::Ocr)).unwrap();
        assert_eq!(json, r#"{"phase":"running","stage":"ocr"}"#);

        let idle = serde_json::to_string(&PipelinePhase::Idle).unwrap();
        assert_eq!(idle, r#"{"phase":"idle"}"#);
    }
}

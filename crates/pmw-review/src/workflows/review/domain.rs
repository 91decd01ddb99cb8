use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Backends emit identifiers either as JSON strings or as bare integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

macro_rules! wire_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                Ok(match WireId::deserialize(deserializer)? {
                    WireId::Text(value) => Self(value),
                    WireId::Number(value) => Self(value.to_string()),
                })
            }
        }
    };
}

wire_id!(
    /// Identifier of a distribution record, i.e. one assignment.
    AssignmentId
);
wire_id!(ProposalId);
wire_id!(
    /// Reviewer or judge the assignment belongs to.
    AssigneeId
);
wire_id!(CriterionId);

/// Portal roles that receive assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalRole {
    Reviewer,
    Juri,
}

impl PortalRole {
    pub const fn ordered() -> [Self; 2] {
        [Self::Reviewer, Self::Juri]
    }

    /// Path segment used by the portal API (`/{role}/penugasan`).
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Reviewer => "reviewer",
            Self::Juri => "juri",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Reviewer => "Reviewer",
            Self::Juri => "Juri",
        }
    }

    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Reviewer | Self::Juri => Capabilities::FULL,
        }
    }
}

impl fmt::Display for PortalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for PortalRole {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reviewer" => Ok(Self::Reviewer),
            "juri" | "judge" => Ok(Self::Juri),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// What a role may do with its assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_accept: bool,
    pub can_reject: bool,
    pub can_score: bool,
}

impl Capabilities {
    pub const FULL: Self = Self {
        can_accept: true,
        can_reject: true,
        can_score: true,
    };

    pub const READ_ONLY: Self = Self {
        can_accept: false,
        can_reject: false,
        can_score: false,
    };
}

/// Review stage ordinal ("tahap"): 1 is desk evaluation, 2 is the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReviewStage(u8);

impl ReviewStage {
    pub const DESK_EVALUATION: Self = Self(1);
    pub const INTERVIEW: Self = Self(2);

    pub const fn ordinal(self) -> u8 {
        self.0
    }

    pub fn label(self) -> String {
        match self.0 {
            1 => "Desk Evaluation".to_string(),
            2 => "Interview".to_string(),
            other => format!("Tahap {other}"),
        }
    }
}

impl TryFrom<u8> for ReviewStage {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(DomainError::InvalidStage(value));
        }
        Ok(Self(value))
    }
}

impl From<ReviewStage> for u8 {
    fn from(value: ReviewStage) -> Self {
        value.0
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an assignment, carried on the wire as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AssignmentStatus {
    Pending,
    Accepted,
    Rejected,
    Draft,
    Finalized,
}

impl AssignmentStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Pending,
            Self::Accepted,
            Self::Rejected,
            Self::Draft,
            Self::Finalized,
        ]
    }

    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Accepted => 1,
            Self::Rejected => 2,
            Self::Draft => 3,
            Self::Finalized => 4,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Draft => "draft",
            Self::Finalized => "finalized",
        }
    }

    /// Label shown on the dashboards.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Menunggu Respon",
            Self::Accepted => "Diterima",
            Self::Rejected => "Ditolak",
            Self::Draft => "Draft Penilaian",
            Self::Finalized => "Selesai Dinilai",
        }
    }

    pub const fn tone(self) -> StatusTone {
        match self {
            Self::Pending => StatusTone::Warning,
            Self::Accepted => StatusTone::Info,
            Self::Rejected => StatusTone::Error,
            Self::Draft => StatusTone::Secondary,
            Self::Finalized => StatusTone::Success,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Finalized)
    }

    /// Accepted and Draft both allow scoring.
    pub const fn is_scoring(self) -> bool {
        matches!(self, Self::Accepted | Self::Draft)
    }
}

impl TryFrom<u8> for AssignmentStatus {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ordered()
            .into_iter()
            .find(|status| status.code() == value)
            .ok_or(DomainError::UnknownStatus(value))
    }
}

impl From<AssignmentStatus> for u8 {
    fn from(value: AssignmentStatus) -> Self {
        value.code()
    }
}

impl FromStr for AssignmentStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::try_from(code);
        }
        Self::ordered()
            .into_iter()
            .find(|status| status.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::UnknownStatusLabel(trimmed.to_string()))
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Display colour family for a status chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Warning,
    Info,
    Error,
    Secondary,
    Success,
}

/// Period in which scoring is open. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct EvaluationWindow {
    #[serde(rename = "mulai")]
    start: DateTime<Utc>,
    #[serde(rename = "selesai")]
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    mulai: DateTime<Utc>,
    selesai: DateTime<Utc>,
}

impl TryFrom<RawWindow> for EvaluationWindow {
    type Error = DomainError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.mulai, raw.selesai)
    }
}

impl EvaluationWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRef {
    #[serde(rename = "id_proposal")]
    pub id: ProposalId,
    #[serde(rename = "judul", default)]
    pub title: String,
}

/// A proposal handed to a reviewer or judge ("penugasan").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "id_distribusi")]
    pub id: AssignmentId,
    pub proposal: ProposalRef,
    #[serde(rename = "id_penilai")]
    pub assignee: AssigneeId,
    #[serde(rename = "tahap")]
    pub stage: ReviewStage,
    pub status: AssignmentStatus,
    #[serde(rename = "tanggal_penugasan")]
    pub assigned_at: DateTime<Utc>,
    #[serde(
        rename = "tanggal_respon",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "catatan_penolakan",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rejection_note: Option<String>,
    #[serde(rename = "periode", default, skip_serializing_if = "Option::is_none")]
    pub window: Option<EvaluationWindow>,
    /// Number of score entries the backend holds for this assignment.
    #[serde(rename = "jumlah_nilai", default)]
    pub saved_scores: u32,
}

impl Assignment {
    pub fn pending(
        id: AssignmentId,
        proposal: ProposalRef,
        assignee: AssigneeId,
        stage: ReviewStage,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            proposal,
            assignee,
            stage,
            status: AssignmentStatus::Pending,
            assigned_at,
            responded_at: None,
            rejection_note: None,
            window: None,
            saved_scores: 0,
        }
    }

    pub fn with_window(mut self, window: EvaluationWindow) -> Self {
        self.window = Some(window);
        self
    }
}

/// One weighted line of a scoring rubric ("kriteria").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(rename = "id_kriteria")]
    pub id: CriterionId,
    #[serde(rename = "nama_kriteria")]
    pub name: String,
    #[serde(rename = "deskripsi", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "bobot")]
    pub weight: f64,
    #[serde(rename = "urutan", default)]
    pub order: u32,
}

impl Criterion {
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: f64, order: u32) -> Self {
        Self {
            id: CriterionId::new(id),
            name: name.into(),
            description: None,
            weight,
            order,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Discrete set of raw scores a reviewer may pick ("skala skor").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct ScoreScale(BTreeSet<u32>);

impl TryFrom<Vec<u32>> for ScoreScale {
    type Error = DomainError;

    fn try_from(values: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<ScoreScale> for Vec<u32> {
    fn from(scale: ScoreScale) -> Self {
        scale.0.into_iter().collect()
    }
}

impl ScoreScale {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Result<Self, DomainError> {
        let values: BTreeSet<u32> = values.into_iter().collect();
        if values.is_empty() {
            return Err(DomainError::EmptyScale);
        }
        Ok(Self(values))
    }

    /// The `{1, 3, 5, 7}` scale used by both PMW review stages.
    pub fn standard() -> Self {
        Self([1, 3, 5, 7].into_iter().collect())
    }

    pub fn contains(&self, value: u32) -> bool {
        self.0.contains(&value)
    }

    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn max(&self) -> Option<u32> {
        self.0.iter().next_back().copied()
    }
}

impl fmt::Display for ScoreScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{{{}}}", values.join(", "))
    }
}

/// Raw score for one criterion ("nilai"). `score: None` means not yet filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "id_kriteria")]
    pub criterion: CriterionId,
    #[serde(rename = "skor", default)]
    pub score: Option<u32>,
    #[serde(rename = "catatan", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ScoreEntry {
    pub fn scored(criterion: impl Into<String>, score: u32) -> Self {
        Self {
            criterion: CriterionId::new(criterion),
            score: Some(score),
            note: None,
        }
    }

    pub fn unset(criterion: impl Into<String>) -> Self {
        Self {
            criterion: CriterionId::new(criterion),
            score: None,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    Submitted,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

/// The scoring record of one assignment ("penilaian").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "id_distribusi")]
    pub assignment_id: AssignmentId,
    pub status: ReviewStatus,
    #[serde(
        rename = "tanggal_submit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(rename = "nilai", default)]
    pub entries: Vec<ScoreEntry>,
}

impl ReviewRecord {
    pub fn draft(assignment_id: AssignmentId) -> Self {
        Self {
            assignment_id,
            status: ReviewStatus::Draft,
            submitted_at: None,
            entries: Vec::new(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == ReviewStatus::Submitted
    }

    pub fn scored_entries(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.score.is_some())
            .count()
    }
}

/// Criteria and scale used to score one review stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Rubric {
    stage: ReviewStage,
    criteria: Vec<Criterion>,
    scale: ScoreScale,
}

impl Rubric {
    pub fn new(
        stage: ReviewStage,
        mut criteria: Vec<Criterion>,
        scale: ScoreScale,
    ) -> Result<Self, DomainError> {
        if criteria.is_empty() {
            return Err(DomainError::EmptyRubric(stage));
        }

        let mut seen = HashSet::new();
        for criterion in &criteria {
            if criterion.weight <= 0.0 || !criterion.weight.is_finite() {
                return Err(DomainError::NonPositiveWeight {
                    criterion: criterion.name.clone(),
                    weight: criterion.weight,
                });
            }
            if !seen.insert(criterion.id.clone()) {
                return Err(DomainError::DuplicateCriterion(criterion.id.clone()));
            }
        }

        criteria.sort_by_key(|criterion| criterion.order);

        Ok(Self {
            stage,
            criteria,
            scale,
        })
    }

    pub fn stage(&self) -> ReviewStage {
        self.stage
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn scale(&self) -> &ScoreScale {
        &self.scale
    }

    pub fn criterion(&self, id: &CriterionId) -> Option<&Criterion> {
        self.criteria.iter().find(|criterion| &criterion.id == id)
    }

    /// Highest total a fully scored sheet can reach.
    pub fn max_total(&self) -> f64 {
        let top = self.scale.max().unwrap_or(0) as f64;
        self.criteria
            .iter()
            .map(|criterion| criterion.weight * top)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("unknown assignment status code {0}")]
    UnknownStatus(u8),
    #[error("unknown assignment status '{0}'")]
    UnknownStatusLabel(String),
    #[error("unknown portal role '{0}'")]
    UnknownRole(String),
    #[error("review stage must be at least 1, got {0}")]
    InvalidStage(u8),
    #[error("evaluation window starts at {start} after it ends at {end}")]
    InvertedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("score scale must contain at least one value")]
    EmptyScale,
    #[error("rubric for stage {0} has no criteria")]
    EmptyRubric(ReviewStage),
    #[error("criterion '{criterion}' has non-positive weight {weight}")]
    NonPositiveWeight { criterion: String, weight: f64 },
    #[error("criterion {0} appears more than once")]
    DuplicateCriterion(CriterionId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn wire_ids_accept_numbers_and_strings() {
        let numeric: AssignmentId = serde_json::from_value(json!(42)).expect("number");
        let text: AssignmentId = serde_json::from_value(json!("42")).expect("string");
        assert_eq!(numeric, text);
        assert_eq!(serde_json::to_value(&numeric).expect("serializes"), json!("42"));
    }

    #[test]
    fn status_codes_and_keys_parse() {
        assert_eq!(AssignmentStatus::try_from(3), Ok(AssignmentStatus::Draft));
        assert_eq!(
            AssignmentStatus::try_from(7),
            Err(DomainError::UnknownStatus(7))
        );
        assert_eq!(
            "Finalized".parse::<AssignmentStatus>(),
            Ok(AssignmentStatus::Finalized)
        );
        assert_eq!("1".parse::<AssignmentStatus>(), Ok(AssignmentStatus::Accepted));
        assert!("unknown".parse::<AssignmentStatus>().is_err());
        assert_eq!(AssignmentStatus::Pending.tone(), StatusTone::Warning);
    }

    #[test]
    fn roles_parse_with_judge_alias() {
        assert_eq!(" Juri ".parse::<PortalRole>(), Ok(PortalRole::Juri));
        assert_eq!("judge".parse::<PortalRole>(), Ok(PortalRole::Juri));
        assert_eq!(
            "admin".parse::<PortalRole>(),
            Err(DomainError::UnknownRole("admin".to_string()))
        );
    }

    #[test]
    fn stage_zero_is_invalid() {
        assert_eq!(ReviewStage::try_from(0), Err(DomainError::InvalidStage(0)));
        assert!(serde_json::from_value::<ReviewStage>(json!(0)).is_err());
        assert_eq!(ReviewStage::INTERVIEW.label(), "Interview");
    }

    #[test]
    fn empty_scale_is_refused_on_the_wire() {
        assert!(serde_json::from_value::<ScoreScale>(json!([])).is_err());
        let scale: ScoreScale = serde_json::from_value(json!([5, 1, 3])).expect("scale");
        assert_eq!(scale.to_string(), "{1, 3, 5}");
        assert_eq!(serde_json::to_value(&scale).expect("serializes"), json!([1, 3, 5]));
    }

    #[test]
    fn rubric_validates_and_orders_criteria() {
        let rubric = Rubric::new(
            ReviewStage::DESK_EVALUATION,
            vec![
                Criterion::new("B", "Pasar", 1.5, 2),
                Criterion::new("A", "Inovasi", 2.0, 1),
            ],
            ScoreScale::standard(),
        )
        .expect("valid");
        assert_eq!(rubric.criteria()[0].id.as_str(), "A");
        assert_eq!(rubric.max_total(), 24.5);

        assert_eq!(
            Rubric::new(ReviewStage::INTERVIEW, Vec::new(), ScoreScale::standard()),
            Err(DomainError::EmptyRubric(ReviewStage::INTERVIEW))
        );
        assert!(matches!(
            Rubric::new(
                ReviewStage::INTERVIEW,
                vec![Criterion::new("A", "A", 0.0, 1)],
                ScoreScale::standard()
            ),
            Err(DomainError::NonPositiveWeight { .. })
        ));
        assert!(matches!(
            Rubric::new(
                ReviewStage::INTERVIEW,
                vec![Criterion::new("A", "A", 1.0, 1), Criterion::new("A", "B", 1.0, 2)],
                ScoreScale::standard()
            ),
            Err(DomainError::DuplicateCriterion(_))
        ));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(10);
        let window = EvaluationWindow::new(start, end).expect("ordered");
        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(end + Duration::seconds(1)));
        assert!(EvaluationWindow::new(end, start).is_err());
    }
}

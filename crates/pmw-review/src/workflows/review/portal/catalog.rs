use std::collections::BTreeMap;

use crate::workflows::review::domain::{Criterion, DomainError, ReviewStage, Rubric, ScoreScale};

/// Rubrics served by the reference portal, one per review stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricCatalog {
    rubrics: BTreeMap<ReviewStage, Rubric>,
}

impl RubricCatalog {
    pub fn new(rubrics: impl IntoIterator<Item = Rubric>) -> Self {
        Self {
            rubrics: rubrics
                .into_iter()
                .map(|rubric| (rubric.stage(), rubric))
                .collect(),
        }
    }

    /// Desk evaluation and interview rubrics on the 1/3/5/7 scale.
    pub fn standard() -> Result<Self, DomainError> {
        let desk = Rubric::new(
            ReviewStage::DESK_EVALUATION,
            vec![
                Criterion::new("1", "Inovasi Produk", 3.0, 1)
                    .with_description("Kebaruan produk atau jasa dibanding yang sudah ada"),
                Criterion::new("2", "Potensi Pasar", 2.5, 2)
                    .with_description("Ukuran dan kejelasan segmen pasar sasaran"),
                Criterion::new("3", "Model Bisnis", 2.0, 3),
                Criterion::new("4", "Kelayakan Finansial", 1.5, 4)
                    .with_description("Rencana anggaran dan proyeksi arus kas"),
                Criterion::new("5", "Kapasitas Tim", 1.0, 5),
            ],
            ScoreScale::standard(),
        )?;

        let interview = Rubric::new(
            ReviewStage::INTERVIEW,
            vec![
                Criterion::new("6", "Penguasaan Bisnis", 3.0, 1),
                Criterion::new("7", "Kemampuan Presentasi", 2.0, 2),
                Criterion::new("8", "Komitmen Tim", 2.0, 3),
                Criterion::new("9", "Kesiapan Implementasi", 3.0, 4)
                    .with_description("Rencana kerja dan kesiapan sumber daya"),
            ],
            ScoreScale::standard(),
        )?;

        Ok(Self::new([desk, interview]))
    }

    pub fn rubric(&self, stage: ReviewStage) -> Option<&Rubric> {
        self.rubrics.get(&stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = ReviewStage> + '_ {
        self.rubrics.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_both_stages() {
        let catalog = RubricCatalog::standard().expect("standard rubrics are valid");
        let stages: Vec<u8> = catalog.stages().map(ReviewStage::ordinal).collect();
        assert_eq!(stages, vec![1, 2]);

        let desk = catalog
            .rubric(ReviewStage::DESK_EVALUATION)
            .expect("desk rubric");
        assert_eq!(desk.criteria().len(), 5);
        assert_eq!(desk.max_total(), 70.0);

        let interview = catalog.rubric(ReviewStage::INTERVIEW).expect("interview");
        assert_eq!(interview.max_total(), 70.0);
    }

    #[test]
    fn unknown_stage_has_no_rubric() {
        let catalog = RubricCatalog::standard().expect("valid");
        let third = ReviewStage::try_from(3).expect("valid ordinal");
        assert!(catalog.rubric(third).is_none());
    }
}

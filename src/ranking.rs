//! Ranking
//!
//! Valid (exactly one-hot) candidates ordered by total impact. Ties keep the order in
//! which candidates were produced, so the first enumerated candidate wins.

use smallvec::SmallVec;

use crate::{
    costs::ImpactTable,
    encoding::{OneHotModel, coefficient},
    levels::RebateLevel,
    solvers::{SolverError, exhaustive::SampleSet},
};

/// A valid rebate level and its total impact in millions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedLevel {
    /// Rebate level offered
    pub level: RebateLevel,

    /// Total impact (energy of the one-hot assignment)
    pub impact: f64,
}

/// Valid levels ascending by impact. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    entries: SmallVec<[RankedLevel; 10]>,
}

impl Ranking {
    /// Rank every one-hot sample of `model`. Samples with zero or several active
    /// variables are dropped whatever their energy.
    ///
    /// # Errors
    ///
    /// - [`SolverError::NoFeasibleAssignment`]: no sample is one-hot.
    /// - [`SolverError::InvariantViolation`]: a sample activates a variable the model
    ///   does not know.
    pub fn from_samples(samples: &SampleSet, model: &OneHotModel) -> Result<Self, SolverError> {
        let entries = samples
            .iter()
            .filter_map(|sample| sample.one_hot_index().map(|index| (index, sample.energy)))
            .map(|(index, energy)| -> Result<RankedLevel, SolverError> {
                let level = model
                    .level_at(index)
                    .ok_or(SolverError::InvariantViolation {
                        message: "sample activates a variable outside the model",
                    })?;

                Ok(RankedLevel {
                    level,
                    impact: energy,
                })
            })
            .collect::<Result<SmallVec<_>, SolverError>>()?;

        Self::from_entries(entries)
    }

    /// Rank the levels of an impact table directly.
    ///
    /// # Errors
    ///
    /// - [`SolverError::NoFeasibleAssignment`]: the table is empty.
    /// - [`SolverError::Encode`]: an impact does not fit an `f64`.
    pub fn from_impacts(impacts: &ImpactTable) -> Result<Self, SolverError> {
        let entries = impacts
            .iter()
            .map(|row| -> Result<RankedLevel, SolverError> {
                Ok(RankedLevel {
                    level: row.level,
                    impact: coefficient(row)?,
                })
            })
            .collect::<Result<SmallVec<_>, SolverError>>()?;

        Self::from_entries(entries)
    }

    fn from_entries(mut entries: SmallVec<[RankedLevel; 10]>) -> Result<Self, SolverError> {
        if entries.is_empty() {
            return Err(SolverError::NoFeasibleAssignment);
        }

        // Stable, so equal impacts keep production order.
        entries.sort_by(|a, b| a.impact.total_cmp(&b.impact));

        Ok(Self { entries })
    }

    /// Lowest-impact level.
    pub fn best(&self) -> Option<&RankedLevel> {
        self.entries.first()
    }

    /// Entry for `level`.
    pub fn get(&self, level: RebateLevel) -> Option<&RankedLevel> {
        self.entries.iter().find(|entry| entry.level == level)
    }

    /// Entries ascending by impact.
    pub fn iter(&self) -> impl Iterator<Item = &RankedLevel> {
        self.entries.iter()
    }

    /// The `n` lowest-impact entries.
    pub fn top(&self, n: usize) -> impl Iterator<Item = &RankedLevel> {
        self.entries.iter().take(n)
    }

    /// Entries ascending by level.
    pub fn by_level(&self) -> SmallVec<[RankedLevel; 10]> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|entry| entry.level);
        entries
    }

    /// Number of valid levels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed ranking.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        encoding::{PenaltyForm, encode_one_hot},
        scenario::Scenario,
        solvers::exhaustive::{Sample, enumerate},
    };

    use super::*;

    #[test]
    fn from_impacts_orders_by_impact() -> TestResult {
        let impacts = ImpactTable::from_scenario(&Scenario::default())?;
        let ranking = Ranking::from_impacts(&impacts)?;

        let levels: Vec<u8> = ranking.iter().map(|entry| entry.level.get()).collect();

        assert_eq!(levels, vec![10, 8, 9, 7, 6, 5, 4, 3, 2, 1]);

        Ok(())
    }

    #[test]
    fn ties_keep_production_order() -> TestResult {
        let scenario = Scenario::new(
            "tie",
            [
                (RebateLevel::new(3)?, Decimal::ONE),
                (RebateLevel::new(4)?, Decimal::TWO),
                (RebateLevel::new(7)?, Decimal::ONE),
            ],
            Scenario::default().follow_on().clone(),
            10_000.0,
        )?;

        let impacts = ImpactTable::from_scenario(&scenario)?;
        let ranking = Ranking::from_impacts(&impacts)?;

        assert_eq!(ranking.best().map(|best| best.level.get()), Some(3));

        let model = encode_one_hot(&impacts, scenario.penalty(), PenaltyForm::Expanded)?;
        let samples = enumerate(model.model())?;
        let ranking = Ranking::from_samples(&samples, &model)?;

        assert_eq!(ranking.best().map(|best| best.level.get()), Some(3));

        Ok(())
    }

    #[test]
    fn from_samples_drops_invalid_assignments() -> TestResult {
        let impacts = ImpactTable::from_scenario(&Scenario::default())?;
        let model = encode_one_hot(&impacts, 10_000.0, PenaltyForm::Shifted)?;

        let samples = SampleSet::from_samples(vec![
            Sample::new([false; 10], -10_000.0),
            Sample::new([true, true, false, false, false, false, false, false, false, false], -1.0),
            Sample::new([false, false, false, false, true, false, false, false, false, false], 3.2),
        ]);

        let ranking = Ranking::from_samples(&samples, &model)?;

        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking.best().map(|best| best.level.get()), Some(5));

        Ok(())
    }

    #[test]
    fn no_valid_sample_is_an_error() -> TestResult {
        let impacts = ImpactTable::from_scenario(&Scenario::default())?;
        let model = encode_one_hot(&impacts, 10_000.0, PenaltyForm::Expanded)?;
        let samples = SampleSet::from_samples(vec![Sample::new([false; 10], 10_000.0)]);

        let result = Ranking::from_samples(&samples, &model);

        assert!(matches!(result, Err(SolverError::NoFeasibleAssignment)));

        Ok(())
    }

    #[test]
    fn by_level_and_top_views() -> TestResult {
        let impacts = ImpactTable::from_scenario(&Scenario::default())?;
        let ranking = Ranking::from_impacts(&impacts)?;

        let by_level: Vec<u8> = ranking.by_level().iter().map(|e| e.level.get()).collect();
        let top: Vec<u8> = ranking.top(3).map(|e| e.level.get()).collect();

        assert_eq!(by_level, (1..=10).collect::<Vec<u8>>());
        assert_eq!(top, vec![10, 8, 9]);
        assert_eq!(ranking.top(50).count(), 10);

        Ok(())
    }
}

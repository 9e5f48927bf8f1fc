//! Domain primitives for offline uplift evaluation.

use serde::{Deserialize, Serialize};

use crate::common::error::{UpliftError, UpliftResult};

/// Scored unit with its ground-truth treatment and conversion labels.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LabelledRow", into = "LabelledRow")]
pub struct EvaluationRow {
    pub uplift_score: f64,
    pub treated: bool,
    pub converted: bool,
}

impl EvaluationRow {
    pub fn new(uplift_score: f64, treated: bool, converted: bool) -> Self {
        Self {
            uplift_score,
            treated,
            converted,
        }
    }

    /// Build a row from 0/1 labels as exported by the scoring pipeline.
    pub fn from_labels(uplift_score: f64, treatment: u8, conversion: u8) -> UpliftResult<Self> {
        Ok(Self::new(
            uplift_score,
            binary_label("treatment", treatment)?,
            binary_label("conversion", conversion)?,
        ))
    }
}

fn binary_label(name: &str, value: u8) -> UpliftResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(UpliftError::invalid_input(format!(
            "{name} label must be 0 or 1, got {other}"
        ))),
    }
}

/// Wire form of [`EvaluationRow`].
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
struct LabelledRow {
    uplift_score: f64,
    treatment: u8,
    conversion: u8,
}

impl TryFrom<LabelledRow> for EvaluationRow {
    type Error = UpliftError;

    fn try_from(row: LabelledRow) -> Result<Self, Self::Error> {
        Self::from_labels(row.uplift_score, row.treatment, row.conversion)
    }
}

impl From<EvaluationRow> for LabelledRow {
    fn from(row: EvaluationRow) -> Self {
        Self {
            uplift_score: row.uplift_score,
            treatment: u8::from(row.treated),
            conversion: u8::from(row.converted),
        }
    }
}

/// Batch of labelled rows. Input order only matters for breaking score ties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationSet {
    rows: Vec<EvaluationRow>,
}

impl EvaluationSet {
    pub fn new(rows: Vec<EvaluationRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: EvaluationRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[EvaluationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn treated(&self) -> usize {
        self.rows.iter().filter(|r| r.treated).count()
    }

    pub fn controls(&self) -> usize {
        self.rows.len() - self.treated()
    }
}

impl FromIterator<EvaluationRow> for EvaluationSet {
    fn from_iter<I: IntoIterator<Item = EvaluationRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Cumulative incremental conversions per rank, best-scored unit first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QiniCurve {
    values: Vec<f64>,
}

impl QiniCurve {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Trapezoidal area over unit-spaced rank positions.
    pub fn area(&self) -> f64 {
        trapezoid(&self.values)
    }

    /// Straight line from zero to the final value: what random targeting gains.
    pub fn random_baseline(&self) -> QiniCurve {
        let n = self.values.len();
        let last = self.final_value().unwrap_or(0.0);
        let values = (1..=n).map(|rank| last * rank as f64 / n as f64).collect();
        QiniCurve { values }
    }
}

pub(crate) fn trapezoid(values: &[f64]) -> f64 {
    values.windows(2).map(|w| (w[0] + w[1]) / 2.0).sum()
}

/// Evaluation summary handed to the reporting collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QiniReport {
    pub rows: usize,
    pub treated: usize,
    pub controls: usize,
    pub final_qini: f64,
    pub auuc: f64,
    /// AUUC of the random-targeting line under the same normalisation.
    pub random_auuc: f64,
    pub curve: QiniCurve,
}

impl QiniReport {
    pub fn to_json(&self) -> UpliftResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Held-out unit scored by both arms, for ranking by competing bid strategies.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LabelledPair", into = "LabelledPair")]
pub struct ArmScoredRow {
    pub p_treatment: f64,
    pub p_control: f64,
    pub treated: bool,
    pub converted: bool,
}

impl ArmScoredRow {
    pub fn new(p_treatment: f64, p_control: f64, treated: bool, converted: bool) -> Self {
        Self {
            p_treatment,
            p_control,
            treated,
            converted,
        }
    }

    /// Reject probabilities that are NaN or fall outside `[0, 1]`.
    pub fn validate(&self) -> UpliftResult<()> {
        for (name, p) in [("p_treatment", self.p_treatment), ("p_control", self.p_control)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(UpliftError::invalid_input(format!(
                    "{name} must be a probability, got {p}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
struct LabelledPair {
    p_treatment: f64,
    p_control: f64,
    treatment: u8,
    conversion: u8,
}

impl TryFrom<LabelledPair> for ArmScoredRow {
    type Error = UpliftError;

    fn try_from(row: LabelledPair) -> Result<Self, Self::Error> {
        let out = Self::new(
            row.p_treatment,
            row.p_control,
            binary_label("treatment", row.treatment)?,
            binary_label("conversion", row.conversion)?,
        );
        out.validate()?;
        Ok(out)
    }
}

impl From<ArmScoredRow> for LabelledPair {
    fn from(row: ArmScoredRow) -> Self {
        Self {
            p_treatment: row.p_treatment,
            p_control: row.p_control,
            treatment: u8::from(row.treated),
            conversion: u8::from(row.converted),
        }
    }
}

/// Qini curves of one batch ranked by the propensity bid and by the uplift bid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategyComparison {
    pub propensity: QiniCurve,
    pub uplift: QiniCurve,
}

impl StrategyComparison {
    /// Area the uplift ranking gains over the propensity ranking.
    pub fn uplift_advantage(&self) -> f64 {
        self.uplift.area() - self.propensity.area()
    }

    pub fn to_json(&self) -> UpliftResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

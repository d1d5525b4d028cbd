use super::{RigidScore, ScoreError};
use crate::core::geometry::Xform;
use std::fmt;

/// Weighted sum of other scores.
///
/// Components with a weight of exactly zero are never evaluated.
#[derive(Default)]
pub struct JointScore {
    scores: Vec<Box<dyn RigidScore>>,
    weights: Vec<f64>,
}

impl fmt::Debug for JointScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self.scores.iter().map(|s| s.type_name()).collect();
        f.debug_struct("JointScore")
            .field("scores", &labels)
            .field("weights", &self.weights)
            .finish()
    }
}

impl JointScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`ScoreError::WeightCountMismatch`] if the two lists differ in length.
    pub fn from_parts(scores: Vec<Box<dyn RigidScore>>, weights: Vec<f64>) -> Result<Self, ScoreError> {
        if scores.len() != weights.len() {
            return Err(ScoreError::WeightCountMismatch {
                scores: scores.len(),
                weights: weights.len(),
            });
        }
        Ok(Self { scores, weights })
    }

    pub fn add_score(&mut self, score: Box<dyn RigidScore>, weight: f64) {
        self.scores.push(score);
        self.weights.push(weight);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn components(&self) -> impl Iterator<Item = (&dyn RigidScore, f64)> {
        self.scores
            .iter()
            .map(|s| s.as_ref())
            .zip(self.weights.iter().copied())
    }

    /// Unweighted value of each component, `None` where the weight is zero.
    pub fn breakdown(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<Vec<Option<f64>>, ScoreError> {
        self.components()
            .map(|(score, weight)| {
                if weight == 0.0 {
                    Ok(None)
                } else {
                    score.score(x1s, x2s).map(Some)
                }
            })
            .collect()
    }
}

impl RigidScore for JointScore {
    fn score(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<f64, ScoreError> {
        let mut total = 0.0;
        for (score, weight) in self.components() {
            if weight == 0.0 {
                continue;
            }
            total += score.score(x1s, x2s)? * weight;
        }
        Ok(total)
    }

    fn type_name(&self) -> &'static str {
        "JointScore"
    }

    /// Each component's label followed by a space.
    fn show(&self, out: &mut dyn fmt::Write, width: usize) -> fmt::Result {
        for score in &self.scores {
            score.show(out, width)?;
            out.write_char(' ')?;
        }
        Ok(())
    }

    /// Each component's value followed by a space.
    fn show_scores(
        &self,
        out: &mut dyn fmt::Write,
        x1s: &[Xform],
        x2s: &[Xform],
        width: usize,
    ) -> Result<(), ScoreError> {
        for score in &self.scores {
            score.show_scores(out, x1s, x2s, width)?;
            out.write_char(' ')?;
        }
        Ok(())
    }
}

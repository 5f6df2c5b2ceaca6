use std::{collections::BTreeMap, fmt};

use inference::Predictions;
use ndarray::ArrayView1;

use crate::error::{PipelineErr, Result};

/// How well predictions match the ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<K> {
    total: usize,
    correct: usize,
    /// (actual, predicted) -> count
    confusion: BTreeMap<(K, K), usize>,
}

impl<K: Ord + Clone> Evaluation<K> {
    /// Compares every `predicted[i]` to `actual[i]`.
    ///
    /// # Errors
    /// `EvaluationMismatch` if both don't have the same length.
    pub fn new(actual: &[K], predicted: &[K]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(PipelineErr::EvaluationMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }

        let mut confusion = BTreeMap::new();
        let mut correct = 0;

        for (a, p) in actual.iter().zip(predicted) {
            correct += usize::from(a == p);
            *confusion.entry((a.clone(), p.clone())).or_insert(0) += 1;
        }

        Ok(Self {
            total: actual.len(),
            correct,
            confusion,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    /// The fraction of correct predictions, 0 when there are none.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    /// How many rows of class `actual` were predicted as `predicted`.
    pub fn count(&self, actual: &K, predicted: &K) -> usize {
        self.confusion
            .get(&(actual.clone(), predicted.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Every class seen, either as ground truth or as a prediction.
    pub fn classes(&self) -> Vec<K> {
        let mut classes: Vec<K> = self
            .confusion
            .keys()
            .flat_map(|(a, p)| [a.clone(), p.clone()])
            .collect();
        classes.sort();
        classes.dedup();
        classes
    }
}

/// Evaluates numeric class predictions, rounding both sides to the nearest class.
pub fn evaluate_labels(
    actual: ArrayView1<'_, f32>,
    predicted: &Predictions<f32>,
) -> Result<Evaluation<i64>> {
    let round = |v: &f32| v.round() as i64;
    let actual: Vec<i64> = actual.iter().map(round).collect();
    let predicted: Vec<i64> = predicted.iter().map(round).collect();

    Evaluation::new(&actual, &predicted)
}

impl<K: Ord + Clone + fmt::Display> fmt::Display for Evaluation<K> {
    /// Writes the accuracy followed by the confusion matrix, actual classes as rows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "accuracy: {:.4} ({}/{})",
            self.accuracy(),
            self.correct,
            self.total
        )?;

        let classes = self.classes();
        write!(f, "{:>10}", "actual\\pred")?;
        for class in &classes {
            write!(f, " {class:>8}")?;
        }
        writeln!(f)?;

        for actual in &classes {
            write!(f, "{actual:>10}")?;
            for predicted in &classes {
                write!(f, " {:>8}", self.count(actual, predicted))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn accuracy_and_confusion() {
        let eval = Evaluation::new(&[1, 0, 1, 1, 0], &[1, 0, 0, 1, 1]).unwrap();

        assert_eq!(eval.correct(), 3);
        assert!((eval.accuracy() - 0.6).abs() < 1e-12);
        assert_eq!(eval.count(&1, &1), 2);
        assert_eq!(eval.count(&1, &0), 1);
        assert_eq!(eval.count(&0, &1), 1);
        assert_eq!(eval.count(&0, &0), 1);
        assert_eq!(eval.classes(), vec![0, 1]);
    }

    #[test]
    fn string_classes() {
        let actual = ["setosa", "virginica"].map(String::from);
        let predicted = ["setosa", "versicolor"].map(String::from);
        let eval = Evaluation::new(&actual, &predicted).unwrap();

        assert_eq!(eval.classes(), vec!["setosa", "versicolor", "virginica"]);
        assert_eq!(eval.count(&actual[1], &predicted[1]), 1);
    }

    #[test]
    fn rounds_numeric_labels() {
        let predicted = Predictions::new(vec![0.9999, 0.0, 2.0]);
        let eval = evaluate_labels(array![1.0, 0.0, 3.0].view(), &predicted).unwrap();

        assert_eq!(eval.correct(), 2);
        assert_eq!(eval.count(&3, &2), 1);
    }

    #[test]
    fn empty_evaluation() {
        let eval = Evaluation::<i64>::new(&[], &[]).unwrap();
        assert_eq!(eval.accuracy(), 0.0);

        let text = eval.to_string();
        assert!(text.starts_with("accuracy: 0.0000 (0/0)"));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = Evaluation::new(&[1, 0, 1], &[1, 0]).unwrap_err();
        assert!(matches!(
            err,
            PipelineErr::EvaluationMismatch {
                actual: 3,
                predicted: 2
            }
        ));

        let predicted = Predictions::new(vec![1.0]);
        assert!(evaluate_labels(array![1.0, 0.0].view(), &predicted).is_err());
    }
}

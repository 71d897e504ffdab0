use chrono::NaiveDateTime;
use serde::Serialize;

/// One (timestamp, files-remaining) observation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub remaining: f64,
}

/// Samples for one upload session, held as two parallel sequences.
///
/// Both vectors always have the same length; the only way in is `push` or
/// `from_parts`, which checks it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    times: Vec<NaiveDateTime>,
    remaining: Vec<f64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when the sequences differ in length.
    pub fn from_parts(times: Vec<NaiveDateTime>, remaining: Vec<f64>) -> Option<Self> {
        if times.len() != remaining.len() {
            return None;
        }
        Some(Self { times, remaining })
    }

    pub fn push(&mut self, sample: Sample) {
        self.times.push(sample.timestamp);
        self.remaining.push(sample.remaining);
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.remaining.clear();
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn remaining(&self) -> &[f64] {
        &self.remaining
    }

    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            timestamp: *self.times.get(index)?,
            remaining: *self.remaining.get(index)?,
        })
    }

    pub fn last(&self) -> Option<Sample> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        self.times
            .iter()
            .zip(&self.remaining)
            .map(|(&timestamp, &remaining)| Sample {
                timestamp,
                remaining,
            })
    }

    /// Index pairs `(i - 1, i)` where time goes backwards or the remaining
    /// count goes up. Ordering is the caller's responsibility; this only
    /// reports it.
    pub fn ordering_violations(&self) -> Vec<usize> {
        (1..self.len())
            .filter(|&i| {
                self.times[i] < self.times[i - 1] || self.remaining[i] > self.remaining[i - 1]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_from_parts_rejects_length_mismatch() {
        assert!(Dataset::from_parts(vec![at(9, 0)], vec![]).is_none());
        assert!(Dataset::from_parts(vec![at(9, 0)], vec![10.0]).is_some());
    }

    #[test]
    fn test_push_keeps_sequences_aligned() {
        let mut data = Dataset::new();
        data.push(Sample {
            timestamp: at(9, 0),
            remaining: 90.0,
        });
        data.push(Sample {
            timestamp: at(9, 5),
            remaining: 80.0,
        });
        assert_eq!(data.len(), 2);
        assert_eq!(data.times().len(), data.remaining().len());
        assert_eq!(data.last().unwrap().remaining, 80.0);
    }

    #[test]
    fn test_ordering_violations_flags_backwards_steps() {
        let data = Dataset::from_parts(
            vec![at(9, 0), at(9, 5), at(9, 3), at(9, 10)],
            vec![90.0, 80.0, 75.0, 78.0],
        )
        .unwrap();
        assert_eq!(data.ordering_violations(), vec![2, 3]);
    }

    #[test]
    fn test_empty_dataset_has_no_last() {
        assert!(Dataset::new().last().is_none());
        assert!(Dataset::new().ordering_violations().is_empty());
    }
}

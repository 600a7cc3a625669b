// Copyright © 2026 The RBD Engine Contributors

//! Per-component failure history: a chronologically sorted sequence of
//! `(date, type)` pairs, classified into preventive/corrective
//! intervals by a fixed synonym set.

use chrono::NaiveDate;

/// One recorded failure or maintenance event for a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureRecord {
    pub date: NaiveDate,
    /// Free-text maintenance type, e.g. `"Preventivo"`, `"Correctivo"`,
    /// `"M2 - Aviso de Averia"`. Classified by [`is_corrective`].
    pub kind: String,
}

/// A component's failure history, kept sorted ascending by date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureHistory {
    records: Vec<FailureRecord>,
}

impl FailureHistory {
    pub fn new(mut records: Vec<FailureRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&FailureRecord> {
        self.records.last()
    }

    /// Inter-arrival ages in days (`age_i = t_i - t_{i-1}`) paired with
    /// the delta indicator (`1.0` preventive, `0.0` corrective) of the
    /// *later* event in each pair, in original-source order.
    pub fn intervals(&self) -> Vec<(f64, f64)> {
        self.records
            .windows(2)
            .map(|w| {
                let age = (w[1].date - w[0].date).num_days() as f64;
                let delta = if is_corrective(&w[1].kind) { 0.0 } else { 1.0 };
                (age, delta)
            })
            .collect()
    }
}

/// The fixed synonym set that marks a maintenance record as
/// "corrective" rather than "preventive": `"correctivo"`, `"m2 - aviso
/// de averia"`, `"m2"` (case-insensitive, trimmed); everything else is
/// preventive.
pub fn is_corrective(kind: &str) -> bool {
    matches!(
        kind.trim().to_lowercase().as_str(),
        "correctivo" | "m2 - aviso de averia" | "m2"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonym_set_is_case_and_whitespace_insensitive() {
        assert!(is_corrective("  Correctivo "));
        assert!(is_corrective("M2 - Aviso De Averia"));
        assert!(is_corrective("m2"));
        assert!(!is_corrective("Preventivo"));
        assert!(!is_corrective("anything-else"));
    }

    #[test]
    fn intervals_mean_age_matches_ten_day_cadence() {
        // Three records ten days apart each; the mean inter-arrival age
        // is what drives the exponential rate, independent of how each
        // interval classifies as corrective/preventive.
        let h = FailureHistory::new(vec![
            FailureRecord {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                kind: "Preventivo".into(),
            },
            FailureRecord {
                date: NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
                kind: "Correctivo".into(),
            },
            FailureRecord {
                date: NaiveDate::from_ymd_opt(2025, 1, 21).unwrap(),
                kind: "Preventivo".into(),
            },
        ]);
        let ivs = h.intervals();
        assert_eq!(ivs, vec![(10.0, 0.0), (10.0, 1.0)]);
        let mean_age: f64 = ivs.iter().map(|(a, _)| a).sum::<f64>() / ivs.len() as f64;
        assert_eq!(mean_age, 10.0);
    }
}

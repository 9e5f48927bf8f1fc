//! Ranking quality: a separating score must beat a shuffled one.

use uplift_pacer::evaluation::{evaluate, report, EvaluationRow, EvaluationSet};

/// 10 treated converters, 10 treated non-converters, 15 control
/// non-converters and 5 control converters, interleaved.
fn labels() -> Vec<(bool, bool)> {
    let groups = [(true, true), (true, false), (false, false), (false, true)];
    let mut remaining = [10, 10, 15, 5];
    let mut out = Vec::new();
    let mut i = 0;
    while remaining.iter().any(|n| *n > 0) {
        let k = i % 4;
        i += 1;
        if remaining[k] > 0 {
            remaining[k] -= 1;
            out.push(groups[k]);
        }
    }
    out
}

/// Fisher-Yates driven by xorshift64, so the permutation is reproducible.
fn permutation(n: usize, mut state: u64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state % (i as u64 + 1)) as usize;
        idx.swap(i, j);
    }
    idx
}

#[test]
fn separating_scores_beat_shuffled_scores() {
    let labels = labels();
    let scores: Vec<f64> = labels
        .iter()
        .map(|(t, c)| if *t && *c { 1.0 } else { 0.0 })
        .collect();

    let perfect: EvaluationSet = labels
        .iter()
        .zip(&scores)
        .map(|((t, c), s)| EvaluationRow::new(*s, *t, *c))
        .collect();

    let perm = permutation(scores.len(), 42);
    let shuffled: EvaluationSet = labels
        .iter()
        .enumerate()
        .map(|(k, (t, c))| EvaluationRow::new(scores[perm[k]], *t, *c))
        .collect();

    let (perfect_curve, perfect_auuc) = evaluate(&perfect).unwrap();
    let (shuffled_curve, shuffled_auuc) = evaluate(&shuffled).unwrap();

    // same rows, so the end point agrees: 10 - 5 * 20 / 20
    assert_eq!(perfect_curve.final_value(), Some(5.0));
    assert_eq!(shuffled_curve.final_value(), Some(5.0));
    assert!(perfect_auuc > shuffled_auuc + 0.1);

    let summary = report(&perfect).unwrap();
    assert!(summary.auuc > summary.random_auuc);
    assert_eq!((summary.treated, summary.controls), (20, 20));
}

use evfilter_algorithms::{combinations, PairEngine};
use evfilter_core::{LorentzVector, PairCombinationPolicy, PairMetric};

#[test]
fn test_self_pair_count_formula() {
    for n in 0..12usize {
        let items: Vec<usize> = (0..n).collect();
        let count = combinations(PairCombinationPolicy::SelfPairs, &items, &items).count();
        assert_eq!(count, n * n.saturating_sub(1) / 2, "n = {n}");
    }
}

#[test]
fn test_cross_pair_count_formula() {
    for n1 in 0..6usize {
        for n2 in 0..6usize {
            let first: Vec<usize> = (0..n1).collect();
            let second: Vec<usize> = (0..n2).collect();
            let count = combinations(PairCombinationPolicy::CrossPairs, &first, &second).count();
            assert_eq!(count, n1 * n2, "n1 = {n1}, n2 = {n2}");
        }
    }
}

#[test]
fn test_collinear_photons_give_zero_mass_and_no_trigger() {
    let photons = vec![
        LorentzVector::new(1.0, 1.0, 0.0, 0.0),
        LorentzVector::new(1.0, 1.0, 0.0, 0.0),
    ];
    let engine = PairEngine::new(
        PairCombinationPolicy::SelfPairs,
        PairMetric::InvariantMass,
        0.0,
        0.0,
    );
    assert_eq!(engine.metrics(&photons, &photons), vec![0.0]);
    assert!(!engine.any_above(&photons, &photons, 0.5));
}

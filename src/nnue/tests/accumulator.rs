//! Accumulator refresh and incremental update tests.

use crate::nnue::{Accumulator, FeatureTransformer, L1_SIZE};

fn transformer() -> FeatureTransformer {
    let mut ft = FeatureTransformer::zeroed();
    ft.biases.fill(10);
    ft.row_mut(FeatureTransformer::feature_index(0, 3)).fill(5);
    ft.row_mut(FeatureTransformer::feature_index(0, 700))
        .iter_mut()
        .enumerate()
        .for_each(|(i, w)| *w = i as i16 % 7);
    ft.row_mut(FeatureTransformer::feature_index(13, 767)).fill(i16::MAX);
    ft
}

#[test]
fn test_accumulator_updates() {
    let ft = transformer();
    let a = FeatureTransformer::feature_index(0, 3);
    let b = FeatureTransformer::feature_index(0, 700);
    let big = FeatureTransformer::feature_index(13, 767);

    // Refresh: biases plus every active row.
    let mut acc = Accumulator::default();
    acc.refresh(&[a, b], &[a], &ft);
    for i in 0..L1_SIZE {
        assert_eq!(acc.white[i], 15 + i as i16 % 7);
        assert_eq!(acc.black[i], 15);
    }

    // Incremental add then sub returns to the refreshed state.
    let refreshed = acc.clone();
    acc.add_feature(b, a, &ft);
    assert_eq!(acc.black[0], 20);
    acc.sub_feature(b, a, &ft);
    assert_eq!(acc, refreshed);

    // Adds saturate instead of wrapping.
    acc.add_feature(big, big, &ft);
    assert!(acc.white.iter().all(|&v| v == i16::MAX));

    // Side to move picks the perspective order.
    let fresh = Accumulator::new(&ft.biases);
    let (us, them) = fresh.perspectives(false);
    assert!(std::ptr::eq(us, &fresh.black));
    assert!(std::ptr::eq(them, &fresh.white));
    assert!(us.iter().all(|&v| v == 10));
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strata_sampling::{filters, Candidates, SamplerKind, SamplingParams, Token};

fn random_logits(rng: &mut StdRng, n: usize) -> Vec<f32> {
    (0..n).map(|_| rng.gen_range(-12.0f32..12.0)).collect()
}

#[test]
fn softmax_always_normalizes() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for n in [1, 2, 3, 17, 256, 4096] {
        let mut cur = Candidates::from_logits(&random_logits(&mut rng, n), &[]);
        cur.softmax();
        let sum: f32 = cur.iter().map(|c| c.p).sum();
        assert!((sum - 1.0).abs() < 1e-5, "n = {n}, sum = {sum}");
    }
}

#[test]
fn top_k_keeps_min_of_k_and_len_with_no_better_removed() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..50 {
        let n = rng.gen_range(1..200);
        let k = rng.gen_range(1..250);
        let logits = random_logits(&mut rng, n);

        let mut cur = Candidates::from_logits(&logits, &[]);
        filters::top_k(&mut cur, k, 1);
        cur.sort();
        assert_eq!(cur.len(), (k as usize).min(n));

        let min_kept = cur.iter().map(|c| c.logit).fold(f32::INFINITY, f32::min);
        for (i, &l) in logits.iter().enumerate() {
            if cur.find(Token(i as i32)).is_none() {
                assert!(min_kept >= l);
            }
        }
    }
}

#[test]
fn every_filter_leaves_a_non_empty_set() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut params = SamplingParams {
        min_keep: 1,
        temp: 0.7,
        dynatemp_range: 0.3,
        ..SamplingParams::default()
    };

    for _ in 0..40 {
        params.top_k = rng.gen_range(-5..60);
        params.top_p = rng.gen_range(-0.5f32..1.5);
        params.min_p = rng.gen_range(-0.5f32..1.5);
        params.tfs_z = rng.gen_range(-0.5f32..1.5);
        params.typical_p = rng.gen_range(-0.5f32..1.5);

        let n = rng.gen_range(1..300);
        for kind in SamplerKind::ALL {
            let mut cur = Candidates::from_logits(&random_logits(&mut rng, n), &[]);
            filters::apply(kind, &mut cur, &params);
            assert!(!cur.is_empty(), "{} emptied the set", kind.as_str());
        }
    }
}

#[test]
fn duplicate_stages_in_the_chain_are_applied_twice() {
    let params = SamplingParams {
        samplers: vec![SamplerKind::Temperature, SamplerKind::Temperature],
        temp: 0.5,
        ..SamplingParams::default()
    };
    let mut cur = Candidates::from_logits(&[1.0, 2.0], &[]);
    filters::apply_chain(&mut cur, &params);
    let logits: Vec<f32> = cur.iter().map(|c| c.logit).collect();
    assert_eq!(logits, vec![4.0, 8.0]);
}

use flowclust::cluster::{
    cluster_distance, reassign_cluster_ids, BakkerSchut, Clustering, Kmeans, KmeansPlusPlus,
    Unicluster,
};
use flowclust::events::{count_distinct, renumber_by_first_appearance};
use flowclust::{ClusterOptions, MethodId, MethodRegistry};
use ndarray::Array2;
use proptest::prelude::*;

fn events(max_rows: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(0.5f64..1000.0, 2), 1..max_rows)
}

fn to_array(rows: &[Vec<f64>]) -> Array2<f64> {
    let d = rows[0].len();
    Array2::from_shape_vec((rows.len(), d), rows.iter().flatten().copied().collect()).unwrap()
}

proptest! {
    #[test]
    fn prop_kmeans_all_assigned(
        data in events(30),
        k in 1usize..5,
        passes in 1usize..4,
    ) {
        // Skip if k > n
        if k <= data.len() {
            let labels = Kmeans::new(k)
                .with_passes(passes)
                .with_seed(42)
                .fit_predict(&data)
                .unwrap();

            prop_assert_eq!(labels.len(), data.len());
            for &l in &labels {
                prop_assert!(l < k);
            }
        }
    }

    #[test]
    fn prop_bakker_schut_labels_contiguous(
        data in events(40),
        k in 1usize..6,
        init in 1usize..12,
        seed in 0u64..1000,
    ) {
        let out = BakkerSchut::new(k)
            .with_init_clusters(init)
            .with_seed(seed)
            .fit_detailed(&data)
            .unwrap();

        prop_assert_eq!(out.labels.len(), data.len());
        let found = count_distinct(&out.labels);
        prop_assert_eq!(found, k.min(out.initial_clusters));
        prop_assert_eq!(out.labels.clone(), renumber_by_first_appearance(&out.labels));
        prop_assert_eq!(out.steps.len(), out.initial_clusters - found);
    }

    #[test]
    fn prop_bakker_schut_is_reproducible(data in events(25), seed in 0u64..1000) {
        let model = BakkerSchut::new(2).with_init_clusters(8).with_seed(seed);
        prop_assert_eq!(model.fit_predict(&data).unwrap(), model.fit_predict(&data).unwrap());
    }

    #[test]
    fn prop_seeding_picks_data_rows(data in events(30), k in 1usize..6, seed in 0u64..1000) {
        if k <= data.len() {
            let centers = KmeansPlusPlus::new(k).with_seed(seed).choose(&data).unwrap();
            prop_assert_eq!(centers.len(), k);
            for c in &centers {
                prop_assert!(data.contains(c));
            }
        }
    }

    #[test]
    fn prop_distance_symmetric(a in events(10), b in events(10)) {
        let (a, b) = (to_array(&a), to_array(&b));
        let ab = cluster_distance(a.view(), b.view()).unwrap();
        let ba = cluster_distance(b.view(), a.view()).unwrap();
        prop_assert!((ab - ba).abs() < 1e-9);
        prop_assert_eq!(ab, cluster_distance(a.view(), b.view()).unwrap());
    }

    #[test]
    fn prop_reassignment_preserves_partition(
        data in events(30),
        seed in 0u64..1000,
    ) {
        let src = Kmeans::new(1).fit_predict(&data).unwrap();
        let dst = BakkerSchut::new(3).with_init_clusters(6).with_seed(seed).fit_predict(&data).unwrap();

        let r = reassign_cluster_ids(&data, &src, &data, &dst).unwrap();
        for i in 0..data.len() {
            for j in 0..data.len() {
                prop_assert_eq!(dst[i] == dst[j], r.labels[i] == r.labels[j]);
            }
        }
    }
}

fn skewed_populations() -> Vec<Vec<f64>> {
    // Two populations on a log scale: a tight one near 10 and a broad,
    // right-skewed one spanning 300..3000.
    let mut data = Vec::new();
    for i in 0..30 {
        let t = i as f64 / 30.0;
        data.push(vec![10.0 + t, 12.0 - t]);
    }
    for i in 0..60 {
        let t = i as f64 / 60.0;
        data.push(vec![300.0 * 10f64.powf(t), 400.0 * 10f64.powf(t * t)]);
    }
    data
}

#[test]
fn test_skewed_population_stays_whole() {
    let data = skewed_populations();
    let labels = BakkerSchut::new(2)
        .with_init_clusters(20)
        .with_seed(17)
        .fit_predict(&data)
        .unwrap();

    assert!(labels[..30].iter().all(|&l| l == 0));
    assert!(labels[30..].iter().all(|&l| l == 1));
}

#[test]
fn test_registry_runs_every_builtin() {
    let data = skewed_populations();
    let registry = MethodRegistry::builtin();
    let options = ClusterOptions {
        n_clusters: 2,
        n_passes: 2,
        init_clusters: 20,
        seed: Some(5),
        ..ClusterOptions::default()
    };

    for method in registry.methods() {
        let out = registry.cluster(method.id, &data, &options).unwrap();
        assert_eq!(out.labels.len(), data.len(), "{}", method.id);
        assert!(!out.message.is_empty());
    }
    assert_eq!(
        registry.cluster(MethodId::UNICLUSTER, &data, &options).unwrap(),
        Unicluster.fit(&data).unwrap()
    );
}

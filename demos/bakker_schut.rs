//! Cluster two synthetic populations with Bakker Schut and print the merge history.
//!
//! ```text
//! RUST_LOG=flowclust=debug cargo run --example bakker_schut
//! ```

use flowclust::cluster::{reassign_cluster_ids, BakkerSchut, Clustering, Kmeans};
use flowclust::events::count_distinct;
use rand::prelude::*;
use rand_distr::{Distribution, LogNormal};
use tracing_subscriber::EnvFilter;

fn main() -> flowclust::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut rng = StdRng::seed_from_u64(7);
    let tight = LogNormal::new(2.5, 0.1).unwrap();
    let broad = LogNormal::new(6.0, 0.6).unwrap();

    let mut data: Vec<Vec<f64>> = Vec::new();
    for _ in 0..400 {
        data.push(vec![tight.sample(&mut rng), tight.sample(&mut rng)]);
    }
    for _ in 0..600 {
        data.push(vec![broad.sample(&mut rng), tight.sample(&mut rng) * 20.0]);
    }

    let outcome = BakkerSchut::new(2)
        .with_init_clusters(100)
        .with_seed(7)
        .fit_detailed(&data)?;

    println!(
        "{} events, {} initial clusters, {} merges",
        data.len(),
        outcome.initial_clusters,
        outcome.steps.len()
    );
    for step in outcome.steps.iter().rev().take(5).rev() {
        println!(
            "  merge {:>3} + {:>3} -> {:>3}  d = {:>8.4}  size = {:>4}  live = {}",
            step.left, step.right, step.merged, step.distance, step.size, step.live_after
        );
    }

    let first = outcome.labels[..400].iter().filter(|&&l| l == 0).count();
    let second = outcome.labels[400..].iter().filter(|&&l| l == 1).count();
    println!("tight population in cluster 0: {first}/400");
    println!("broad population in cluster 1: {second}/600");

    // Compare with plain k-means, aligned to the Bakker Schut ids.
    let km = Kmeans::new(2).with_passes(5).with_seed(7).fit(&data)?;
    let aligned = reassign_cluster_ids(&data, &outcome.labels, &data, &km.labels)?;
    let agree = aligned
        .labels
        .iter()
        .zip(&outcome.labels)
        .filter(|(a, b)| a == b)
        .count();
    println!(
        "k-means ({}, {} clusters) agrees on {agree}/{} events",
        km.message,
        count_distinct(&km.labels),
        data.len()
    );

    Ok(())
}

use std::time::Duration;

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, Bencher, BenchmarkId, Criterion,
    SamplingMode,
};
use kflow::{
    aggregate, assign, render, Centroids, ClusterCount, EmptyClusterRule, Flow, FlowOptions,
    ImageRef,
};
use palette::Srgb;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

const SIZES: [(u32, u32); 2] = [(320, 240), (1280, 720)];

fn gradient_image(width: u32, height: u32) -> Vec<Srgb<u8>> {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(0);
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let noise: u8 = rng.gen_range(0..16);
            Srgb::new(
                ((x * 255) / width) as u8,
                ((y * 255) / height) as u8,
                noise.wrapping_mul(15),
            )
        })
        .collect()
}

fn bench(
    c: &mut Criterion,
    group: &str,
    mut f: impl FnMut(&mut Bencher<WallTime>, &(ClusterCount, ImageRef)),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(30)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_millis(500));

    let images = SIZES.map(|(width, height)| (width, height, gradient_image(width, height)));

    for k in [8u32, 32, 256] {
        let k = ClusterCount::try_from(k).unwrap();
        for (width, height, pixels) in &images {
            let image = ImageRef::new(pixels, *width, *height).unwrap();
            group.bench_with_input(
                BenchmarkId::new(k.to_string(), format!("{width}x{height}")),
                &(k, image),
                &mut f,
            );
        }
    }
}

fn assign_single(c: &mut Criterion) {
    bench(c, "assign_single", |b, &(k, image)| {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(0);
        let centroids = Centroids::random(k, rng);
        b.iter(|| assign::assign_labels(image, &centroids))
    })
}

fn assign_par(c: &mut Criterion) {
    bench(c, "assign_par", |b, &(k, image)| {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(0);
        let centroids = Centroids::random(k, rng);
        b.iter(|| assign::assign_labels_par(image, &centroids))
    })
}

fn aggregate_and_render(c: &mut Criterion) {
    bench(c, "aggregate_and_render", |b, &(k, image)| {
        let rng = &mut Xoroshiro128PlusPlus::seed_from_u64(0);
        let centroids = Centroids::random(k, rng);
        let labels = assign::assign_labels(image, &centroids);
        b.iter(|| {
            let means = aggregate::cluster_means(image, &labels, k, EmptyClusterRule::Count);
            (means, render::render_frame(&labels, &centroids))
        })
    })
}

fn flow_par(c: &mut Criterion) {
    bench(c, "flow_par_30_frames", |b, &(k, image)| {
        let options = FlowOptions::new()
            .clusters(k.into_inner().into())
            .iterations(30);
        b.iter(|| Flow::new(image, options.clone()).unwrap().run_par())
    })
}

criterion_group!(benches, assign_single, assign_par, aggregate_and_render, flow_par);
criterion_main!(benches);

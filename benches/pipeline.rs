use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use evision::data::normalize;
use evision::price::PriceModel;
use polars::prelude::*;
use rand::prelude::*;

fn create_monthly_data(n_rows: usize) -> DataFrame {
    let mut rng = rand::thread_rng();
    let brands = ["Tesla", "BYD", "Nio", "VW", "Hyundai"];

    let mut dates = Vec::with_capacity(n_rows);
    let mut brand_col = Vec::with_capacity(n_rows);
    let mut battery = Vec::with_capacity(n_rows);
    let mut units = Vec::with_capacity(n_rows);
    let mut revenue = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let year = 2020 + (i / 12) % 4;
        let month = i % 12 + 1;
        dates.push(format!("{year}-{month:02}"));
        brand_col.push(brands[i % brands.len()]);
        let kwh = rng.gen_range(40.0..120.0);
        battery.push(kwh);
        let sold = rng.gen_range(50i64..500);
        units.push(sold);
        revenue.push(sold as f64 * (15_000.0 + kwh * 300.0));
    }

    df!(
        "Date" => &dates,
        "Brand" => &brand_col,
        "Battery_Capacity_kWh" => &battery,
        "Units_Sold" => &units,
        "Revenue" => &revenue
    )
    .unwrap()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for n_rows in [1000, 5000, 10000].iter() {
        let df = create_monthly_data(*n_rows);

        group.bench_with_input(BenchmarkId::new("normalize", n_rows), &df, |b, df| {
            b.iter(|| normalize(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_price_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("price_training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [500, 2000].iter() {
        let df = normalize(&create_monthly_data(*n_rows)).unwrap();

        group.bench_with_input(BenchmarkId::new("train", n_rows), &df, |b, df| {
            b.iter(|| PriceModel::train(black_box(df)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_price_training);
criterion_main!(benches);

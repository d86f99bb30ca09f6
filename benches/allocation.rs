use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use seat_allocator::models::{CategoryDemand, Venue};
use seat_allocator::services::allocate;

fn venue(rows: u32, seats_per_row: u32) -> Venue {
    let mut venue = Venue::new("Bench Hall", None);
    for i in 0..rows {
        let code = format!("{}{}", i / 26 + 1, char::from(b'A' + (i % 26) as u8));
        venue.add_row(&code, seats_per_row, None).unwrap();
    }
    venue
}

fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");
    for &(rows, categories) in &[(10u32, 4u32), (50, 20), (200, 60)] {
        let venue = venue(rows, 40);
        let ordered = venue.ordered_rows();
        // fill ~90% of the venue
        let per_category = venue.total_capacity() * 9 / 10 / categories;
        let demands: Vec<CategoryDemand> = (0..categories)
            .map(|i| CategoryDemand::new(format!("course-{i}"), per_category))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}rows_{categories}cats")),
            &(ordered, demands),
            |b, (rows, demands)| b.iter(|| allocate(black_box(rows), black_box(demands)).unwrap()),
        );
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let venue = venue(200, 40);
    let demands: Vec<CategoryDemand> = (0..60)
        .map(|i| CategoryDemand::new(format!("course-{i}"), 120))
        .collect();
    let allocation = allocate(&venue.ordered_rows(), &demands).unwrap();

    c.bench_function("verify_200_rows", |b| b.iter(|| black_box(&allocation).verify().unwrap()));
    c.bench_function("checksum_200_rows", |b| b.iter(|| black_box(&allocation).checksum()));
}

criterion_group!(benches, bench_allocate, bench_verify);
criterion_main!(benches);

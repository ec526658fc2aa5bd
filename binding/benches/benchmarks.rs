//! Performance benchmarks for tessel

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessel::{
    get_value, schema_of, Database, List, ManagedValue, Object, ObjectSchema, Persisted,
};

#[derive(Default, Object)]
struct User {
    #[tessel(primary_key)]
    id: Persisted<i64>,
    #[tessel(indexed)]
    name: Persisted<String>,
    email: Persisted<Option<String>>,
    age: Persisted<Option<i32>>,
    scores: List<i64>,
}

fn user(id: i64) -> User {
    let mut user = User::default();
    user.id.set(id).unwrap();
    user.name.set(format!("user_{id}")).unwrap();
    user
}

fn bench_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema");

    group.bench_function("derive_uncached", |b| {
        b.iter(|| ObjectSchema::derive_for::<User>().unwrap())
    });

    group.bench_function("cached_lookup", |b| {
        schema_of::<User>();
        b.iter(|| schema_of::<User>())
    });

    group.finish();
}

fn bench_accessors(c: &mut Criterion) {
    let mut group = c.benchmark_group("accessors");

    group.bench_function("unmanaged_read", |b| {
        let user = user(1);
        b.iter(|| black_box(&user).name.get().unwrap())
    });

    group.bench_function("unmanaged_write", |b| {
        let mut user = user(1);
        b.iter(|| user.age.set(black_box(Some(30))).unwrap())
    });

    group.bench_function("managed_read", |b| {
        let db = Database::in_memory();
        let mut user = user(1);
        db.add(&mut user).unwrap();
        b.iter(|| black_box(&user).name.get().unwrap())
    });

    group.bench_function("managed_write", |b| {
        let db = Database::in_memory();
        let mut user = user(1);
        db.add(&mut user).unwrap();
        b.iter(|| user.age.set(black_box(Some(30))).unwrap())
    });

    group.bench_function("dynamic_read", |b| {
        let db = Database::in_memory();
        let mut user = user(1);
        db.add(&mut user).unwrap();
        b.iter(|| get_value(black_box(&user), "email").unwrap())
    });

    group.finish();
}

fn bench_database(c: &mut Criterion) {
    let mut group = c.benchmark_group("database");

    group.bench_function("add", |b| {
        let db = Database::in_memory();
        let mut id = 0i64;
        b.iter(|| {
            id += 1;
            let mut user = user(id);
            db.add(black_box(&mut user)).unwrap()
        })
    });

    for count in [100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("primary_key_lookup", count),
            &count,
            |b, &count| {
                let db = Database::in_memory();
                for id in 0..count {
                    db.add(&mut user(id)).unwrap();
                }
                b.iter(|| {
                    db.object_for_primary_key::<User>(ManagedValue::Int(black_box(count / 2)))
                        .unwrap()
                })
            },
        );
    }

    for len in [10, 100] {
        group.bench_with_input(BenchmarkId::new("list_push", len), &len, |b, &len| {
            let db = Database::in_memory();
            let mut user = user(1);
            db.add(&mut user).unwrap();
            b.iter(|| {
                user.scores.clear().unwrap();
                for i in 0..len {
                    user.scores.push(i).unwrap();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_schema, bench_accessors, bench_database);
criterion_main!(benches);

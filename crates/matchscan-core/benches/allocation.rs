use criterion::{black_box, criterion_group, criterion_main, Criterion};

use matchscan_core::allocation::{AllocationController, Selection};
use matchscan_core::bank::{BankCategory, QuestionBank};

fn make_bank(categories: usize, per_category: usize) -> QuestionBank {
    let categories = (0..categories)
        .map(|c| {
            let id = format!("cat{c}");
            let questions = (0..per_category)
                .map(|q| format!("{id} question {q}"))
                .collect();
            BankCategory::new(id.as_str(), id.to_uppercase(), "", questions)
        })
        .collect();
    QuestionBank::new("bench", "Bench", "1", categories).expect("bench bank")
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialize");
    let bank = make_bank(8, 40);
    let controller = AllocationController::new(&bank);
    let selection = Selection::new()
        .questions("cat0", vec![0, 3, 5])
        .whole_category("cat1");

    for target in [15, 25, 45] {
        group.bench_function(format!("target={target}"), |b| {
            b.iter(|| controller.initialize(black_box(&selection), black_box(target)))
        });
    }

    group.finish();
}

fn bench_replace(c: &mut Criterion) {
    let bank = make_bank(8, 40);
    let controller = AllocationController::new(&bank);
    let selection = Selection::new().whole_category("cat0");

    c.bench_function("replace_all_pending", |b| {
        b.iter(|| {
            let mut session = controller
                .initialize(&selection, 45)
                .expect("bench session");
            let keys: Vec<_> = session.queue().iter().map(|i| i.key.clone()).collect();
            for key in &keys {
                let _ = controller.replace(&mut session, black_box(key));
            }
            session
        })
    });
}

criterion_group!(benches, bench_initialize, bench_replace);
criterion_main!(benches);

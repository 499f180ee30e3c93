//! Refugio Benchmark Suite
//!
//! Targets, per call:
//!   classify_action .................. < 5μs
//!   evaluate_endings_long_text ....... < 20μs
//!   inventory_fill_and_use ........... < 20μs
//!   sqlite_save_load_40_messages ..... < 2ms

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use refugio_core::classifier::ActionClassifier;
use refugio_core::config::SaveConfig;
use refugio_core::endings;
use refugio_core::inventory::Inventory;
use refugio_core::save::{SaveStore, SessionSnapshot, SqliteSaveStore};
use refugio_core::statistics::GameStatistics;
use refugio_core::types::{GameMessage, InventoryItem, ItemType, OwnerId};

fn make_item(i: usize) -> InventoryItem {
    InventoryItem::new(
        format!("objeto {i}"),
        "Algo útil",
        ItemType::Tool,
        true,
        "🔧",
    )
}

fn make_snapshot(turns: u32) -> SessionSnapshot {
    let mut statistics = GameStatistics::new(Utc::now());
    let mut messages = vec![GameMessage::assistant("Despiertas en un hospital abandonado.")];
    for t in 0..turns {
        messages.push(GameMessage::user(format!("Exploro la sala {t}")));
        messages.push(GameMessage::assistant(
            "El pasillo huele a humo. Oyes pasos arrastrándose detrás de la puerta.",
        ));
        statistics.exploration_actions += 1;
        statistics.turns_played += 1;
        statistics.decisions_count += 1;
    }
    SessionSnapshot {
        messages,
        inventory: (0..5).map(make_item).collect(),
        statistics,
    }
}

/// Benchmark: classify one player action (target: < 5μs).
fn bench_classify(c: &mut Criterion) {
    let classifier = ActionClassifier::default();
    c.bench_function("classify_action", |b| {
        b.iter(|| {
            let categories =
                classifier.classify(black_box("Ataco al zombie y luego busco a mi grupo"));
            black_box(categories);
        });
    });
}

/// Benchmark: evaluate the ending rules against a long narration (target: < 20μs).
fn bench_evaluate(c: &mut Criterion) {
    let snapshot = make_snapshot(12);
    let inventory = Inventory::from_items(snapshot.inventory.clone(), 10);
    let text = "La noche cae sobre la ciudad. ".repeat(40) + "Por fin llegas a la zona segura.";

    c.bench_function("evaluate_endings_long_text", |b| {
        b.iter(|| {
            let ending = endings::evaluate(
                black_box(&snapshot.statistics),
                black_box(&inventory),
                black_box(&text),
            );
            black_box(ending);
        });
    });
}

/// Benchmark: fill an inventory to its cap, then use every item (target: < 20μs).
fn bench_inventory(c: &mut Criterion) {
    let items: Vec<_> = (0..10).map(make_item).collect();
    c.bench_function("inventory_fill_and_use", |b| {
        b.iter(|| {
            let mut inventory = Inventory::new(10);
            for item in &items {
                let _ = inventory.add(black_box(item.clone()));
            }
            for item in &items {
                let _ = inventory.use_item(black_box(item.id));
            }
            black_box(inventory);
        });
    });
}

/// Benchmark: manual save then load of a 20-turn session (target: < 2ms).
fn bench_sqlite_round_trip(c: &mut Criterion) {
    let config = SaveConfig {
        max_manual_saves: 1_000,
        ..SaveConfig::default()
    };
    let store = SqliteSaveStore::open_in_memory(&config).expect("open in-memory store");
    let owner = OwnerId::new("bench");
    let snapshot = make_snapshot(20);

    c.bench_function("sqlite_save_load_40_messages", |b| {
        b.iter(|| {
            let saved = store
                .save(&owner, black_box(&snapshot), "bench", false)
                .expect("save");
            let loaded = store.load(&owner, saved.id).expect("load");
            black_box(loaded);
        });
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_evaluate,
    bench_inventory,
    bench_sqlite_round_trip,
);
criterion_main!(benches);

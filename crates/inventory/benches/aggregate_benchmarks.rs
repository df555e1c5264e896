use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use wms_core::{SkuId, TransactionId, WarehouseId};
use wms_inventory::{aggregate, Transaction, TransactionType};

/// Synthetic ledger: `skus` SKUs × 4 batches in one warehouse, receipts
/// followed by partial shipments, dates spread over a year.
fn synthetic_ledger(len: usize, skus: usize) -> (Vec<Transaction>, HashMap<SkuId, u32>) {
    let warehouse_id = WarehouseId::new();
    let sku_ids: Vec<SkuId> = (0..skus).map(|_| SkuId::new()).collect();
    let defaults = sku_ids.iter().map(|id| (*id, 12)).collect();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let txs = (0..len)
        .map(|i| {
            let receive = i % 3 != 2;
            Transaction {
                id: TransactionId::new(),
                sequence: i as i64 + 1,
                transaction_type: if receive {
                    TransactionType::Receive
                } else {
                    TransactionType::Ship
                },
                transaction_date: start + Duration::hours((i % 8760) as i64),
                warehouse_id,
                sku_id: sku_ids[i % skus],
                batch_lot: format!("LOT-{}", i % 4),
                cartons_in: if receive { 10 } else { 0 },
                cartons_out: if receive { 0 } else { 7 },
                pallets_in: 0,
                pallets_out: 0,
                units_per_carton: None,
                tracking_number: None,
                notes: None,
                created_at: start,
                created_by: None,
            }
        })
        .collect();

    (txs, defaults)
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_aggregate");

    for len in [1_000usize, 10_000, 100_000] {
        let (txs, defaults) = synthetic_ledger(len, 50);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &txs, |b, txs| {
            b.iter(|| aggregate(black_box(txs), &defaults).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);

use chrono::NaiveDate;
use common::{BatchId, Money, ProductId, StockRecordId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Aggregate, Cart, CatalogService, Session};
use store::{Batch, BatchStock, InMemoryStore, Product, StockRecord};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn product(index: usize, batches: usize) -> Product {
    let id = ProductId::new();
    Product {
        id,
        name: format!("Product {index:03}"),
        generic_name: Some(format!("Generic {index:03}")),
        strength: None,
        list_price: Money::from_cents(100 + index as i64),
        interactions: vec![format!("Generic {:03}", index + 1)],
        batches: (0..batches)
            .map(|b| {
                let batch_id = BatchId::new();
                BatchStock {
                    batch: Batch {
                        id: batch_id,
                        product_id: id,
                        batch_number: format!("L{b}"),
                        expiry: NaiveDate::from_ymd_opt(2027, 1 + b as u32 % 12, 1).unwrap(),
                        sale_price: Money::from_cents(100 + index as i64),
                        cost_price: Money::from_cents(50),
                    },
                    stock: StockRecord {
                        id: StockRecordId::new(),
                        batch_id,
                        quantity: 1_000,
                    },
                }
            })
            .collect(),
    }
}

fn bench_add_line(c: &mut Criterion) {
    let p = product(1, 1);
    let batch_id = p.batches[0].batch.id;

    c.bench_function("domain/add_line_new", |b| {
        b.iter(|| {
            let mut session = Session::new();
            session.add_line(&p, batch_id, 1, today(), false).unwrap();
        });
    });
}

fn bench_advisories_full_cart(c: &mut Criterion) {
    let products: Vec<Product> = (0..30).map(|i| product(i * 2, 4)).collect();
    let mut session = Session::new();
    for p in &products {
        session
            .add_line(p, p.batches[0].batch.id, 1, today(), true)
            .unwrap();
    }
    let candidate = product(61, 6);
    let batch_id = candidate.batches[5].batch.id;

    c.bench_function("domain/add_line_decision_30_lines", |b| {
        b.iter(|| {
            session
                .cart()
                .add_line(&candidate, batch_id, 1, today(), false)
                .unwrap()
        });
    });
}

fn bench_cart_total(c: &mut Criterion) {
    let mut cart = Cart::default();
    for i in 0..100 {
        let p = product(i, 1);
        if let Ok(domain::AddLine::Apply { events, .. }) =
            cart.add_line(&p, p.batches[0].batch.id, 3, today(), true)
        {
            cart.apply_events(events);
        }
    }

    c.bench_function("domain/cart_total_100_lines", |b| b.iter(|| cart.total()));
}

fn bench_catalog_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::seeded((0..500).map(|i| product(i, 3)).collect(), vec![]);
    let catalog = CatalogService::new(store);

    c.bench_function("domain/catalog_search_500", |b| {
        b.iter(|| rt.block_on(async { catalog.search("generic 04").await.unwrap() }));
    });
}

criterion_group!(
    benches,
    bench_add_line,
    bench_advisories_full_cart,
    bench_cart_total,
    bench_catalog_search,
);
criterion_main!(benches);

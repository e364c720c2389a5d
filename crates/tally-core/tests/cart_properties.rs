//! Property tests for cart totals and restore.

use std::sync::Arc;

use proptest::prelude::*;

use tally_core::codec;
use tally_core::{
    Cart, CartError, CartId, InMemoryCatalog, Money, PersistedCart, ProductId, ProductSnapshot,
    RateTable, TaxLookup, TaxMode, TaxRate,
};

#[derive(Debug, Clone)]
enum Op {
    Add(u64, i64),
    Remove(u64),
    Update(u64, i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..=5, 1i64..=50).prop_map(|(id, qty)| Op::Add(id, qty)),
        (1u64..=5).prop_map(Op::Remove),
        (1u64..=5, -2i64..=50).prop_map(|(id, qty)| Op::Update(id, qty)),
    ]
}

fn catalog() -> InMemoryCatalog {
    (1u64..=5)
        .map(|id| {
            let snapshot = ProductSnapshot::purchasable(
                ProductId::new(id),
                format!("Product {id}"),
                Money::from_cents(id as i64 * 137),
            );
            if id % 2 == 0 {
                snapshot.with_tax_class("standard")
            } else {
                snapshot.with_tax_class("reduced").with_tax_class("standard")
            }
        })
        .collect()
}

fn taxes() -> Arc<RateTable> {
    rates(TaxMode::Exclusive)
}

fn rates(basis: TaxMode) -> Arc<RateTable> {
    Arc::new(
        RateTable::new(basis)
            .with_rate("standard", TaxRate::from_bps(2000))
            .unwrap()
            .with_rate("reduced", TaxRate::from_bps(825))
            .unwrap(),
    )
}

fn apply(cart: &mut Cart, catalog: &InMemoryCatalog, op: &Op) {
    match *op {
        Op::Add(id, qty) => {
            let product = catalog.get(ProductId::new(id)).unwrap().clone();
            cart.add_item(&product, qty).unwrap();
        }
        Op::Remove(id) => {
            assert!(cart.remove_item(ProductId::new(id)));
        }
        Op::Update(id, qty) => {
            let id = ProductId::new(id);
            let present = cart.contains(id);
            match cart.update_quantity(id, qty) {
                Ok(()) => assert!(present, "updated absent {id}"),
                Err(CartError::NotFound(missing)) => {
                    assert!(!present, "NotFound for present {id}");
                    assert_eq!(missing, id);
                }
                Err(other) => panic!("update of {id} to {qty} failed: {other}"),
            }
        }
    }
}

fn sum_of_lines(cart: &Cart) -> Money {
    cart.items().iter().map(|line| line.line_total()).sum()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: With tax-exclusive pricing the running total always equals
    /// the sum of line totals.
    #[test]
    fn property_total_matches_line_totals(ops in proptest::collection::vec(op(), 0..40)) {
        let catalog = catalog();
        let mut cart = Cart::new(CartId::generate(), taxes(), TaxMode::Exclusive);

        for op in &ops {
            apply(&mut cart, &catalog, op);
            prop_assert_eq!(cart.total(), sum_of_lines(&cart), "after {:?}", op);
            prop_assert!(cart.items().iter().all(|line| line.quantity() > 0));
        }
    }

    /// PROPERTY: With tax-inclusive pricing the total runs ahead of the line
    /// totals by the tax extracted from every unit ever added. Updates and
    /// removals credit the net price, so they never give it back.
    #[test]
    fn property_inclusive_total_keeps_extracted_tax(ops in proptest::collection::vec(op(), 0..40)) {
        let catalog = catalog();
        let taxes = rates(TaxMode::Inclusive);
        let mut cart = Cart::new(CartId::generate(), taxes.clone(), TaxMode::Inclusive);
        let mut extracted = Money::zero();

        for op in &ops {
            apply(&mut cart, &catalog, op);
            if let Op::Add(id, qty) = *op {
                let product = catalog.get(ProductId::new(id)).unwrap();
                extracted += taxes.unit_tax(product) * qty;
            }
            prop_assert_eq!(cart.total() - sum_of_lines(&cart), extracted, "after {:?}", op);
        }
    }

    /// PROPERTY: Removing an absent product changes nothing.
    #[test]
    fn property_remove_absent_is_noop(ops in proptest::collection::vec(op(), 0..20)) {
        let catalog = catalog();
        let mut cart = Cart::new(CartId::generate(), taxes(), TaxMode::Exclusive);
        for op in &ops {
            apply(&mut cart, &catalog, op);
        }

        let items = cart.items().to_vec();
        let total = cart.total();
        prop_assert!(cart.remove_item(ProductId::new(999)));
        prop_assert_eq!(cart.items(), items.as_slice());
        prop_assert_eq!(cart.total(), total);
    }

    /// PROPERTY: A cart restored from its own record, against an unchanged
    /// catalog, has the same lines and total.
    #[test]
    fn property_restore_reproduces_cart(ops in proptest::collection::vec(op(), 0..40)) {
        let catalog = catalog();
        let mut cart = Cart::new(CartId::generate(), taxes(), TaxMode::Exclusive);
        for op in &ops {
            apply(&mut cart, &catalog, op);
        }

        let json = cart.to_record().to_json().unwrap();
        let record = PersistedCart::from_json(&json).unwrap();
        let restored = codec::decode(&record, &catalog, taxes(), TaxMode::Exclusive).unwrap();

        prop_assert!(restored.is_complete());
        prop_assert_eq!(restored.cart.id(), cart.id());
        prop_assert_eq!(restored.cart.items(), cart.items());
        prop_assert_eq!(restored.cart.total(), sum_of_lines(&cart));
    }
}

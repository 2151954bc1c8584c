use bookdist_core::{CatalogId, DomainError, InstitutionId};
use bookdist_distribution::{AllocationStrategy, BooksDistributionSystem, DistributionEvent, SystemConfig};
use bookdist_events::Event;
use bookdist_institutions::{Institution, InstitutionKind, Priority, RequestStatus};
use bookdist_inventory::{CatalogEntry, Category, TransactionKind};
use proptest::prelude::*;

fn isbn(raw: &str) -> CatalogId {
    CatalogId::parse(raw).unwrap()
}

fn inst_id(raw: &str) -> InstitutionId {
    InstitutionId::parse(raw).unwrap()
}

fn title(raw: &str) -> CatalogEntry {
    CatalogEntry::new(isbn(raw), "Mathematics Grade 10", "Dr. A. Kumar", Category::Mathematics, 2024, "NCERT", 25000)
        .unwrap()
}

fn institution(raw: &str, students: u32) -> Institution {
    Institution::new(inst_id(raw), format!("Institution {raw}"), InstitutionKind::HighSchool, "New Delhi", students)
        .unwrap()
}

fn system_with(strategy: AllocationStrategy, ids: &[&str]) -> BooksDistributionSystem {
    let system = BooksDistributionSystem::new(SystemConfig::default().with_strategy(strategy)).unwrap();
    for id in ids {
        system.register_institution(institution(id, 300)).unwrap();
    }
    system
}

#[test]
fn end_to_end_priority_then_return() {
    let b1 = isbn("1000000001");
    let system = system_with(AllocationStrategy::PriorityBased, &["X", "Y"]);
    system.add_stock(title("1000000001"), 100).unwrap();

    let x_req = system.submit_request(&inst_id("X"), b1.clone(), 60, Priority::Critical).unwrap();
    let y_req = system.submit_request(&inst_id("Y"), b1.clone(), 60, Priority::Low).unwrap();

    let report = system.run_cycle();
    assert_eq!(system.inventory().available(&b1), 0);

    let x = system.institution(&inst_id("X")).unwrap();
    let y = system.institution(&inst_id("Y")).unwrap();
    assert_eq!(x.request(x_req).unwrap().status(), RequestStatus::Fulfilled);
    let y_request = y.request(y_req).unwrap();
    assert_eq!(y_request.status(), RequestStatus::PartiallyFulfilled);
    assert_eq!(y_request.quantity_fulfilled(), 40);

    let x_loan = report
        .loans
        .iter()
        .find(|l| l.institution_id() == &inst_id("X"))
        .unwrap();
    system.return_loan(x_loan.id_typed()).unwrap();
    assert_eq!(system.inventory().available(&b1), 60);

    let kinds: Vec<_> = system.inventory().transactions().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Add,
            TransactionKind::Allocate,
            TransactionKind::Allocate,
            TransactionKind::Return,
        ]
    );
}

#[test]
fn returning_twice_credits_once() {
    let b1 = isbn("1000000001");
    let system = system_with(AllocationStrategy::PriorityBased, &["X"]);
    system.add_stock(title("1000000001"), 10).unwrap();
    system.submit_request(&inst_id("X"), b1.clone(), 10, Priority::High).unwrap();
    let loan = system.run_cycle().loans.remove(0);

    system.return_loan(loan.id_typed()).unwrap();
    let err = system.return_loan(loan.id_typed()).unwrap_err();
    assert_eq!(err, DomainError::AlreadyReturned(loan.id_typed()));
    assert_eq!(system.inventory().available(&b1), 10);
}

#[test]
fn equal_cycle_leaves_remainder() {
    let b1 = isbn("1000000001");
    let system = system_with(AllocationStrategy::Equal, &["A", "B", "C"]);
    system.add_stock(title("1000000001"), 100).unwrap();
    for id in ["A", "B", "C"] {
        system.submit_request(&inst_id(id), b1.clone(), 40, Priority::Medium).unwrap();
    }

    let report = system.run_cycle();
    for id in ["A", "B", "C"] {
        assert_eq!(report.units_for(&inst_id(id)), 33);
    }
    assert_eq!(system.inventory().available(&b1), 1);
}

#[test]
fn later_cycles_pick_up_remaining_need() {
    let b1 = isbn("1000000001");
    let system = system_with(AllocationStrategy::PriorityBased, &["X"]);
    system.add_stock(title("1000000001"), 25).unwrap();
    let req = system.submit_request(&inst_id("X"), b1.clone(), 60, Priority::High).unwrap();

    system.run_cycle();
    system.add_stock(title("1000000001"), 50).unwrap();
    system.set_strategy(AllocationStrategy::NeedProportional);
    let second = system.run_cycle();

    assert_eq!(second.units_allocated(), 35);
    let x = system.institution(&inst_id("X")).unwrap();
    assert_eq!(x.request(req).unwrap().status(), RequestStatus::Fulfilled);
    assert_eq!(x.holding(&b1), 60);
    assert_eq!(system.inventory().available(&b1), 15);
}

#[test]
fn subscribers_receive_cycle_notifications() {
    let b1 = isbn("1000000001");
    let system = system_with(AllocationStrategy::PriorityBased, &["X", "Y"]);
    system.add_stock(title("1000000001"), 30).unwrap();
    system.submit_request(&inst_id("X"), b1.clone(), 20, Priority::High).unwrap();
    system.submit_request(&inst_id("Y"), b1, 20, Priority::Low).unwrap();
    let subscription = system.subscribe();

    system.run_cycle();

    let events = subscription.drain();
    assert_eq!(events.len(), 3);
    match &events[0] {
        DistributionEvent::InstitutionNotified(n) => {
            assert_eq!(n.institution_id, inst_id("X"));
            assert_eq!(n.message(), "Distribution completed. 1 requests fulfilled.");
        }
        other => panic!("Expected InstitutionNotified, got {other:?}"),
    }
    match &events[1] {
        DistributionEvent::InstitutionNotified(n) => {
            assert_eq!((n.partially_fulfilled, n.units_received), (1, 10));
        }
        other => panic!("Expected InstitutionNotified, got {other:?}"),
    }
    assert_eq!(events[2].event_type(), "distribution.cycle.completed");
}

#[test]
fn waiting_list_records_short_titles_only() {
    let system = system_with(AllocationStrategy::PriorityBased, &["X"]);
    system.add_stock(title("1000000001"), 5).unwrap();
    system.submit_request(&inst_id("X"), isbn("1000000001"), 5, Priority::Low).unwrap();
    system.submit_request(&inst_id("X"), isbn("1000000001"), 6, Priority::Critical).unwrap();

    let waiting = system.waiting_list().entries(&isbn("1000000001"));
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].quantity, 6);
    assert_eq!(waiting[0].priority, Priority::Critical);
}

fn strategy() -> impl Strategy<Value = AllocationStrategy> {
    prop_oneof![
        Just(AllocationStrategy::PriorityBased),
        Just(AllocationStrategy::NeedProportional),
        Just(AllocationStrategy::Equal),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every unit ever added is either on the shelf or out on an
    /// unreturned loan, whatever mix of cycles and returns happened.
    #[test]
    fn stock_is_conserved(
        stock in 1u32..500,
        requests in prop::collection::vec((0usize..3, 1u32..200, 1u8..=4), 1..12),
        strategies in prop::collection::vec(strategy(), 1..4),
        return_every in 1usize..4,
    ) {
        let b1 = isbn("1000000001");
        let ids = ["A", "B", "C"];
        let system = system_with(AllocationStrategy::PriorityBased, &ids);
        system.add_stock(title("1000000001"), stock).unwrap();
        for (who, qty, level) in requests {
            system
                .submit_request(&inst_id(ids[who]), b1.clone(), qty, Priority::from_level(level).unwrap())
                .unwrap();
        }

        for s in strategies {
            system.set_strategy(s);
            let report = system.run_cycle();
            for loan in report.loans.iter().step_by(return_every) {
                system.return_loan(loan.id_typed()).unwrap();
            }

            let on_shelf = u64::from(system.inventory().available(&b1));
            let on_loan = system.loan_tracker().outstanding_quantity(&b1);
            prop_assert_eq!(on_shelf + on_loan, u64::from(stock));
        }

        for id in ids {
            let inst = system.institution(&inst_id(id)).unwrap();
            for r in inst.requests() {
                prop_assert!(r.quantity_fulfilled() <= r.quantity_requested());
            }
        }
    }
}

use std::sync::Arc;
use std::thread;

use bookdist_core::{CatalogId, InstitutionId};
use bookdist_distribution::{AllocationStrategy, BooksDistributionSystem, SystemConfig};
use bookdist_institutions::{Institution, InstitutionKind, Priority};
use bookdist_inventory::{CatalogEntry, Category};

const TITLES: [&str; 3] = ["1000000001", "1000000002", "1000000003"];
const INSTITUTIONS: [&str; 4] = ["INST-001", "INST-002", "INST-003", "INST-004"];
const STOCK_PER_TITLE: u32 = 500;

fn isbn(raw: &str) -> CatalogId {
    CatalogId::parse(raw).unwrap()
}

fn seeded(strategy: AllocationStrategy) -> Arc<BooksDistributionSystem> {
    let system = BooksDistributionSystem::new(SystemConfig::default().with_strategy(strategy)).unwrap();
    for (n, raw) in TITLES.iter().enumerate() {
        let entry = CatalogEntry::new(isbn(raw), format!("Title {n}"), "Author", Category::Textbook, 2024, "NCERT", 10000)
            .unwrap();
        system.add_stock(entry, STOCK_PER_TITLE).unwrap();
    }
    for raw in INSTITUTIONS {
        let inst = Institution::new(InstitutionId::parse(raw).unwrap(), format!("School {raw}"), InstitutionKind::SecondarySchool, "Mumbai", 280)
            .unwrap();
        system.register_institution(inst).unwrap();
    }
    Arc::new(system)
}

fn assert_conserved(system: &BooksDistributionSystem) {
    for raw in TITLES {
        let id = isbn(raw);
        let on_shelf = u64::from(system.inventory().available(&id));
        let on_loan = system.loan_tracker().outstanding_quantity(&id);
        assert_eq!(on_shelf + on_loan, u64::from(STOCK_PER_TITLE), "title {raw}");
    }
}

#[test]
fn concurrent_submits_cycles_and_returns_conserve_stock() {
    let system = seeded(AllocationStrategy::PriorityBased);

    let submitters: Vec<_> = INSTITUTIONS
        .iter()
        .enumerate()
        .map(|(n, raw)| {
            let system = Arc::clone(&system);
            let id = InstitutionId::parse(*raw).unwrap();
            thread::spawn(move || {
                for round in 0..50u32 {
                    let title = TITLES[(n + round as usize) % TITLES.len()];
                    let priority = Priority::from_level((round % 4) as u8 + 1).unwrap();
                    system.submit_request(&id, isbn(title), 1 + round % 7, priority).unwrap();
                }
            })
        })
        .collect();

    let cycler = {
        let system = Arc::clone(&system);
        thread::spawn(move || {
            let strategies = [
                AllocationStrategy::PriorityBased,
                AllocationStrategy::NeedProportional,
                AllocationStrategy::Equal,
            ];
            for round in 0..30 {
                system.set_strategy(strategies[round % strategies.len()]);
                let report = system.run_cycle();
                for loan in report.loans.iter().step_by(2) {
                    system.return_loan(loan.id_typed()).unwrap();
                }
            }
        })
    };

    for handle in submitters {
        handle.join().unwrap();
    }
    cycler.join().unwrap();
    system.run_cycle();

    assert_conserved(&system);
    let summary = system.summary();
    assert_eq!(summary.total_requests, INSTITUTIONS.len() * 50);
    assert_eq!(
        summary.fulfilled + summary.partially_fulfilled + summary.pending + summary.rejected,
        summary.total_requests
    );
}

#[test]
fn parallel_cycles_never_oversubscribe() {
    let system = seeded(AllocationStrategy::PriorityBased);
    for raw in INSTITUTIONS {
        let id = InstitutionId::parse(raw).unwrap();
        for title in TITLES {
            system.submit_request(&id, isbn(title), 200, Priority::High).unwrap();
        }
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let system = Arc::clone(&system);
            thread::spawn(move || system.run_cycle().units_allocated())
        })
        .collect();
    let allocated: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(allocated, u64::from(STOCK_PER_TITLE) * TITLES.len() as u64);
    assert_conserved(&system);
    for raw in TITLES {
        assert_eq!(system.inventory().available(&isbn(raw)), 0);
    }
}

#[test]
fn concurrent_returns_of_one_loan_credit_once() {
    let system = seeded(AllocationStrategy::PriorityBased);
    let id = InstitutionId::parse("INST-001").unwrap();
    system.submit_request(&id, isbn(TITLES[0]), 100, Priority::Critical).unwrap();
    let loan = system.run_cycle().loans.remove(0);

    let successes: usize = (0..8)
        .map(|_| {
            let system = Arc::clone(&system);
            let loan_id = loan.id_typed();
            thread::spawn(move || system.return_loan(loan_id).is_ok())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();

    assert_eq!(successes, 1);
    assert_eq!(system.inventory().available(&isbn(TITLES[0])), STOCK_PER_TITLE);
}

use anyhow::Context;
use chrono::{Duration, Utc};

use bookdist_core::{CatalogId, InstitutionId};
use bookdist_distribution::{AllocationStrategy, BooksDistributionSystem, CycleReport, SearchQuery, SystemConfig};
use bookdist_institutions::{Contact, Institution, InstitutionKind, Priority};
use bookdist_inventory::{CatalogEntry, Category};

const MATHEMATICS: &str = "8120001001";
const LITERATURE: &str = "8120001002";
const SCIENCE: &str = "8120001003";
const HISTORY: &str = "8120001004";

fn main() -> anyhow::Result<()> {
    bookdist_observability::init();

    let config = SystemConfig::from_env().context("loading configuration")?;
    let system = BooksDistributionSystem::new(config)?;

    seed_inventory(&system)?;
    seed_institutions(&system)?;
    submit_requests(&system)?;

    log_cycle(&system.run_cycle());

    let maths = CatalogId::parse(MATHEMATICS)?;
    system.add_stock(
        CatalogEntry::new(maths, "Mathematics Grade 10", "Dr. A. Kumar", Category::Mathematics, 2024, "NCERT", 25000)?,
        300,
    )?;
    system.set_strategy(AllocationStrategy::NeedProportional);
    log_cycle(&system.run_cycle());

    system.set_strategy(AllocationStrategy::Equal);
    let last = system.run_cycle();
    log_cycle(&last);

    if let Some(loan) = last.loans.first() {
        let returned = system.return_loan(loan.id_typed())?;
        tracing::info!(loan_id = %returned.id_typed(), quantity = returned.quantity(), "demo loan returned");
    }

    let overdue = system.check_overdue_at(Utc::now() + system.loan_tracker().loan_period() + Duration::days(1));
    tracing::info!(overdue = overdue.len(), "overdue check after loan period");

    for category in Category::ALL {
        let titles = system.search(&SearchQuery::Category(category));
        if !titles.is_empty() {
            tracing::info!(%category, titles = titles.len(), "titles in stock");
        }
    }

    let summary = system.summary();
    tracing::info!(
        requests = summary.total_requests,
        fulfilled = summary.fulfilled,
        fulfilled_percent = summary.fulfilled_percent(),
        units_on_loan = summary.units_on_loan,
        "distribution summary"
    );

    println!("{}", system.snapshot().to_json()?);
    Ok(())
}

fn seed_inventory(system: &BooksDistributionSystem) -> anyhow::Result<()> {
    let titles = [
        (MATHEMATICS, "Mathematics Grade 10", "Dr. A. Kumar", Category::Mathematics, 2024, "NCERT", 25000, 500),
        (LITERATURE, "English Literature", "Prof. B. Singh", Category::Literature, 2024, "State Board", 18000, 400),
        (SCIENCE, "Science Fundamentals", "Dr. C. Patel", Category::Science, 2024, "CBSE", 32000, 600),
        (HISTORY, "Indian History", "Prof. D. Sharma", Category::History, 2023, "NCERT", 21000, 300),
    ];
    for (id, title, author, category, year, publisher, price, qty) in titles {
        let entry = CatalogEntry::new(CatalogId::parse(id)?, title, author, category, year, publisher, price)?;
        system.add_stock(entry, qty)?;
    }
    Ok(())
}

fn seed_institutions(system: &BooksDistributionSystem) -> anyhow::Result<()> {
    let institutions = [
        ("INST-001", "Gandhi Memorial High School", InstitutionKind::HighSchool, "New Delhi", 350),
        ("INST-002", "Nehru Public School", InstitutionKind::SecondarySchool, "Mumbai", 280),
        ("INST-003", "National Science College", InstitutionKind::College, "Bangalore", 500),
        ("INST-004", "State Central Library", InstitutionKind::Library, "Chennai", 150),
    ];
    for (id, name, kind, location, students) in institutions {
        let mut institution = Institution::new(InstitutionId::parse(id)?, name, kind, location, students)?;
        if id == "INST-001" {
            institution = institution.with_contact(Contact::new("office@gmhs.edu.in", "9811000001")?);
        }
        system.register_institution(institution)?;
    }
    Ok(())
}

fn submit_requests(system: &BooksDistributionSystem) -> anyhow::Result<()> {
    let requests = [
        ("INST-001", MATHEMATICS, 300, Priority::Critical),
        ("INST-001", LITERATURE, 300, Priority::High),
        ("INST-002", MATHEMATICS, 250, Priority::Medium),
        ("INST-002", SCIENCE, 250, Priority::Medium),
        ("INST-003", SCIENCE, 400, Priority::High),
        ("INST-003", HISTORY, 200, Priority::Medium),
        ("INST-004", LITERATURE, 100, Priority::Low),
        ("INST-004", HISTORY, 100, Priority::Low),
    ];
    for (inst, title, qty, priority) in requests {
        system.submit_request(&InstitutionId::parse(inst)?, CatalogId::parse(title)?, qty, priority)?;
    }
    Ok(())
}

fn log_cycle(report: &CycleReport) {
    for notice in &report.notices {
        tracing::info!(
            cycle = report.cycle,
            institution = %notice.institution_name,
            units = notice.units_received,
            "{}",
            notice.message()
        );
    }
}

//! Read-only export views.
//!
//! Rows expose their fields as strings in a fixed column order so callers can
//! write them with any tabular writer; the whole snapshot serializes to JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookdist_core::CatalogId;
use bookdist_institutions::Institution;
use bookdist_inventory::StockLevel;

use crate::loans::Loan;
use crate::strategy::AllocationStrategy;

pub const INVENTORY_COLUMNS: [&str; 8] = [
    "ISBN",
    "Title",
    "Author",
    "Category",
    "Year",
    "Publisher",
    "Price",
    "Available",
];

pub const INSTITUTION_COLUMNS: [&str; 9] = [
    "Institution ID",
    "Name",
    "Type",
    "Location",
    "Students",
    "Total Requests",
    "Fulfilled",
    "Partially Fulfilled",
    "Pending",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub year: i32,
    pub publisher: String,
    /// Minor units.
    pub price: u64,
    pub available: u32,
}

impl InventoryRow {
    pub fn from_level(level: &StockLevel) -> Self {
        let e = &level.entry;
        Self {
            isbn: e.catalog_id().to_string(),
            title: e.title().to_string(),
            author: e.author().to_string(),
            category: e.category().name().to_string(),
            year: e.year(),
            publisher: e.publisher().to_string(),
            price: e.price(),
            available: level.available,
        }
    }

    /// Fields in [`INVENTORY_COLUMNS`] order. Price is printed in major units.
    pub fn record(&self) -> Vec<String> {
        vec![
            self.isbn.clone(),
            self.title.clone(),
            self.author.clone(),
            self.category.clone(),
            self.year.to_string(),
            self.publisher.clone(),
            format_price(self.price),
            self.available.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionRow {
    pub institution_id: String,
    pub name: String,
    pub kind: String,
    pub location: String,
    pub students: u32,
    pub total_requests: usize,
    pub fulfilled: usize,
    pub partially_fulfilled: usize,
    pub pending: usize,
}

impl InstitutionRow {
    pub fn from_institution(institution: &Institution) -> Self {
        let counts = institution.request_counts();
        Self {
            institution_id: institution.id_typed().to_string(),
            name: institution.name().to_string(),
            kind: institution.kind().name().to_string(),
            location: institution.location().to_string(),
            students: institution.student_count(),
            total_requests: counts.total,
            fulfilled: counts.fulfilled,
            partially_fulfilled: counts.partially_fulfilled,
            pending: counts.pending,
        }
    }

    /// Fields in [`INSTITUTION_COLUMNS`] order.
    pub fn record(&self) -> Vec<String> {
        vec![
            self.institution_id.clone(),
            self.name.clone(),
            self.kind.clone(),
            self.location.clone(),
            self.students.to_string(),
            self.total_requests.to_string(),
            self.fulfilled.to_string(),
            self.partially_fulfilled.to_string(),
            self.pending.to_string(),
        ]
    }
}

fn format_price(minor: u64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

/// Headline numbers across the whole system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionSummary {
    pub titles: usize,
    pub units_available: u64,
    pub units_on_loan: u64,
    pub institutions: usize,
    pub total_requests: usize,
    pub fulfilled: usize,
    pub partially_fulfilled: usize,
    pub pending: usize,
    pub rejected: usize,
    pub active_loans: usize,
    pub waiting_entries: usize,
}

impl DistributionSummary {
    /// Share of all requests that are fully fulfilled, in percent.
    pub fn fulfilled_percent(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.fulfilled as f64 * 100.0 / self.total_requests as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub taken_at: DateTime<Utc>,
    pub strategy: AllocationStrategy,
    pub summary: DistributionSummary,
    pub inventory: Vec<InventoryRow>,
    pub institutions: Vec<InstitutionRow>,
    pub loans: Vec<Loan>,
    pub waiting: BTreeMap<CatalogId, usize>,
}

impl SystemSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn inventory_records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.inventory.iter().map(InventoryRow::record)
    }

    pub fn institution_records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.institutions.iter().map(InstitutionRow::record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookdist_core::InstitutionId;
    use bookdist_institutions::{InstitutionKind, Priority, Request};
    use bookdist_inventory::{CatalogEntry, Category};

    fn level() -> StockLevel {
        StockLevel {
            entry: CatalogEntry::new(
                CatalogId::parse("1000000002").unwrap(),
                "English Literature",
                "Ms. B. Singh",
                Category::Literature,
                2023,
                "Oxford",
                18050,
            )
            .unwrap(),
            available: 150,
        }
    }

    #[test]
    fn inventory_record_follows_columns() {
        let record = InventoryRow::from_level(&level()).record();
        assert_eq!(record.len(), INVENTORY_COLUMNS.len());
        assert_eq!(
            record,
            vec![
                "1000000002",
                "English Literature",
                "Ms. B. Singh",
                "Literature",
                "2023",
                "Oxford",
                "180.50",
                "150",
            ]
        );
    }

    #[test]
    fn price_formatting_pads_minor_units() {
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(25000), "250.00");
    }

    #[test]
    fn institution_record_counts_requests() {
        let inst = Institution::new(
            InstitutionId::parse("INST-003").unwrap(),
            "National Science College",
            InstitutionKind::College,
            "Bangalore",
            500,
        )
        .unwrap();
        let isbn = CatalogId::parse("1000000003").unwrap();
        let a = inst.submit(Request::new(isbn.clone(), 10, Priority::High, 1, Utc::now()).unwrap());
        inst.submit(Request::new(isbn, 10, Priority::Low, 2, Utc::now()).unwrap());
        inst.fulfill_partial(a, 4).unwrap();

        let record = InstitutionRow::from_institution(&inst).record();
        assert_eq!(record.len(), INSTITUTION_COLUMNS.len());
        assert_eq!(
            record,
            vec!["INST-003", "National Science College", "College", "Bangalore", "500", "2", "0", "1", "1"]
        );
    }

    #[test]
    fn fulfilled_percent_handles_empty() {
        assert_eq!(DistributionSummary::default().fulfilled_percent(), 0.0);
        let summary = DistributionSummary {
            total_requests: 4,
            fulfilled: 1,
            ..DistributionSummary::default()
        };
        assert_eq!(summary.fulfilled_percent(), 25.0);
    }

    #[test]
    fn snapshot_serializes() {
        let mut waiting = BTreeMap::new();
        waiting.insert(CatalogId::parse("1000000002").unwrap(), 1);
        let snapshot = SystemSnapshot {
            taken_at: Utc::now(),
            strategy: AllocationStrategy::Equal,
            summary: DistributionSummary::default(),
            inventory: vec![InventoryRow::from_level(&level())],
            institutions: Vec::new(),
            loans: Vec::new(),
            waiting,
        };
        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["strategy"], "equal");
        assert_eq!(json["inventory"][0]["available"], 150);
        assert_eq!(json["waiting"]["1000000002"], 1);
        assert_eq!(snapshot.inventory_records().count(), 1);
    }
}

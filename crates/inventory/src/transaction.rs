use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookdist_core::CatalogId;
use bookdist_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Add,
    Allocate,
    Return,
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            TransactionKind::Add => "ADD",
            TransactionKind::Allocate => "ALLOCATE",
            TransactionKind::Return => "RETURN",
        })
    }
}

/// One append-only line of the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub kind: TransactionKind,
    pub catalog_id: CatalogId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

impl Event for StockTransaction {
    fn event_type(&self) -> &'static str {
        match self.kind {
            TransactionKind::Add => "inventory.stock.added",
            TransactionKind::Allocate => "inventory.stock.allocated",
            TransactionKind::Return => "inventory.stock.returned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

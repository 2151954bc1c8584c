//! Field validation shared by entity constructors.
//!
//! The `is_valid_*` predicates are pure checks; the `ensure_*` helpers wrap them
//! into `DomainResult` so constructors can bail out with `?`.

use crate::error::{DomainError, DomainResult};

/// Upper bound (exclusive) for any single stock or request quantity.
pub const MAX_QUANTITY: u32 = 1_000_000;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// 10 or 13 ASCII digits once hyphens are removed.
pub fn is_valid_catalog_id(raw: &str) -> bool {
    let mut digits = 0usize;
    for c in raw.chars() {
        match c {
            '-' => {}
            '0'..='9' => digits += 1,
            _ => return false,
        }
    }
    digits == 10 || digits == 13
}

pub fn is_valid_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

pub fn is_valid_quantity(qty: u32) -> bool {
    qty > 0 && qty < MAX_QUANTITY
}

/// `local@domain.tld` where the top-level label has at least two letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

/// Exactly ten digits, nothing else.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

pub fn ensure_quantity(qty: u32) -> DomainResult<u32> {
    if !is_valid_quantity(qty) {
        return Err(DomainError::invalid_input(format!(
            "quantity {qty} must be between 1 and {}",
            MAX_QUANTITY - 1
        )));
    }
    Ok(qty)
}

pub fn ensure_year(year: i32) -> DomainResult<i32> {
    if !is_valid_year(year) {
        return Err(DomainError::invalid_input(format!(
            "publication year {year} outside {MIN_YEAR}..={MAX_YEAR}"
        )));
    }
    Ok(year)
}

pub fn ensure_email(email: &str) -> DomainResult<()> {
    if !is_valid_email(email) {
        return Err(DomainError::invalid_input(format!("invalid email '{email}'")));
    }
    Ok(())
}

pub fn ensure_phone(phone: &str) -> DomainResult<()> {
    if !is_valid_phone(phone) {
        return Err(DomainError::invalid_input(format!(
            "invalid phone '{phone}' (expected 10 digits)"
        )));
    }
    Ok(())
}

/// Reject blank text fields (titles, names, locations).
pub fn ensure_not_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_input(format!("{field} cannot be empty")));
    }
    Ok(())
}

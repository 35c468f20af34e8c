//! Phone normalization and the phone → orders index.

use std::collections::HashMap;

use mkp_schemas::{EngineError, OrderId};

/// Strip everything but ASCII digits. `"(555) 010-2030"` → `"5550102030"`.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize and check a customer phone.
///
/// `required_digits == 0` accepts any non-empty digit string.
pub fn validate_phone(raw: &str, required_digits: usize) -> Result<String, EngineError> {
    let digits = normalize_phone(raw);
    if digits.is_empty() {
        return Err(EngineError::validation(
            "customer_phone",
            "must contain at least one digit",
        ));
    }
    if required_digits > 0 && digits.len() != required_digits {
        return Err(EngineError::validation(
            "customer_phone",
            format!(
                "must have exactly {required_digits} digits, got {}",
                digits.len()
            ),
        ));
    }
    Ok(digits)
}

/// Normalized phone → order ids, in placement order.
///
/// Owned by the ledger and mutated only alongside the order map.
#[derive(Debug, Default)]
pub struct PhoneIndex {
    by_phone: HashMap<String, Vec<OrderId>>,
}

impl PhoneIndex {
    pub fn insert(&mut self, phone: &str, order_id: OrderId) {
        self.by_phone
            .entry(phone.to_string())
            .or_default()
            .push(order_id);
    }

    pub fn remove(&mut self, phone: &str, order_id: OrderId) {
        if let Some(ids) = self.by_phone.get_mut(phone) {
            ids.retain(|id| *id != order_id);
            if ids.is_empty() {
                self.by_phone.remove(phone);
            }
        }
    }

    /// Ids for an already-normalized phone.
    pub fn lookup(&self, phone: &str) -> &[OrderId] {
        self.by_phone.get(phone).map(Vec::as_slice).unwrap_or(&[])
    }
}

//! Order input validation shared by every ledger backend.

use mkp_schemas::{EngineError, ItemId, NewOrder};

use crate::phone::validate_phone;

/// A [`NewOrder`] that passed every check that does not need storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub item_id: ItemId,
    pub quantity: i64,
    pub customer_name: String,
    /// Normalized.
    pub customer_phone: String,
    pub delivery_address: String,
}

fn required(field: &'static str, value: &str) -> Result<String, EngineError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(EngineError::validation(field, "must not be empty"));
    }
    Ok(t.to_string())
}

pub fn validate_new_order(new: &NewOrder, phone_digits: usize) -> Result<ValidatedOrder, EngineError> {
    if new.quantity < 1 {
        return Err(EngineError::validation(
            "quantity",
            format!("must be >= 1, got {}", new.quantity),
        ));
    }
    Ok(ValidatedOrder {
        item_id: new.item_id,
        quantity: new.quantity,
        customer_name: required("customer_name", &new.customer_name)?,
        customer_phone: validate_phone(&new.customer_phone, phone_digits)?,
        delivery_address: required("delivery_address", &new.delivery_address)?,
    })
}

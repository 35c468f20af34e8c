//! Item field validation.
//!
//! Shared by the in-memory store and the Postgres backend so both enforce
//! identical rules. Every function is pure; a failing check never leaves a
//! half-applied item behind because [`apply_patch`] works on a copy.

use chrono::{DateTime, Utc};
use mkp_schemas::{normalize_tags, EngineError, Item, ItemId, ItemPatch, Micros, NewItem};

pub fn validate_name(name: &str) -> Result<String, EngineError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation("name", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_price(price: Micros) -> Result<Micros, EngineError> {
    if price.is_negative() {
        return Err(EngineError::validation(
            "price",
            format!("must be >= 0, got {price}"),
        ));
    }
    Ok(price)
}

pub fn validate_stock(stock: i64) -> Result<i64, EngineError> {
    if stock < 0 {
        return Err(EngineError::validation(
            "stock",
            format!("must be >= 0, got {stock}"),
        ));
    }
    Ok(stock)
}

pub fn validate_discount(discount_pct: i64) -> Result<u8, EngineError> {
    match u8::try_from(discount_pct) {
        Ok(d) if d <= 100 => Ok(d),
        _ => Err(EngineError::validation(
            "discount_pct",
            format!("must be within 0..=100, got {discount_pct}"),
        )),
    }
}

/// Validate a [`NewItem`] and materialize it as a stored [`Item`].
pub fn build_item(item_id: ItemId, new: &NewItem, now: DateTime<Utc>) -> Result<Item, EngineError> {
    Ok(Item {
        item_id,
        name: validate_name(&new.name)?,
        price_micros: validate_price(new.price_micros)?,
        stock: validate_stock(new.stock)?,
        discount_pct: validate_discount(new.discount_pct)?,
        tags: normalize_tags(&new.tags),
        created_at_utc: now,
        updated_at_utc: now,
    })
}

/// Return `item` with `patch` applied, or the first validation failure.
///
/// `updated_at_utc` is bumped only when the patch is non-empty.
pub fn apply_patch(item: &Item, patch: &ItemPatch, now: DateTime<Utc>) -> Result<Item, EngineError> {
    let mut next = item.clone();
    if let Some(name) = &patch.name {
        next.name = validate_name(name)?;
    }
    if let Some(price) = patch.price_micros {
        next.price_micros = validate_price(price)?;
    }
    if let Some(stock) = patch.stock {
        next.stock = validate_stock(stock)?;
    }
    if let Some(discount) = patch.discount_pct {
        next.discount_pct = validate_discount(discount)?;
    }
    if let Some(tags) = &patch.tags {
        next.tags = normalize_tags(tags);
    }
    if !patch.is_empty() {
        next.updated_at_utc = now;
    }
    Ok(next)
}

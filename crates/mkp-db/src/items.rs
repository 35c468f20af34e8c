use chrono::{DateTime, Utc};
use mkp_catalog::validate::{apply_patch, build_item};
use mkp_orders::ItemDeletePolicy;
use mkp_schemas::{EngineError, Item, ItemId, ItemPatch, Micros, NewItem};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

use crate::storage;

const ITEM_COLUMNS: &str = "item_id, name, price_micros, stock, discount_pct, tags, created_at_utc, updated_at_utc";

pub(crate) fn item_from_row(row: &PgRow) -> Result<Item, EngineError> {
    let discount: i16 = row.try_get("discount_pct").map_err(storage)?;
    Ok(Item {
        item_id: ItemId(row.try_get("item_id").map_err(storage)?),
        name: row.try_get("name").map_err(storage)?,
        price_micros: Micros::new(row.try_get("price_micros").map_err(storage)?),
        stock: row.try_get("stock").map_err(storage)?,
        discount_pct: u8::try_from(discount)
            .map_err(|_| EngineError::storage(format!("discount_pct out of range: {discount}")))?,
        tags: row.try_get("tags").map_err(storage)?,
        created_at_utc: row.try_get("created_at_utc").map_err(storage)?,
        updated_at_utc: row.try_get("updated_at_utc").map_err(storage)?,
    })
}

/// Validate and insert a new item.
pub async fn insert_item(
    pool: &PgPool,
    item_id: ItemId,
    new: &NewItem,
    now: DateTime<Utc>,
) -> Result<Item, EngineError> {
    let item = build_item(item_id, new, now)?;

    sqlx::query(
        r#"
        insert into items (
          item_id, name, price_micros, stock, discount_pct, tags, created_at_utc, updated_at_utc
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8
        )
        "#,
    )
    .bind(item.item_id.0)
    .bind(&item.name)
    .bind(item.price_micros.raw())
    .bind(item.stock)
    .bind(i16::from(item.discount_pct))
    .bind(&item.tags)
    .bind(item.created_at_utc)
    .bind(item.updated_at_utc)
    .execute(pool)
    .await
    .map_err(storage)?;

    info!(item_id = %item.item_id, name = %item.name, "db/catalog/add");
    Ok(item)
}

async fn lock_item(
    tx: &mut Transaction<'_, Postgres>,
    item_id: ItemId,
) -> Result<Item, EngineError> {
    let sql = format!("select {ITEM_COLUMNS} from items where item_id = $1 for update");
    let row = sqlx::query(&sql)
        .bind(item_id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage)?
        .ok_or(EngineError::ItemNotFound { item_id })?;
    item_from_row(&row)
}

/// Partial update under a row lock. A failing patch writes nothing.
pub async fn update_item(
    pool: &PgPool,
    item_id: ItemId,
    patch: &ItemPatch,
    now: DateTime<Utc>,
) -> Result<Item, EngineError> {
    let mut tx = pool.begin().await.map_err(storage)?;
    let current = lock_item(&mut tx, item_id).await?;
    let next = apply_patch(&current, patch, now)?;

    sqlx::query(
        r#"
        update items
           set name = $2, price_micros = $3, stock = $4, discount_pct = $5,
               tags = $6, updated_at_utc = $7
         where item_id = $1
        "#,
    )
    .bind(item_id.0)
    .bind(&next.name)
    .bind(next.price_micros.raw())
    .bind(next.stock)
    .bind(i16::from(next.discount_pct))
    .bind(&next.tags)
    .bind(next.updated_at_utc)
    .execute(&mut *tx)
    .await
    .map_err(storage)?;

    tx.commit().await.map_err(storage)?;
    info!(item_id = %item_id, "db/catalog/update");
    Ok(next)
}

/// Delete an item subject to `policy`.
///
/// The item row is locked first. Placement decrements stock through the
/// same row, so no order for this item can commit between the pending
/// count and the delete.
pub async fn delete_item(
    pool: &PgPool,
    item_id: ItemId,
    policy: ItemDeletePolicy,
) -> Result<(), EngineError> {
    let mut tx = pool.begin().await.map_err(storage)?;
    lock_item(&mut tx, item_id).await?;

    if policy == ItemDeletePolicy::RejectPendingOrders {
        let (pending,): (i64,) = sqlx::query_as(
            "select count(*)::bigint from orders where item_id = $1 and status = 'pending'",
        )
        .bind(item_id.0)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        if pending > 0 {
            return Err(EngineError::ItemInUse {
                item_id,
                pending_orders: usize::try_from(pending).unwrap_or(usize::MAX),
            });
        }
    }

    sqlx::query("delete from items where item_id = $1")
        .bind(item_id.0)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

    tx.commit().await.map_err(storage)?;
    info!(item_id = %item_id, policy = policy.as_str(), "db/catalog/delete");
    Ok(())
}

pub async fn get_item(pool: &PgPool, item_id: ItemId) -> Result<Item, EngineError> {
    let sql = format!("select {ITEM_COLUMNS} from items where item_id = $1");
    let row = sqlx::query(&sql)
        .bind(item_id.0)
        .fetch_optional(pool)
        .await
        .map_err(storage)?
        .ok_or(EngineError::ItemNotFound { item_id })?;
    item_from_row(&row)
}

/// All items in insertion order.
pub async fn list_items(pool: &PgPool) -> Result<Vec<Item>, EngineError> {
    let sql = format!("select {ITEM_COLUMNS} from items order by seq");
    let rows = sqlx::query(&sql).fetch_all(pool).await.map_err(storage)?;
    rows.iter().map(item_from_row).collect()
}

use chrono::{DateTime, Utc};
use mkp_orders::{check_transition, normalize_phone, validate_new_order, LedgerSettings, LifecyclePolicy};
use mkp_pricing::compute_charge;
use mkp_schemas::{EngineError, ItemId, Micros, NewOrder, Order, OrderId, OrderStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::storage;

const ORDER_COLUMNS: &str = "order_id, item_id, item_name, quantity, unit_price_micros, discount_pct, \
     charged_total_micros, customer_name, customer_phone, delivery_address, status, \
     created_at_utc, estimated_delivery_utc";

fn order_from_row(row: &PgRow) -> Result<Order, EngineError> {
    let discount: i16 = row.try_get("discount_pct").map_err(storage)?;
    let status: String = row.try_get("status").map_err(storage)?;
    Ok(Order {
        order_id: OrderId(row.try_get("order_id").map_err(storage)?),
        item_id: ItemId(row.try_get("item_id").map_err(storage)?),
        item_name: row.try_get("item_name").map_err(storage)?,
        quantity: row.try_get("quantity").map_err(storage)?,
        unit_price_micros: Micros::new(row.try_get("unit_price_micros").map_err(storage)?),
        discount_pct: u8::try_from(discount)
            .map_err(|_| EngineError::storage(format!("discount_pct out of range: {discount}")))?,
        charged_total_micros: Micros::new(row.try_get("charged_total_micros").map_err(storage)?),
        customer_name: row.try_get("customer_name").map_err(storage)?,
        customer_phone: row.try_get("customer_phone").map_err(storage)?,
        delivery_address: row.try_get("delivery_address").map_err(storage)?,
        status: OrderStatus::parse(&status)
            .map_err(|_| EngineError::storage(format!("unknown stored status: {status}")))?,
        created_at_utc: row.try_get("created_at_utc").map_err(storage)?,
        estimated_delivery_utc: row.try_get("estimated_delivery_utc").map_err(storage)?,
    })
}

/// Place one order in a single transaction.
///
/// The conditional `update ... where stock >= $2` is the atomic
/// check-and-decrement; its `returning` clause is the price snapshot. Any
/// failure after it drops the transaction, which rolls the decrement back.
pub async fn place_order(
    pool: &PgPool,
    order_id: OrderId,
    new: &NewOrder,
    now: DateTime<Utc>,
    settings: &LedgerSettings,
) -> Result<Order, EngineError> {
    let valid = validate_new_order(new, settings.phone_digits)?;
    let mut tx = pool.begin().await.map_err(storage)?;

    let reserved = sqlx::query(
        r#"
        update items
           set stock = stock - $2
         where item_id = $1 and stock >= $2
        returning name, price_micros, discount_pct
        "#,
    )
    .bind(valid.item_id.0)
    .bind(valid.quantity)
    .fetch_optional(&mut *tx)
    .await
    .map_err(storage)?;

    let Some(snap) = reserved else {
        let available: Option<(i64,)> = sqlx::query_as("select stock from items where item_id = $1")
            .bind(valid.item_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        return Err(match available {
            None => EngineError::ItemNotFound {
                item_id: valid.item_id,
            },
            Some((available,)) => {
                warn!(
                    item_id = %valid.item_id,
                    requested = valid.quantity,
                    available,
                    "db/orders/place rejected: insufficient stock"
                );
                EngineError::InsufficientStock {
                    item_id: valid.item_id,
                    requested: valid.quantity,
                    available,
                }
            }
        });
    };

    let item_name: String = snap.try_get("name").map_err(storage)?;
    let unit_price = Micros::new(snap.try_get("price_micros").map_err(storage)?);
    let discount: i16 = snap.try_get("discount_pct").map_err(storage)?;
    let discount_pct = u8::try_from(discount)
        .map_err(|_| EngineError::storage(format!("discount_pct out of range: {discount}")))?;
    let total = compute_charge(unit_price, discount_pct, valid.quantity)?;

    let order = Order {
        order_id,
        item_id: valid.item_id,
        item_name,
        quantity: valid.quantity,
        unit_price_micros: unit_price,
        discount_pct,
        charged_total_micros: total,
        customer_name: valid.customer_name,
        customer_phone: valid.customer_phone,
        delivery_address: valid.delivery_address,
        status: OrderStatus::Pending,
        created_at_utc: now,
        estimated_delivery_utc: settings.delivery.at_placement(now)?,
    };

    sqlx::query(
        r#"
        insert into orders (
          order_id, item_id, item_name, quantity, unit_price_micros, discount_pct,
          charged_total_micros, customer_name, customer_phone, delivery_address,
          status, created_at_utc, estimated_delivery_utc
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
        )
        "#,
    )
    .bind(order.order_id.0)
    .bind(order.item_id.0)
    .bind(&order.item_name)
    .bind(order.quantity)
    .bind(order.unit_price_micros.raw())
    .bind(i16::from(order.discount_pct))
    .bind(order.charged_total_micros.raw())
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.delivery_address)
    .bind(order.status.as_str())
    .bind(order.created_at_utc)
    .bind(order.estimated_delivery_utc)
    .execute(&mut *tx)
    .await
    .map_err(storage)?;

    tx.commit().await.map_err(storage)?;

    info!(
        order_id = %order.order_id,
        item_id = %order.item_id,
        quantity = order.quantity,
        total = %order.charged_total_micros,
        "db/orders/place"
    );
    Ok(order)
}

/// All orders, oldest first.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>, EngineError> {
    let sql = format!("select {ORDER_COLUMNS} from orders order by seq");
    let rows = sqlx::query(&sql).fetch_all(pool).await.map_err(storage)?;
    rows.iter().map(order_from_row).collect()
}

pub async fn get_order(pool: &PgPool, order_id: OrderId) -> Result<Order, EngineError> {
    let sql = format!("select {ORDER_COLUMNS} from orders where order_id = $1");
    let row = sqlx::query(&sql)
        .bind(order_id.0)
        .fetch_optional(pool)
        .await
        .map_err(storage)?
        .ok_or(EngineError::OrderNotFound { order_id })?;
    order_from_row(&row)
}

/// Orders for a phone, normalized the same way placement normalizes it.
pub async fn find_orders_by_phone(pool: &PgPool, phone: &str) -> Result<Vec<Order>, EngineError> {
    let key = normalize_phone(phone);
    if key.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("select {ORDER_COLUMNS} from orders where customer_phone = $1 order by seq");
    let rows = sqlx::query(&sql)
        .bind(&key)
        .fetch_all(pool)
        .await
        .map_err(storage)?;
    rows.iter().map(order_from_row).collect()
}

/// Remove an order and return it. Stock is not restored.
pub async fn delete_order(pool: &PgPool, order_id: OrderId) -> Result<Order, EngineError> {
    let sql = format!("delete from orders where order_id = $1 returning {ORDER_COLUMNS}");
    let row = sqlx::query(&sql)
        .bind(order_id.0)
        .fetch_optional(pool)
        .await
        .map_err(storage)?
        .ok_or(EngineError::OrderNotFound { order_id })?;
    let order = order_from_row(&row)?;
    info!(order_id = %order_id, status = %order.status, "db/orders/delete");
    Ok(order)
}

/// Set an order's status under a row lock, checked against `policy`.
/// Only the `status` column is written.
pub async fn set_order_status(
    pool: &PgPool,
    order_id: OrderId,
    requested: &str,
    policy: LifecyclePolicy,
) -> Result<Order, EngineError> {
    let mut tx = pool.begin().await.map_err(storage)?;

    let sql = format!("select {ORDER_COLUMNS} from orders where order_id = $1 for update");
    let row = sqlx::query(&sql)
        .bind(order_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?
        .ok_or(EngineError::OrderNotFound { order_id })?;
    let mut order = order_from_row(&row)?;

    let to = OrderStatus::parse(requested)?;
    check_transition(policy, order.status, to)?;

    sqlx::query("update orders set status = $2 where order_id = $1")
        .bind(order_id.0)
        .bind(to.as_str())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
    tx.commit().await.map_err(storage)?;

    order.status = to;
    info!(order_id = %order_id, status = %to, policy = policy.as_str(), "db/orders/status");
    Ok(order)
}

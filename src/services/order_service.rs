use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QuerySelect, RelationTrait, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::sales::{
        CreateBasketRequest, CreateOrderRequest, CreatePaymentRequest, UpdateBasketRequest,
        UpdateOrderRequest, UpdatePaymentRequest,
    },
    entity::{
        Baskets, Coupons, OrderItems, Orders, Payments, Products, Transactions, Users, baskets,
        coupons, order_items, orders, payments, products, transactions, users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::resource::{
        Creatable, Resource, Updatable, embed, ensure_exists, load_by_ids, required, to_json,
    },
    state::AppState,
};

pub const ORDER_STATUSES: [&str; 5] = ["pending", "paid", "shipped", "completed", "cancelled"];
pub const PAYMENT_STATUSES: [&str; 4] = ["pending", "paid", "failed", "refunded"];

pub fn validate_order_status(status: &str) -> AppResult<()> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid order status: {status}")))
    }
}

pub fn validate_payment_status(status: &str) -> AppResult<()> {
    if PAYMENT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid payment status: {status}")))
    }
}

/// Discount in minor units for `subtotal`, rejecting inactive, expired or used-up coupons.
pub fn coupon_discount(
    subtotal: i64,
    coupon: &coupons::Model,
    now: DateTime<Utc>,
) -> AppResult<i64> {
    if !coupon.is_active {
        return Err(AppError::BadRequest("Coupon is not active".into()));
    }
    if coupon.expires_at.is_some_and(|expires_at| expires_at <= now) {
        return Err(AppError::BadRequest("Coupon has expired".into()));
    }
    if coupon.used_count >= coupon.max_uses {
        return Err(AppError::BadRequest("Coupon has no uses left".into()));
    }
    Ok(subtotal * i64::from(coupon.percent) / 100)
}

pub struct BasketResource;

impl Resource for BasketResource {
    type Entity = Baskets;
    const NAME: &'static str = "baskets";
    const LABEL: &'static str = "Basket";

    fn id(model: &baskets::Model) -> Uuid {
        model.id
    }

    async fn populate(state: &AppState, models: Vec<baskets::Model>) -> AppResult<Vec<Value>> {
        let product_ids = models.iter().map(|m| m.product_id).collect();
        let products = load_by_ids::<Products>(state, products::Column::Id, product_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "product", products.get(&model.product_id));
                Ok(item)
            })
            .collect()
    }
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

impl Creatable for BasketResource {
    type Create = CreateBasketRequest;

    /// Sets the quantity of an existing (user, product) line instead of adding a second one.
    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateBasketRequest,
    ) -> AppResult<baskets::Model> {
        validate_quantity(payload.quantity)?;
        ensure_exists::<Users>(state, payload.user_id, "User").await?;
        ensure_exists::<Products>(state, payload.product_id, "Product").await?;

        let now = Utc::now();
        let existing = Baskets::find()
            .filter(baskets::Column::UserId.eq(payload.user_id))
            .filter(baskets::Column::ProductId.eq(payload.product_id))
            .one(&state.orm)
            .await?;

        let model = match existing {
            Some(line) => {
                let mut active: baskets::ActiveModel = line.into();
                active.quantity = Set(payload.quantity);
                active.updated_at = Set(now.into());
                active.update(&state.orm).await?
            }
            None => {
                baskets::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    code: NotSet,
                    user_id: Set(payload.user_id),
                    product_id: Set(payload.product_id),
                    quantity: Set(payload.quantity),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(&state.orm)
                .await?
            }
        };
        Ok(model)
    }
}

impl Updatable for BasketResource {
    type Update = UpdateBasketRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: baskets::Model,
        payload: UpdateBasketRequest,
    ) -> AppResult<baskets::Model> {
        validate_quantity(payload.quantity)?;
        let mut active: baskets::ActiveModel = current.into();
        active.quantity = Set(payload.quantity);
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct OrderResource;

impl Resource for OrderResource {
    type Entity = Orders;
    const NAME: &'static str = "orders";
    const LABEL: &'static str = "Order";

    fn id(model: &orders::Model) -> Uuid {
        model.id
    }

    async fn populate(state: &AppState, models: Vec<orders::Model>) -> AppResult<Vec<Value>> {
        let order_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let user_ids = models.iter().map(|m| m.user_id).collect();

        let mut items: HashMap<Uuid, Vec<Value>> = HashMap::new();
        if !order_ids.is_empty() {
            let rows = OrderItems::find()
                .filter(order_items::Column::OrderId.is_in(order_ids))
                .all(&state.orm)
                .await?;
            for row in rows {
                items.entry(row.order_id).or_default().push(to_json(&row)?);
            }
        }
        let users = load_by_ids::<Users>(state, users::Column::Id, user_ids).await?;

        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "user", users.get(&model.user_id));
                let lines = items.remove(&model.id).unwrap_or_default();
                embed(&mut item, "items", Some(&Value::Array(lines)));
                Ok(item)
            })
            .collect()
    }
}

#[derive(Debug, FromQueryResult)]
struct BasketLine {
    product_id: Uuid,
    quantity: i32,
    title: String,
    price: i64,
    stock: i32,
    is_active: bool,
}

impl Creatable for OrderResource {
    type Create = CreateOrderRequest;

    /// Checks out the user's basket in one transaction.
    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateOrderRequest,
    ) -> AppResult<orders::Model> {
        let address = required("address", &payload.address)?;
        ensure_exists::<Users>(state, payload.user_id, "User").await?;

        let txn = state.orm.begin().await?;

        let lines = Baskets::find()
            .select_only()
            .column(baskets::Column::ProductId)
            .column(baskets::Column::Quantity)
            .join(JoinType::InnerJoin, baskets::Relation::Products.def())
            .column(products::Column::Title)
            .column(products::Column::Price)
            .column(products::Column::Stock)
            .column(products::Column::IsActive)
            .filter(baskets::Column::UserId.eq(payload.user_id))
            .lock(LockType::Update)
            .into_model::<BasketLine>()
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(AppError::BadRequest("Basket is empty".into()));
        }

        let mut subtotal: i64 = 0;
        for line in &lines {
            if !line.is_active {
                return Err(AppError::BadRequest(format!(
                    "Product {} is not available",
                    line.title
                )));
            }
            if line.stock < line.quantity {
                return Err(AppError::BadRequest(format!(
                    "Insufficient stock for product {}",
                    line.title
                )));
            }
            subtotal += line.price * i64::from(line.quantity);
        }

        let now = Utc::now();
        let discount = match payload.coupon_id {
            Some(coupon_id) => {
                let coupon = Coupons::find_by_id(coupon_id)
                    .lock(LockType::Update)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("Coupon does not exist".into()))?;
                coupon_discount(subtotal, &coupon, now)?
            }
            None => 0,
        };

        let order = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            user_id: Set(payload.user_id),
            coupon_id: Set(payload.coupon_id),
            address: Set(address),
            subtotal: Set(subtotal),
            discount: Set(discount),
            total_amount: Set(subtotal - discount),
            status: Set("pending".into()),
            payment_status: Set("unpaid".into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(Some(line.product_id)),
                title: Set(line.title.clone()),
                price: Set(line.price),
                quantity: Set(line.quantity),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;

            Products::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).sub(line.quantity),
                )
                .filter(products::Column::Id.eq(line.product_id))
                .exec(&txn)
                .await?;
        }

        Baskets::delete_many()
            .filter(baskets::Column::UserId.eq(payload.user_id))
            .exec(&txn)
            .await?;

        if let Some(coupon_id) = payload.coupon_id {
            Coupons::update_many()
                .col_expr(
                    coupons::Column::UsedCount,
                    Expr::col(coupons::Column::UsedCount).add(1),
                )
                .filter(coupons::Column::Id.eq(coupon_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total = order.total_amount,
            "checkout completed"
        );
        Ok(order)
    }
}

impl Updatable for OrderResource {
    type Update = UpdateOrderRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: orders::Model,
        payload: UpdateOrderRequest,
    ) -> AppResult<orders::Model> {
        let mut active: orders::ActiveModel = current.into();
        if let Some(status) = payload.status {
            validate_order_status(&status)?;
            active.status = Set(status);
        }
        if let Some(address) = payload.address {
            active.address = Set(required("address", &address)?);
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct PaymentResource;

impl Resource for PaymentResource {
    type Entity = Payments;
    const NAME: &'static str = "payments";
    const LABEL: &'static str = "Payment";

    fn id(model: &payments::Model) -> Uuid {
        model.id
    }

    async fn populate(state: &AppState, models: Vec<payments::Model>) -> AppResult<Vec<Value>> {
        let order_ids = models.iter().map(|m| m.order_id).collect();
        let orders = load_by_ids::<Orders>(state, orders::Column::Id, order_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "order", orders.get(&model.order_id));
                Ok(item)
            })
            .collect()
    }
}

impl Creatable for PaymentResource {
    type Create = CreatePaymentRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreatePaymentRequest,
    ) -> AppResult<payments::Model> {
        let method = required("method", &payload.method)?;
        let order = ensure_exists::<Orders>(state, payload.order_id, "Order").await?;
        if order.payment_status == "paid" {
            return Err(AppError::BadRequest("Order already paid".into()));
        }

        let now = Utc::now();
        let model = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            order_id: Set(order.id),
            user_id: Set(order.user_id),
            amount: Set(order.total_amount),
            method: Set(method),
            status: Set("pending".into()),
            reference: Set(payload.reference),
            paid_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for PaymentResource {
    type Update = UpdatePaymentRequest;

    /// Re-reads the payment under a row lock so concurrent updates see each other's status.
    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: payments::Model,
        payload: UpdatePaymentRequest,
    ) -> AppResult<payments::Model> {
        validate_payment_status(&payload.status)?;
        let txn = state.orm.begin().await?;
        let locked = Payments::find_by_id(current.id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let settlement = payment_transition(&locked.status, &payload.status)?;
        let payment = match settlement {
            Some(settlement) => settle(&txn, locked, payload, settlement).await?,
            None => update_payment_fields(&txn, locked, payload).await?,
        };
        txn.commit().await?;

        if let Some(settlement) = settlement {
            tracing::info!(
                payment_id = %payment.id,
                ?settlement,
                amount = payment.amount,
                "payment settled"
            );
        }
        Ok(payment)
    }
}

/// Which settlement, if any, moving a payment from `from` to `to` requires.
fn payment_transition(from: &str, to: &str) -> AppResult<Option<Settlement>> {
    match (from, to) {
        (from, to) if from == to => Ok(None),
        ("paid", "refunded") => Ok(Some(Settlement::Refund)),
        ("paid", _) => Err(AppError::BadRequest(
            "A paid payment can only be refunded".into(),
        )),
        ("refunded", _) => Err(AppError::BadRequest(
            "A refunded payment cannot change status".into(),
        )),
        (_, "paid") => Ok(Some(Settlement::Payment)),
        (_, "refunded") => Err(AppError::BadRequest(
            "Only a paid payment can be refunded".into(),
        )),
        _ => Ok(None),
    }
}

async fn update_payment_fields(
    txn: &DatabaseTransaction,
    current: payments::Model,
    payload: UpdatePaymentRequest,
) -> AppResult<payments::Model> {
    let mut active: payments::ActiveModel = current.into();
    active.status = Set(payload.status);
    if payload.reference.is_some() {
        active.reference = Set(payload.reference);
    }
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(txn).await?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Payment,
    Refund,
}

/// Updates the locked payment and its order and writes a ledger transaction.
async fn settle(
    txn: &DatabaseTransaction,
    current: payments::Model,
    payload: UpdatePaymentRequest,
    settlement: Settlement,
) -> AppResult<payments::Model> {
    let now = Utc::now();

    let order = Orders::find_by_id(current.order_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let (order_payment_status, kind, amount) = match settlement {
        Settlement::Payment => {
            if order.payment_status == "paid" {
                return Err(AppError::BadRequest("Order already paid".into()));
            }
            ("paid", "payment", current.amount)
        }
        Settlement::Refund => ("refunded", "refund", -current.amount),
    };

    let payment_id = current.id;
    let user_id = current.user_id;
    let mut payment: payments::ActiveModel = current.into();
    payment.status = Set(payload.status);
    if payload.reference.is_some() {
        payment.reference = Set(payload.reference);
    }
    if settlement == Settlement::Payment {
        payment.paid_at = Set(Some(now.into()));
    }
    payment.updated_at = Set(now.into());
    let payment = payment.update(txn).await?;

    let order_code = order.code;
    let order_status = order.status.clone();
    let mut order: orders::ActiveModel = order.into();
    order.payment_status = Set(order_payment_status.into());
    if settlement == Settlement::Payment && order_status == "pending" {
        order.status = Set("paid".into());
    }
    order.updated_at = Set(now.into());
    order.update(txn).await?;

    record_transaction(txn, user_id, payment_id, amount, kind, order_code).await?;
    Ok(payment)
}

async fn record_transaction(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    payment_id: Uuid,
    amount: i64,
    kind: &str,
    order_code: i64,
) -> AppResult<()> {
    transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: NotSet,
        user_id: Set(user_id),
        payment_id: Set(Some(payment_id)),
        amount: Set(amount),
        kind: Set(kind.to_string()),
        description: Set(Some(format!("{kind} for order {order_code}"))),
        created_at: NotSet,
    }
    .insert(txn)
    .await?;
    Ok(())
}

pub struct TransactionResource;

impl Resource for TransactionResource {
    type Entity = Transactions;
    const NAME: &'static str = "transactions";
    const LABEL: &'static str = "Transaction";

    fn id(model: &transactions::Model) -> Uuid {
        model.id
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(percent: i32) -> coupons::Model {
        let now = Utc::now();
        coupons::Model {
            id: Uuid::new_v4(),
            code: 1,
            title: "WELCOME".into(),
            percent,
            max_uses: 2,
            used_count: 0,
            expires_at: None,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn discount_is_a_percentage_of_subtotal() {
        let discount = coupon_discount(10_000, &coupon(15), Utc::now()).expect("valid coupon");
        assert_eq!(discount, 1_500);
    }

    #[test]
    fn unusable_coupons_are_rejected() {
        let now = Utc::now();

        let mut expired = coupon(10);
        expired.expires_at = Some((now - Duration::minutes(1)).into());
        assert!(coupon_discount(100, &expired, now).is_err());

        let mut used_up = coupon(10);
        used_up.used_count = used_up.max_uses;
        assert!(coupon_discount(100, &used_up, now).is_err());

        let mut inactive = coupon(10);
        inactive.is_active = false;
        assert!(coupon_discount(100, &inactive, now).is_err());
    }

    #[test]
    fn statuses_are_checked_against_known_values() {
        assert!(validate_order_status("shipped").is_ok());
        assert!(validate_order_status("lost").is_err());
        assert!(validate_payment_status("refunded").is_ok());
        assert!(validate_payment_status("unpaid").is_err());
    }

    #[test]
    fn payment_transitions_settle_only_once() {
        assert_eq!(
            payment_transition("pending", "paid").unwrap(),
            Some(Settlement::Payment)
        );
        assert_eq!(
            payment_transition("paid", "refunded").unwrap(),
            Some(Settlement::Refund)
        );
        // A refund that lost the race re-reads `refunded` and moves no money.
        assert_eq!(payment_transition("refunded", "refunded").unwrap(), None);
        assert_eq!(payment_transition("paid", "paid").unwrap(), None);
        assert_eq!(payment_transition("pending", "failed").unwrap(), None);

        assert!(payment_transition("paid", "pending").is_err());
        assert!(payment_transition("refunded", "paid").is_err());
        assert!(payment_transition("failed", "refunded").is_err());
    }
}

//! Shared test fixtures: in-memory database, manual clock, collecting alert
//! sink, and seed helpers.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use orchard_core::{
    Batch, BatchStatus, CartItem, CartSession, CartStatus, ClockMethod, MovementType, Product,
    RegisterShift, RegisterShiftStatus, RotationMethod, StockMovement, DEFAULT_BUSINESS_ID,
};
use orchard_db::{Database, DbConfig};

use crate::notify::MemorySink;
use crate::policy::OpsPolicy;
use crate::register::StartShiftRequest;
use crate::time::{ManualClock, TimeSource};
use crate::Engine;

/// Everything a test needs in one place.
pub(crate) struct TestHarness {
    pub engine: Engine,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemorySink>,
}

/// Harness with the default policy.
pub(crate) async fn harness() -> TestHarness {
    harness_with(OpsPolicy::default()).await
}

/// Harness with a custom policy. The clock starts on a fixed Monday morning
/// so calendar-day logic is deterministic.
pub(crate) async fn harness_with(policy: OpsPolicy) -> TestHarness {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let clock = Arc::new(ManualClock::starting_at(
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
    ));
    let sink = Arc::new(MemorySink::new());

    let engine = Engine::new(db.clone(), policy, clock.clone(), sink.clone());

    TestHarness {
        engine,
        db,
        clock,
        sink,
    }
}

/// Clocks the employee in (if needed) and opens a register shift on
/// `pos-01`.
pub(crate) async fn open_register(
    h: &TestHarness,
    employee_id: &str,
    starting_cash_cents: i64,
) -> RegisterShift {
    if h.db
        .clock()
        .find_active_shift(employee_id)
        .await
        .unwrap()
        .is_none()
    {
        h.engine
            .timeclock
            .clock_in(employee_id, "pos-01", ClockMethod::Login)
            .await
            .unwrap();
    }

    h.engine
        .register
        .start_shift(StartShiftRequest::new(employee_id, starting_cash_cents).on_device("pos-01"))
        .await
        .unwrap()
}

/// Inserts an extra active register shift directly, bypassing the open
/// guards (models state left over from crashes or other devices).
pub(crate) async fn insert_register_shift(
    h: &TestHarness,
    time_shift_id: &str,
    cashier_id: &str,
    device_id: &str,
) -> RegisterShift {
    let now = h.clock.now();
    let shift = RegisterShift {
        id: Uuid::new_v4().to_string(),
        time_shift_id: time_shift_id.to_string(),
        cashier_id: cashier_id.to_string(),
        business_id: DEFAULT_BUSINESS_ID.to_string(),
        device_id: Some(device_id.to_string()),
        schedule_id: None,
        status: RegisterShiftStatus::Active,
        starting_cash_cents: 0,
        final_cash_drawer_cents: None,
        expected_cash_drawer_cents: None,
        cash_variance_cents: None,
        total_sales_cents: 0,
        total_transactions: 0,
        total_refunds_cents: 0,
        total_voids: 0,
        auto_closed: false,
        needs_reconciliation: false,
        reconciled_amount_cents: None,
        reconciled_by: None,
        reconciled_at: None,
        scheduled_end: None,
        opened_at: now,
        ended_at: None,
        created_at: now,
        updated_at: now,
    };
    h.db.registers().insert_shift(&shift).await.unwrap();
    shift
}

/// Seeds a product.
pub(crate) async fn seed_product(
    h: &TestHarness,
    sku: &str,
    track_inventory: bool,
    sold_by_weight: bool,
) -> Product {
    let now = h.clock.now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: format!("Test {sku}"),
        category_id: Some("cat-test".to_string()),
        price_cents: 100,
        track_inventory,
        sold_by_weight,
        rotation_method: RotationMethod::Fefo,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    h.db.products().insert(&product).await.unwrap();
    product
}

/// Seeds an active batch (with its receipt movement).
pub(crate) async fn seed_batch(
    h: &TestHarness,
    product: &Product,
    expiry_date: Option<NaiveDate>,
    quantity: f64,
) -> Batch {
    let now = h.clock.now();
    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        batch_number: format!("LOT-{}", &Uuid::new_v4().to_string()[..8]),
        expiry_date,
        received_at: now,
        initial_quantity: quantity,
        current_quantity: quantity,
        status: BatchStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        batch_id: Some(batch.id.clone()),
        movement_type: MovementType::Receipt,
        quantity,
        transaction_id: None,
        note: Some("test receipt".to_string()),
        created_at: now,
    };
    h.db.batches().receive_batch(&batch, &movement).await.unwrap();
    batch
}

/// A priced unit-quantity cart line for a product.
pub(crate) fn cart_line(
    product: &Product,
    batch: Option<&Batch>,
    quantity: i64,
    unit_price_cents: i64,
    tax_cents: i64,
) -> CartItem {
    CartItem {
        id: Uuid::new_v4().to_string(),
        cart_session_id: String::new(), // bound by stage_cart
        product_id: Some(product.id.clone()),
        category_id: product.category_id.clone(),
        name_snapshot: product.name.clone(),
        quantity,
        weight: None,
        unit_price_cents,
        line_total_cents: unit_price_cents * quantity,
        tax_cents,
        batch_id: batch.map(|b| b.id.clone()),
        created_at: Utc::now(),
    }
}

/// A priced weighed cart line for a product.
pub(crate) fn weighed_line(
    product: &Product,
    batch: Option<&Batch>,
    weight: f64,
    unit_price_cents: i64,
    tax_cents: i64,
) -> CartItem {
    CartItem {
        id: Uuid::new_v4().to_string(),
        cart_session_id: String::new(),
        product_id: Some(product.id.clone()),
        category_id: product.category_id.clone(),
        name_snapshot: product.name.clone(),
        quantity: 1,
        weight: Some(weight),
        unit_price_cents,
        line_total_cents: (unit_price_cents as f64 * weight).round() as i64,
        tax_cents,
        batch_id: batch.map(|b| b.id.clone()),
        created_at: Utc::now(),
    }
}

/// An open-department line with no product reference.
pub(crate) fn open_line(quantity: i64, unit_price_cents: i64, tax_cents: i64) -> CartItem {
    CartItem {
        id: Uuid::new_v4().to_string(),
        cart_session_id: String::new(),
        product_id: None,
        category_id: Some("cat-open".to_string()),
        name_snapshot: "Open item".to_string(),
        quantity,
        weight: None,
        unit_price_cents,
        line_total_cents: unit_price_cents * quantity,
        tax_cents,
        batch_id: None,
        created_at: Utc::now(),
    }
}

/// Stages an active cart session with the given lines.
pub(crate) async fn stage_cart(
    h: &TestHarness,
    cashier_id: &str,
    shift_id: Option<&str>,
    lines: Vec<CartItem>,
) -> CartSession {
    stage_cart_raw(h, cashier_id, shift_id, lines).await
}

/// Same as [`stage_cart`], named for tests that stage deliberately broken
/// lines.
pub(crate) async fn stage_cart_raw(
    h: &TestHarness,
    cashier_id: &str,
    shift_id: Option<&str>,
    lines: Vec<CartItem>,
) -> CartSession {
    let now = h.clock.now();
    let session = CartSession {
        id: Uuid::new_v4().to_string(),
        cashier_id: cashier_id.to_string(),
        shift_id: shift_id.map(String::from),
        status: CartStatus::Active,
        created_at: now,
        updated_at: now,
    };
    h.db.carts().insert_session(&session).await.unwrap();

    for mut line in lines {
        line.cart_session_id = session.id.clone();
        h.db.carts().insert_item(&line).await.unwrap();
    }

    session
}

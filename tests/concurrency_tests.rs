mod common;

use common::{GatedPaymentStore, TestContext, new_payment, setup_with_store};
use payment_tracker::application::admin::AdminAction;
use payment_tracker::domain::payment::{PaymentId, PaymentStatus};
use payment_tracker::domain::ports::PaymentStore;
use payment_tracker::domain::pricing::{Cryptocurrency, Tier};
use payment_tracker::infrastructure::in_memory::InMemoryPaymentStore;

/// Opens a payment and moves it to `confirming` before arming the gate.
async fn confirming_payment(
    cryptocurrency: Cryptocurrency,
    email: &str,
) -> (TestContext, PaymentId) {
    let payments = InMemoryPaymentStore::new();
    let gate = GatedPaymentStore::new(payments.clone(), 2);
    let ctx = setup_with_store(payments, Box::new(gate.clone()));
    let created = ctx
        .engine
        .create_payment(new_payment(Tier::Ruby, cryptocurrency, email))
        .await
        .unwrap();
    let view = ctx
        .engine
        .report_progress(created.payment_id, Some(0), Some("0x0".to_string()))
        .await
        .unwrap();
    assert_eq!(view.status, PaymentStatus::Confirming);

    gate.arm();
    (ctx, created.payment_id)
}

#[tokio::test]
async fn test_concurrent_completing_reports_provision_once() {
    let (ctx, id) = confirming_payment(Cryptocurrency::Ethereum, "race@example.com").await;

    // Both reads see the same confirming version; only one write may win.
    let (a, b) = tokio::join!(
        ctx.engine.report_progress(id, Some(12), Some("0x1".to_string())),
        ctx.engine.report_progress(id, Some(14), Some("0x2".to_string())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.status, PaymentStatus::Completed);
    assert_eq!(b.status, PaymentStatus::Completed);
    assert_eq!(a.completed_at, b.completed_at);
    assert_eq!(ctx.users.len().await, 1);
    assert_eq!(ctx.notifier.sent().len(), 1);

    let stored = ctx.payments.get(id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert!(stored.provisioned);
}

#[tokio::test]
async fn test_admin_verify_racing_completing_report_provisions_once() {
    let (ctx, id) = confirming_payment(Cryptocurrency::Litecoin, "verify@example.com").await;

    let (verified, reported) = tokio::join!(
        ctx.engine
            .admin_action(id, AdminAction::Verify, None, Some("seen on explorer".to_string())),
        ctx.engine.report_progress(id, Some(6), None),
    );
    assert_eq!(verified.unwrap().status, PaymentStatus::Completed);
    assert_eq!(reported.unwrap().status, PaymentStatus::Completed);

    assert_eq!(ctx.users.len().await, 1);
    assert_eq!(ctx.notifier.sent().len(), 1);
    let stored = ctx.payments.get(id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_concurrent_progress_reports_all_apply() {
    let (ctx, id) = confirming_payment(Cryptocurrency::Usdt, "slow@example.com").await;

    let (a, b) = tokio::join!(
        ctx.engine.report_progress(id, Some(2), None),
        ctx.engine.report_progress(id, Some(3), None),
    );
    a.unwrap();
    b.unwrap();

    // The loser retried on top of the winner's write.
    let stored = ctx.payments.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Confirming);
    assert_eq!(stored.version, 3);
    assert!(ctx.users.is_empty().await);
}

use chrono::{Duration, TimeZone, Utc};
use local_grocery::lifecycle::{
    Badge, DELIVERY_FEE, DeliveryStats, LifecycleError, OrderStatus, OrderTotals, ReturnStatus,
    Transition, ensure_returnable, refund_amount, reserve_stock, tax_for,
};

#[test]
fn happy_path_walks_every_status_in_order() {
    let steps = [
        (Transition::Assign, OrderStatus::Assigned),
        (Transition::Pickup, OrderStatus::PickedUp),
        (Transition::ConfirmPayment, OrderStatus::PaymentReceived),
        (Transition::Deliver, OrderStatus::Delivered),
    ];

    let mut status = OrderStatus::Placed;
    for (transition, expected) in steps {
        status = status.apply(transition).expect("transition allowed");
        assert_eq!(status, expected);
    }
    for transition in [
        Transition::Assign,
        Transition::Pickup,
        Transition::ConfirmPayment,
        Transition::Deliver,
        Transition::Cancel,
    ] {
        assert!(status.apply(transition).is_err(), "{transition:?} after delivery");
    }
}

#[test]
fn deliver_before_payment_is_rejected_with_current_status() {
    let err = OrderStatus::PickedUp
        .apply(Transition::Deliver)
        .expect_err("deliver must wait for payment");
    assert_eq!(
        err.to_string(),
        "Order cannot be delivered at current status: PICKED_UP"
    );
}

#[test]
fn pickup_requires_an_assignment() {
    assert!(matches!(
        OrderStatus::Placed.apply(Transition::Pickup),
        Err(LifecycleError::InvalidTransition {
            current: OrderStatus::Placed,
            ..
        })
    ));
}

#[test]
fn reassignment_keeps_the_order_assigned() {
    assert_eq!(
        OrderStatus::Assigned.apply(Transition::Assign),
        Ok(OrderStatus::Assigned)
    );
    assert!(OrderStatus::PickedUp.apply(Transition::Assign).is_err());
}

#[test]
fn cancel_only_before_pickup() {
    assert_eq!(
        OrderStatus::Placed.apply(Transition::Cancel),
        Ok(OrderStatus::Cancelled)
    );
    assert_eq!(
        OrderStatus::Assigned.apply(Transition::Cancel),
        Ok(OrderStatus::Cancelled)
    );
    for status in [
        OrderStatus::PickedUp,
        OrderStatus::PaymentReceived,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        assert!(status.apply(Transition::Cancel).is_err(), "{status} cancelled");
    }
}

#[test]
fn delivery_updates_map_to_their_transitions() {
    assert_eq!(
        Transition::for_delivery_update(OrderStatus::PickedUp),
        Ok(Transition::Pickup)
    );
    assert_eq!(
        Transition::for_delivery_update(OrderStatus::PaymentReceived),
        Ok(Transition::ConfirmPayment)
    );
    assert_eq!(
        Transition::for_delivery_update(OrderStatus::Delivered),
        Ok(Transition::Deliver)
    );
    assert!(Transition::for_delivery_update(OrderStatus::Cancelled).is_err());
    assert!(Transition::for_delivery_update(OrderStatus::Assigned).is_err());
}

#[test]
fn status_parses_case_insensitively() {
    assert_eq!(
        "payment_received".parse::<OrderStatus>(),
        Ok(OrderStatus::PaymentReceived)
    );
    assert!("SHIPPED".parse::<OrderStatus>().is_err());
}

#[test]
fn tax_rounds_half_up_to_the_cent() {
    assert_eq!(tax_for(0), 0);
    assert_eq!(tax_for(1000), 130);
    // 13% of 50 cents is 6.5 cents.
    assert_eq!(tax_for(50), 7);
    // 13% of 3 cents is 0.39 cents.
    assert_eq!(tax_for(3), 0);
}

#[test]
fn totals_sum_lines_and_add_tax() {
    let totals = OrderTotals::from_lines([(249, 2), (649, 1)]);
    assert_eq!(totals.subtotal, 1147);
    assert_eq!(totals.tax, 149);
    assert_eq!(totals.total, totals.subtotal + totals.tax);
}

#[test]
fn stock_reservation_never_goes_negative() {
    assert_eq!(reserve_stock("Milk", 5, 5), Ok(0));
    assert_eq!(
        reserve_stock("Milk", 5, 6),
        Err(LifecycleError::InsufficientStock {
            product: "Milk".into()
        })
    );
    assert_eq!(
        reserve_stock("Milk", 5, 0),
        Err(LifecycleError::InvalidQuantity)
    );
    assert_eq!(
        LifecycleError::InsufficientStock {
            product: "Milk".into()
        }
        .to_string(),
        "Not enough stock for: Milk"
    );
}

#[test]
fn returns_allowed_within_seven_days_of_delivery() {
    let delivered = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    assert!(
        ensure_returnable(
            ReturnStatus::NotRequested,
            OrderStatus::Delivered,
            Some(delivered),
            delivered + Duration::days(7),
        )
        .is_ok()
    );
    assert_eq!(
        ensure_returnable(
            ReturnStatus::NotRequested,
            OrderStatus::Delivered,
            Some(delivered),
            delivered + Duration::days(7) + Duration::seconds(1),
        ),
        Err(LifecycleError::ReturnWindowExpired)
    );
}

#[test]
fn returns_rejected_before_delivery_or_when_repeated() {
    let now = Utc::now();
    assert_eq!(
        ensure_returnable(
            ReturnStatus::NotRequested,
            OrderStatus::PaymentReceived,
            None,
            now
        ),
        Err(LifecycleError::NotDelivered)
    );
    assert_eq!(
        ensure_returnable(ReturnStatus::NotRequested, OrderStatus::Delivered, None, now),
        Err(LifecycleError::MissingDeliveryTime)
    );
    assert_eq!(
        ensure_returnable(
            ReturnStatus::Requested,
            OrderStatus::Delivered,
            Some(now),
            now
        ),
        Err(LifecycleError::ReturnAlreadyRequested)
    );
}

#[test]
fn return_decisions_follow_the_allowed_moves() {
    use ReturnStatus::*;

    for target in [Approved, Rejected, Refunded] {
        assert_eq!(Requested.process(target), Ok(target));
    }
    assert_eq!(Approved.process(Refunded), Ok(Refunded));

    assert!(NotRequested.process(Approved).is_err());
    assert!(Rejected.process(Refunded).is_err());
    assert!(Refunded.process(Approved).is_err());
    assert!(Requested.process(Requested).is_err());
}

#[test]
fn refund_is_snapshot_price_times_quantity() {
    assert_eq!(refund_amount(499, 3), 1497);
}

#[test]
fn badge_thresholds() {
    assert_eq!(Badge::for_stats(9, 5.0), None);
    assert_eq!(Badge::for_stats(10, 3.0), Some(Badge::Bronze));
    assert_eq!(Badge::for_stats(50, 3.9), Some(Badge::Bronze));
    assert_eq!(Badge::for_stats(50, 4.0), Some(Badge::Silver));
    assert_eq!(Badge::for_stats(100, 4.4), Some(Badge::Silver));
    assert_eq!(Badge::for_stats(100, 4.5), Some(Badge::Gold));
}

#[test]
fn recording_a_delivery_credits_fee_and_recomputes_badge() {
    let mut stats = DeliveryStats {
        total_deliveries: 9,
        total_earnings: 9 * DELIVERY_FEE,
        rating: 4.8,
    };
    assert_eq!(stats.record_delivery(), Some(Badge::Bronze));
    assert_eq!(stats.total_deliveries, 10);
    assert_eq!(stats.total_earnings, 10 * DELIVERY_FEE);
}

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use local_grocery::{
    dto::{
        admin::{LimitQuery, SalesChartQuery},
        delivery::{EarningsPeriod, LocationRequest},
        notifications::{NotificationStatus, TargetAudience},
    },
    lifecycle::{OrderStatus, Role},
    routes::params::Pagination,
    services::{
        admin_service::{daily_series, status_series},
        auth_service::validate_password,
    },
    uploads::{sanitize_file_name, storage_location},
};

#[test]
fn file_names_keep_only_safe_characters() {
    assert_eq!(sanitize_file_name("proof photo (1).JPG"), "proof_photo__1_.JPG");
    assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
    assert_eq!(sanitize_file_name("crème-brûlée.png"), "cr_me-br_l_e.png");
    assert_eq!(sanitize_file_name(""), "file");
}

#[test]
fn stored_uploads_live_under_their_subdirectory() {
    let (relative, url) = storage_location("delivery-proofs", "door step.png");
    assert!(relative.starts_with("delivery-proofs/"));
    assert!(relative.ends_with("_door_step.png"));
    assert_eq!(url, format!("/uploads/{relative}"));
}

#[test]
fn pagination_defaults_and_clamps() {
    assert_eq!(Pagination::default().normalize(), (1, 20, 0));
    let page = Pagination {
        page: Some(3),
        per_page: Some(500),
    };
    assert_eq!(page.normalize(), (3, 100, 200));
    let page = Pagination {
        page: Some(0),
        per_page: Some(0),
    };
    assert_eq!(page.normalize(), (1, 1, 0));
    let page = Pagination {
        page: Some(i64::MAX),
        per_page: Some(20),
    };
    assert_eq!(page.normalize(), (i64::MAX, 20, i64::MAX));
}

#[test]
fn chart_and_limit_queries_clamp() {
    assert_eq!(SalesChartQuery { days: None }.normalize(), 7);
    assert_eq!(SalesChartQuery { days: Some(365) }.normalize(), 90);
    assert_eq!(SalesChartQuery { days: Some(0) }.normalize(), 1);
    assert_eq!(LimitQuery { limit: None }.normalize(), 10);
    assert_eq!(LimitQuery { limit: Some(1000) }.normalize(), 100);
}

#[test]
fn sales_series_is_zero_filled_and_oldest_first() {
    let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let rows = [
        (NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(), 1200),
        (today, 300),
    ];

    let chart = daily_series(today, 3, &rows);
    assert_eq!(chart.labels, vec!["2024-05-08", "2024-05-09", "2024-05-10"]);
    assert_eq!(chart.values, vec![1200, 0, 300]);
}

#[test]
fn status_series_covers_every_status() {
    let chart = status_series(&[(OrderStatus::Delivered, 4), (OrderStatus::Placed, 2)]);
    assert_eq!(chart.labels, OrderStatus::ALL.to_vec());
    assert_eq!(chart.values, vec![2, 0, 0, 0, 4, 0]);
}

#[test]
fn earnings_windows_start_at_midnight() {
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap();
    let midnight = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
    assert_eq!(EarningsPeriod::Daily.window_start(now), midnight);
    assert_eq!(
        EarningsPeriod::Weekly.window_start(now),
        midnight - Duration::days(6)
    );
}

#[test]
fn future_notifications_are_scheduled() {
    let now = Utc::now();
    assert_eq!(
        NotificationStatus::for_schedule(Some(now + Duration::hours(1)), now),
        NotificationStatus::Scheduled
    );
    assert_eq!(
        NotificationStatus::for_schedule(Some(now - Duration::hours(1)), now),
        NotificationStatus::Sent
    );
    assert_eq!(
        NotificationStatus::for_schedule(None, now),
        NotificationStatus::Sent
    );
}

#[test]
fn audiences_map_to_roles() {
    assert_eq!(TargetAudience::All.role(), None);
    assert_eq!(TargetAudience::Customers.role(), Some(Role::Customer));
    assert_eq!(TargetAudience::Delivery.role(), Some(Role::Delivery));
}

#[test]
fn locations_are_range_checked() {
    let ok = LocationRequest {
        latitude: 43.65,
        longitude: -79.38,
    };
    assert!(ok.is_valid());
    assert_eq!(ok.as_location(), "43.65,-79.38");

    let bad = LocationRequest {
        latitude: 91.0,
        longitude: 0.0,
    };
    assert!(!bad.is_valid());
}

#[test]
fn password_may_not_equal_email() {
    assert!(validate_password("sam@example.com", "SAM@example.com").is_err());
    assert!(validate_password("sam@example.com", "   ").is_err());
    assert!(validate_password("sam@example.com", "correct horse").is_ok());
}

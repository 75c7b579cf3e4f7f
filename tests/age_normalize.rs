// tests/age_normalize.rs
use hn_order_verify::age::normalize;

#[test]
fn documented_examples() {
    assert_eq!(normalize("0 minutes ago"), 0.0);
    assert_eq!(normalize("5 hours ago"), 300.0);
    assert_eq!(normalize("2 days ago"), 2880.0);
    assert_eq!(normalize("garbage text"), 0.0);
}

#[test]
fn singular_and_plural_units_agree() {
    assert_eq!(normalize("1 hour ago") * 2.0, normalize("2 hours ago"));
    assert_eq!(normalize("1 day ago"), normalize("24 hours ago"));
}

#[test]
fn fractional_magnitudes_are_kept() {
    assert_eq!(normalize("1.5 hours ago"), 90.0);
}

#[test]
fn ordering_of_units_follows_elapsed_time() {
    let ages = [
        "59 minutes ago",
        "1 hour ago",
        "23 hours ago",
        "1 day ago",
        "29 days ago",
        "1 month ago",
        "11 months ago",
        "1 year ago",
    ];
    let minutes: Vec<f64> = ages.iter().map(|a| normalize(a)).collect();
    assert!(minutes.windows(2).all(|w| w[0] < w[1]), "{minutes:?}");
}

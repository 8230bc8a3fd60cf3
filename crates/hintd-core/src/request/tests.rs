use std::time::{Duration, Instant};

use super::{GroupSnapshot, LeaseError, Request, RequestGroup};

fn request(id: u64, value: &str, expires_at: Option<Instant>) -> Request {
    Request::new(id, value, expires_at)
}

#[test]
fn empty_group_is_inactive() {
    let group = RequestGroup::new("interactive");
    assert_eq!(group.snapshot(Instant::now()), None);
}

#[test]
fn fallback_group_is_always_active() {
    let group = RequestGroup::with_default("default", "schedutil");
    let snapshot = group.snapshot(Instant::now()).unwrap();
    assert_eq!(snapshot.value, "schedutil");
    assert_eq!(snapshot.expires_at, None);
}

#[test]
fn live_member_overrides_fallback_default() {
    let now = Instant::now();
    let group = RequestGroup::with_default("default", "schedutil");
    group.submit(request(1, "performance", Some(now + Duration::from_millis(100))));
    let snapshot = group.snapshot(now).unwrap();
    assert_eq!(snapshot.value, "performance");
    assert_eq!(snapshot.expires_at, Some(now + Duration::from_millis(100)));
}

#[test]
fn most_recent_live_request_wins() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "mid", Some(now + Duration::from_millis(500))));
    group.submit(request(2, "max", Some(now + Duration::from_millis(200))));
    assert_eq!(group.snapshot(now).unwrap().value, "max");
}

#[test]
fn effective_expiry_is_latest_live_deadline() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "mid", Some(now + Duration::from_millis(500))));
    group.submit(request(2, "max", Some(now + Duration::from_millis(200))));
    // "max" supplies the value but "mid" keeps the tier active longer.
    assert_eq!(
        group.snapshot(now),
        Some(GroupSnapshot {
            value: "max".to_owned(),
            expires_at: Some(now + Duration::from_millis(500)),
        })
    );
}

#[test]
fn permanent_member_pins_group_active() {
    let now = Instant::now();
    let group = RequestGroup::new("boost");
    group.submit(request(1, "hold", Some(now + Duration::from_millis(50))));
    group.submit(request(2, "pin", None));
    let snapshot = group.snapshot(now).unwrap();
    assert_eq!(snapshot.value, "pin");
    assert_eq!(snapshot.expires_at, None);
}

#[test]
fn lease_deadline_is_exclusive() {
    let now = Instant::now();
    let deadline = now + Duration::from_millis(100);
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(deadline)));
    assert!(group.snapshot(deadline - Duration::from_millis(1)).is_some());
    assert_eq!(group.snapshot(deadline), None);
}

#[test]
fn snapshot_prunes_lapsed_members() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(now + Duration::from_millis(100))));

    assert_eq!(group.snapshot(now + Duration::from_millis(200)), None);
    // The stale member was removed, not just skipped.
    assert_eq!(group.withdraw(1), Err(LeaseError::RequestGone { id: 1 }));
}

#[test]
fn peek_never_prunes() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(now + Duration::from_millis(100))));

    assert_eq!(group.peek(now + Duration::from_millis(200)), None);
    // The lapsed member is still present for an explicit withdrawal.
    assert_eq!(group.withdraw(1), Ok(()));
}

#[test]
fn withdraw_unknown_request_errors() {
    let group = RequestGroup::new("interactive");
    assert_eq!(group.withdraw(7), Err(LeaseError::RequestGone { id: 7 }));
}

#[test]
fn withdraw_removes_only_the_named_request() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "low", None));
    group.submit(request(2, "high", None));

    group.withdraw(2).unwrap();
    assert_eq!(group.snapshot(now).unwrap().value, "low");
}

#[test]
fn renewal_extends_the_lease() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(now + Duration::from_millis(100))));

    group
        .renew(1, Some(now + Duration::from_millis(400)))
        .unwrap();
    let snapshot = group.snapshot(now).unwrap();
    assert_eq!(snapshot.expires_at, Some(now + Duration::from_millis(400)));
}

#[test]
fn renewal_must_strictly_extend() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(now + Duration::from_millis(100))));

    assert_eq!(
        group.renew(1, Some(now + Duration::from_millis(100))),
        Err(LeaseError::RenewalDoesNotExtend { id: 1 })
    );
    assert_eq!(
        group.renew(1, Some(now + Duration::from_millis(50))),
        Err(LeaseError::RenewalDoesNotExtend { id: 1 })
    );
}

#[test]
fn renewal_to_permanent_extends() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(now + Duration::from_millis(100))));

    group.renew(1, None).unwrap();
    assert_eq!(group.snapshot(now).unwrap().expires_at, None);
}

#[test]
fn permanent_lease_cannot_be_shortened() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", None));

    assert_eq!(
        group.renew(1, Some(now + Duration::from_secs(60))),
        Err(LeaseError::RenewalDoesNotExtend { id: 1 })
    );
    assert_eq!(
        group.renew(1, None),
        Err(LeaseError::RenewalDoesNotExtend { id: 1 })
    );
}

#[test]
fn renewal_refreshes_recency() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "old", Some(now + Duration::from_millis(300))));
    group.submit(request(2, "new", Some(now + Duration::from_millis(300))));
    assert_eq!(group.snapshot(now).unwrap().value, "new");

    // Renewing the older request makes it the most recent submission again.
    group
        .renew(1, Some(now + Duration::from_millis(600)))
        .unwrap();
    assert_eq!(group.snapshot(now).unwrap().value, "old");
}

#[test]
fn renewal_of_pruned_request_errors() {
    let now = Instant::now();
    let group = RequestGroup::new("interactive");
    group.submit(request(1, "max", Some(now + Duration::from_millis(100))));
    let _ = group.snapshot(now + Duration::from_millis(200));

    assert_eq!(
        group.renew(1, Some(now + Duration::from_secs(1))),
        Err(LeaseError::RequestGone { id: 1 })
    );
}

use std::time::Instant;

use sharefast::server::auth::{AccessDecision, AccessGuard};

#[test]
fn allows_iff_credential_verifies_or_no_password() {
    let open = AccessGuard::new(None).unwrap();
    assert!(open.verify("anything"));
    assert_eq!(open.check(None, None), AccessDecision::Allow);

    let locked = AccessGuard::new(Some("secret123")).unwrap();
    assert!(locked.verify("secret123"));
    assert!(!locked.verify("secret12"));
    assert!(!locked.verify(""));
    assert_eq!(locked.check(None, None), AccessDecision::ChallengeRequired);
}

#[test]
fn tokens_are_scoped_per_client() {
    let guard = AccessGuard::new(Some("secret123")).unwrap();

    let first = guard.grant();
    let second = guard.grant();
    assert_ne!(first, second);
    assert_eq!(guard.authenticated_count(), 2);

    assert_eq!(guard.check(Some(&first), None), AccessDecision::Allow);
    assert_eq!(guard.check(Some(&second), None), AccessDecision::Allow);
    assert_eq!(
        guard.check(Some("forged-token"), None),
        AccessDecision::ChallengeRequired
    );
}

#[test]
fn revoke_all_clears_every_client() {
    let guard = AccessGuard::new(Some("secret123")).unwrap();
    let token = guard.grant();
    guard.grant();

    guard.revoke_all();

    assert_eq!(guard.authenticated_count(), 0);
    assert_eq!(
        guard.check(Some(&token), None),
        AccessDecision::ChallengeRequired
    );
}

/// Mismatch position must not change verification time: a near-miss (one
/// trailing character off) and an all-miss take comparably long, because the
/// full Argon2 computation runs either way. Generous tolerance keeps this
/// stable on loaded machines.
#[test]
fn verification_time_does_not_depend_on_mismatch_position() {
    let guard = AccessGuard::new(Some("secret123")).unwrap();

    let median = |candidate: &str| {
        let mut samples: Vec<u128> = (0..3)
            .map(|_| {
                let start = Instant::now();
                assert!(!guard.verify(candidate));
                start.elapsed().as_micros()
            })
            .collect();
        samples.sort_unstable();
        samples[1]
    };

    let near_miss = median("secret124");
    let all_miss = median("zzzzzzzzz");

    let (fast, slow) = if near_miss < all_miss {
        (near_miss, all_miss)
    } else {
        (all_miss, near_miss)
    };
    assert!(
        slow < fast.saturating_mul(5).max(1),
        "timing spread too wide: near-miss {near_miss}us vs all-miss {all_miss}us"
    );
}

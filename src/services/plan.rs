// Plan and page-accessibility rules
// Pure, stateless date-comparison and arithmetic - the single source of truth
// for what a plan entitles a user to.

use chrono::{DateTime, Utc};

use crate::models::user::Plan;

/// Page quota per plan
pub const FREE_PAGE_LIMIT: usize = 1;
pub const PRO_PAGE_LIMIT: usize = 50;

/// Whether a pro plan has lapsed. Free plans never expire.
pub fn is_plan_expired(plan: Plan, plan_expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match (plan, plan_expires_at) {
        (Plan::Pro, Some(expires_at)) => expires_at < now,
        // Pro without an expiry is treated as lapsed - paid plans always
        // carry an expiry, a missing one means the upgrade never completed
        (Plan::Pro, None) => true,
        (Plan::Free, _) => false,
    }
}

/// The plan a user effectively has right now: an expired pro behaves as free.
pub fn effective_plan(
    plan: Plan,
    plan_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Plan {
    if is_plan_expired(plan, plan_expires_at, now) {
        Plan::Free
    } else {
        plan
    }
}

/// Page quota for a plan
pub fn page_limit(plan: Plan) -> usize {
    match plan {
        Plan::Free => FREE_PAGE_LIMIT,
        Plan::Pro => PRO_PAGE_LIMIT,
    }
}

/// Whether the Nth-oldest page (zero-based creation-order index) falls under
/// the quota of the effective plan.
pub fn is_page_accessible(
    page_index: usize,
    plan: Plan,
    plan_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    page_index < page_limit(effective_plan(plan, plan_expires_at, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_free_plan_never_expires() {
        let now = Utc::now();
        assert!(!is_plan_expired(Plan::Free, None, now));
        assert!(!is_plan_expired(
            Plan::Free,
            Some(now - Duration::days(365)),
            now
        ));
    }

    #[test]
    fn test_pro_expiry_boundary() {
        let now = Utc::now();
        assert!(is_plan_expired(Plan::Pro, Some(now - Duration::seconds(1)), now));
        assert!(!is_plan_expired(Plan::Pro, Some(now + Duration::seconds(1)), now));
        // Exactly-now is not yet past
        assert!(!is_plan_expired(Plan::Pro, Some(now), now));
    }

    #[test]
    fn test_pro_without_expiry_is_lapsed() {
        assert!(is_plan_expired(Plan::Pro, None, Utc::now()));
    }

    #[test]
    fn test_effective_plan() {
        let now = Utc::now();
        assert_eq!(effective_plan(Plan::Free, None, now), Plan::Free);
        assert_eq!(
            effective_plan(Plan::Pro, Some(now + Duration::days(30)), now),
            Plan::Pro
        );
        assert_eq!(
            effective_plan(Plan::Pro, Some(now - Duration::days(1)), now),
            Plan::Free
        );
    }

    #[test]
    fn test_page_limits() {
        assert_eq!(page_limit(Plan::Free), 1);
        assert_eq!(page_limit(Plan::Pro), 50);
    }

    #[test]
    fn test_page_accessibility_free() {
        let now = Utc::now();
        assert!(is_page_accessible(0, Plan::Free, None, now));
        assert!(!is_page_accessible(1, Plan::Free, None, now));
    }

    #[test]
    fn test_page_accessibility_pro() {
        let now = Utc::now();
        let expires = Some(now + Duration::days(10));
        assert!(is_page_accessible(0, Plan::Pro, expires, now));
        assert!(is_page_accessible(49, Plan::Pro, expires, now));
        assert!(!is_page_accessible(50, Plan::Pro, expires, now));
    }

    #[test]
    fn test_expired_pro_pages_beyond_free_quota_inaccessible() {
        let now = Utc::now();
        let expired = Some(now - Duration::days(1));
        assert!(is_page_accessible(0, Plan::Pro, expired, now));
        assert!(!is_page_accessible(1, Plan::Pro, expired, now));
        assert!(!is_page_accessible(49, Plan::Pro, expired, now));
    }
}

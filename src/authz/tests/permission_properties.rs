//! Property tests for permission evaluation
//!
//! Disabled identities, realm-less requirements, wildcard grants, and
//! route-instance expansion.

use gatehouse_authz::permission::{
    expand_route_instance_permissions, Decision, Permission, PermissionEvaluator,
    PermissionSet, SecurityRequirement,
};
use gatehouse_core::Identity;
use proptest::prelude::*;

fn identity(realm: &str, permissions: Vec<String>, enabled: bool) -> Identity {
    let mut identity = Identity::new("7e06c4a6", "Frank Krank Services")
        .unwrap()
        .with_enabled(enabled)
        .with_permissions(permissions);
    identity.set_realm(realm);
    identity
}

fn requirement(realm: &str, permissions: Vec<String>) -> SecurityRequirement {
    let mut requirement = SecurityRequirement::new();
    requirement.insert(realm.to_string(), permissions);
    requirement
}

#[test]
fn test_documented_wildcard_cases() {
    let granted = PermissionSet::from_grants(["api:*"]);
    assert!(granted.is_permitted(&["api:read"]));
    assert!(granted.is_permitted(&["api:write:42"]));

    let granted = PermissionSet::from_grants(["api:read"]);
    assert!(!granted.is_permitted(&["api:write"]));
}

#[test]
fn test_documented_expansion_case() {
    let expanded = expand_route_instance_permissions(
        &["claim:read:{claimid}"],
        "/policies/:policyid/claims/:claimid",
        "/policies/SFIH1/claims/37103",
    );
    assert_eq!(expanded, vec!["claim:read:37103".to_string()]);
}

proptest! {
    #[test]
    fn test_disabled_identity_always_denied(
        grants in prop::collection::vec("[a-z*]{1,6}(:[a-z0-9*]{1,6}){0,3}", 0..6),
        required in prop::collection::vec("[a-z]{1,6}(:[a-z0-9]{1,6}){0,3}", 0..4),
    ) {
        let caller = identity("hmac_auth", grants, false);
        let evaluator = PermissionEvaluator::new();

        let with_realm = requirement("hmac_auth", required);
        prop_assert_eq!(evaluator.check(&with_realm, "/quotes", &caller, "/quotes"), Decision::Deny);
        prop_assert_eq!(
            evaluator.check(&SecurityRequirement::new(), "/quotes", &caller, "/quotes"),
            Decision::Deny
        );
    }

    #[test]
    fn test_absent_or_empty_requirement_allows(
        grants in prop::collection::vec("[a-z]{1,6}(:[a-z0-9]{1,6}){0,3}", 0..6),
        required in prop::collection::vec("[a-z]{1,6}(:[a-z0-9]{1,6}){0,3}", 0..4),
    ) {
        let caller = identity("anon", grants, true);
        let evaluator = PermissionEvaluator::new();

        let other_realm = requirement("hmac_auth", required);
        prop_assert!(evaluator.check(&other_realm, "/", &caller, "/").is_allowed());

        let empty = requirement("anon", Vec::new());
        prop_assert!(evaluator.check(&empty, "/", &caller, "/").is_allowed());
    }

    #[test]
    fn test_trailing_wildcard_implies_all_descendants(
        root in "[a-z]{1,8}",
        rest in prop::collection::vec("[a-z0-9]{1,8}", 1..5),
    ) {
        let granted = Permission::new(&format!("{}:*", root)).unwrap();
        let required = Permission::new(&format!("{}:{}", root, rest.join(":"))).unwrap();

        prop_assert!(granted.implies(&required));
        prop_assert!(!granted.implies(&Permission::new(&root).unwrap()));
    }

    #[test]
    fn test_exact_grant_implies_itself_only(
        segments in prop::collection::vec("[a-z0-9]{1,8}", 1..5),
        other in "[a-z0-9]{1,8}",
    ) {
        let raw = segments.join(":");
        let granted = Permission::new(&raw).unwrap();
        prop_assert!(granted.implies(&granted));

        let longer = Permission::new(&format!("{}:{}", raw, other)).unwrap();
        prop_assert!(!granted.implies(&longer));
    }

    #[test]
    fn test_expansion_substitutes_request_values(
        policy in "[A-Z0-9]{1,10}",
        claim in "[0-9]{1,8}",
    ) {
        let path = format!("/policies/{}/claims/{}", policy, claim);
        let expanded = expand_route_instance_permissions(
            &["policy:read:{policyid}", "claim:read:{claimid}", "api:read"],
            "/policies/:policyid/claims/:claimid",
            &path,
        );

        prop_assert_eq!(
            expanded,
            vec![
                format!("policy:read:{}", policy),
                format!("claim:read:{}", claim),
                "api:read".to_string(),
            ]
        );
    }

    #[test]
    fn test_instance_grant_allows_only_its_instance(
        granted_claim in "[0-9]{1,8}",
        requested_claim in "[0-9]{1,8}",
    ) {
        let caller = identity("hmac_auth", vec![format!("claim:read:{}", granted_claim)], true);
        let required = requirement("hmac_auth", vec!["claim:read:{claimid}".to_string()]);
        let path = format!("/claims/{}", requested_claim);

        let decision = PermissionEvaluator::new().check(&required, "/claims/:claimid", &caller, &path);
        let expected = if granted_claim == requested_claim { Decision::Allow } else { Decision::Deny };
        prop_assert_eq!(decision, expected);
    }
}

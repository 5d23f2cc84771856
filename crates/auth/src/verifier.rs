//! Session verification: the dual-token state machine.
//!
//! Rules are evaluated in order and the first applicable one decides:
//!
//! 1. either raw token absent (or empty) -> `Unauthorized`
//! 2. access token expired -> refresh attempt (below)
//! 3. any other decode failure -> the decoder's error kind; an expired refresh
//!    token next to a live access token -> `PerformLoginAgain`
//! 4. incomplete claims in either token -> `MissingInformation`
//! 5. access/refresh identity differ -> `MismatchedUsers`
//! 6. capability predicate on the access identity
//!
//! Refresh attempt: the refresh token must decode (expired -> `PerformLoginAgain`)
//! and carry a complete identity; the capability is checked against that
//! identity and, on success, a new access token is minted from it. The
//! refresh token itself is never re-issued.

use chrono::Duration;

use crate::{
    AuthCause, AuthConfig, AuthDecision, Capability, Identity, RefreshedToken, TokenClaims,
    TokenCodec, TokenError, REFRESH_NOTICE,
};

/// Verifies `(access, refresh)` token pairs against requested capabilities.
///
/// Stateless apart from the signing key; safe to share across requests.
#[derive(Debug, Clone)]
pub struct SessionVerifier {
    codec: TokenCodec,
    access_ttl: Duration,
}

impl SessionVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            codec: TokenCodec::new(config.secret()),
            access_ttl: config.access_ttl(),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify a single capability.
    pub fn verify(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        capability: &Capability,
    ) -> AuthDecision {
        self.run(access, refresh, capability.name(), |identity| {
            capability.check(identity)
        })
    }

    /// Verify a string-tagged capability descriptor.
    ///
    /// An unknown tag is reported as `InvalidAuthType` at the predicate step,
    /// so token problems still take precedence.
    pub fn verify_tagged(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        tag: &str,
        username: Option<&str>,
        group_emails: Option<&[String]>,
    ) -> AuthDecision {
        let capability = Capability::from_tag(tag, username, group_emails);
        self.run(access, refresh, tag, |identity| match &capability {
            Ok(capability) => capability.check(identity),
            Err(cause) => Err(cause.clone()),
        })
    }

    /// Succeed if any capability succeeds, trying them in order.
    ///
    /// The first success is returned as is (including its refresh effect).
    /// When all fail the causes are de-duplicated and joined.
    pub fn verify_any(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        capabilities: &[Capability],
    ) -> AuthDecision {
        if capabilities.is_empty() {
            return AuthDecision::denied(AuthCause::Unauthorized);
        }

        let mut causes = Vec::with_capacity(capabilities.len());
        for capability in capabilities {
            let decision = self.verify(access, refresh, capability);
            if decision.is_authorized() {
                return decision;
            }
            causes.push(decision.cause().clone());
        }

        AuthDecision::denied(AuthCause::any(causes))
    }

    fn run<F>(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        capability: &str,
        check: F,
    ) -> AuthDecision
    where
        F: Fn(&Identity) -> Result<(), AuthCause>,
    {
        let (Some(access), Some(refresh)) = (present(access), present(refresh)) else {
            return deny(capability, AuthCause::Unauthorized);
        };

        let access_claims = match self.codec.decode(access) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return self.refresh(refresh, capability, check),
            Err(e) => return deny(capability, AuthCause::Token(e.kind())),
        };

        let refresh_claims = match self.decode_refresh(refresh) {
            Ok(claims) => claims,
            Err(cause) => return deny(capability, cause),
        };

        let access_identity = access_claims.identity;
        if !access_identity.is_complete() || !refresh_claims.identity.is_complete() {
            return deny(capability, AuthCause::MissingInformation);
        }

        if !access_identity.same_user(&refresh_claims.identity) {
            return deny(capability, AuthCause::MismatchedUsers);
        }

        if let Err(cause) = check(&access_identity) {
            return deny(capability, cause);
        }

        AuthDecision::granted(access_identity)
    }

    fn refresh<F>(&self, refresh: &str, capability: &str, check: F) -> AuthDecision
    where
        F: Fn(&Identity) -> Result<(), AuthCause>,
    {
        let identity = match self.decode_refresh(refresh) {
            Ok(claims) => claims.identity,
            Err(cause) => return deny(capability, cause),
        };

        if !identity.is_complete() {
            return deny(capability, AuthCause::MissingInformation);
        }

        if let Err(cause) = check(&identity) {
            return deny(capability, cause);
        }

        match self.codec.encode(&identity, self.access_ttl) {
            Ok(raw) => {
                tracing::info!(
                    username = %identity.username,
                    capability,
                    "access token refreshed"
                );
                let refreshed = RefreshedToken {
                    raw,
                    ttl: self.access_ttl,
                    notice: REFRESH_NOTICE,
                };
                AuthDecision::granted_with_refresh(identity, refreshed)
            }
            Err(e) => {
                tracing::warn!("failed to mint refreshed access token: {e}");
                AuthDecision::denied(AuthCause::Token(e.kind()))
            }
        }
    }

    fn decode_refresh(&self, refresh: &str) -> Result<TokenClaims, AuthCause> {
        self.codec.decode(refresh).map_err(|e| match e {
            TokenError::Expired => AuthCause::PerformLoginAgain,
            other => AuthCause::Token(other.kind()),
        })
    }
}

fn present(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty())
}

fn deny(capability: &str, cause: AuthCause) -> AuthDecision {
    tracing::debug!(capability, %cause, "session verification denied");
    AuthDecision::denied(cause)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::{Role, TokenErrorKind};

    const SECRET: &str = "verifier-test-secret";

    fn verifier() -> SessionVerifier {
        SessionVerifier::new(&AuthConfig::new(SECRET))
    }

    fn tester() -> Identity {
        Identity::new("tester", "t@test.com", Role::Regular)
    }

    fn admin() -> Identity {
        Identity::new("admin", "admin@email.com", Role::Admin)
    }

    fn valid(identity: &Identity) -> String {
        verifier().codec().encode(identity, Duration::hours(1)).unwrap()
    }

    fn long_lived(identity: &Identity) -> String {
        verifier().codec().encode(identity, Duration::days(7)).unwrap()
    }

    fn expired(identity: &Identity) -> String {
        verifier()
            .codec()
            .encode_at(identity, Utc::now() - Duration::hours(2), Duration::hours(1))
            .unwrap()
    }

    /// Token signed with the test secret around arbitrary identity claims.
    fn signed(mut claims: serde_json::Value, exp: i64) -> String {
        claims["iat"] = serde_json::json!(Utc::now().timestamp());
        claims["exp"] = serde_json::json!(exp);
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn verify(access: &str, refresh: &str, capability: &Capability) -> AuthDecision {
        verifier().verify(Some(access), Some(refresh), capability)
    }

    #[test]
    fn matching_pair_as_self_is_authorized_without_refresh() {
        let decision = verify(&valid(&tester()), &long_lived(&tester()), &Capability::user("tester"));

        assert!(decision.is_authorized());
        assert_eq!(decision.cause().to_string(), "Authorized");
        assert!(decision.refreshed().is_none());
        assert_eq!(decision.identity(), Some(&tester()));
    }

    #[test]
    fn missing_tokens_are_unauthorized() {
        let decision = verifier().verify(None, None, &Capability::Simple);
        assert!(!decision.is_authorized());
        assert_eq!(decision.cause().to_string(), "Unauthorized");

        let only_access = valid(&tester());
        let decision = verifier().verify(Some(only_access.as_str()), None, &Capability::Simple);
        assert_eq!(decision.cause(), &AuthCause::Unauthorized);

        let decision = verifier().verify(Some(""), Some(only_access.as_str()), &Capability::Simple);
        assert_eq!(decision.cause(), &AuthCause::Unauthorized);
    }

    #[test]
    fn foreign_signature_is_reported_by_kind() {
        let forged = TokenCodec::new(b"other-secret")
            .encode(&tester(), Duration::hours(1))
            .unwrap();

        let decision = verify(&forged, &long_lived(&tester()), &Capability::Simple);
        assert_eq!(decision.cause(), &AuthCause::Token(TokenErrorKind::InvalidSignature));

        let decision = verify(&valid(&tester()), &forged, &Capability::Simple);
        assert_eq!(decision.cause().to_string(), "InvalidSignature");
    }

    #[test]
    fn malformed_token_is_reported_by_kind() {
        let decision = verify("garbage", &long_lived(&tester()), &Capability::Simple);
        assert_eq!(decision.cause().to_string(), "MalformedToken");
    }

    #[test]
    fn empty_claims_are_missing_information() {
        let empty = valid(&Identity::default());

        let decision = verify(&empty, &long_lived(&tester()), &Capability::Simple);
        assert_eq!(decision.cause().to_string(), "Token is missing information");

        let decision = verify(&valid(&tester()), &empty, &Capability::Simple);
        assert_eq!(decision.cause(), &AuthCause::MissingInformation);
    }

    #[test]
    fn blank_role_or_null_name_is_missing_information() {
        let live = (Utc::now() + Duration::hours(1)).timestamp();
        let blank_role = signed(
            serde_json::json!({ "username": "tester", "email": "t@test.com", "role": "" }),
            live,
        );
        let null_name = signed(
            serde_json::json!({ "username": null, "email": "t@test.com", "role": "Regular" }),
            live,
        );

        for broken in [&blank_role, &null_name] {
            let decision = verify(broken, &long_lived(&tester()), &Capability::Simple);
            assert_eq!(decision.cause().to_string(), "Token is missing information");

            let decision = verify(&valid(&tester()), broken, &Capability::Simple);
            assert_eq!(decision.cause(), &AuthCause::MissingInformation);

            let decision = verify(&expired(&tester()), broken, &Capability::Simple);
            assert_eq!(decision.cause(), &AuthCause::MissingInformation);
            assert!(decision.refreshed().is_none());
        }
    }

    #[test]
    fn mismatched_pair_is_rejected_before_capability() {
        let other = Identity::new("other", "o@test.com", Role::Regular);
        let decision = verify(&valid(&tester()), &long_lived(&other), &Capability::user("tester"));
        assert_eq!(decision.cause().to_string(), "Mismatched users");
    }

    #[test]
    fn expired_access_with_live_refresh_mints_new_access_token() {
        let identity = tester().with_id("6475e0f3c5b1");
        let decision = verify(&expired(&identity), &long_lived(&identity), &Capability::Simple);

        assert!(decision.is_authorized());
        assert_eq!(decision.cause(), &AuthCause::Authorized);

        let refreshed = decision.refreshed().expect("refresh effect");
        assert_eq!(refreshed.notice, REFRESH_NOTICE);
        assert_eq!(refreshed.ttl, Duration::hours(1));

        let claims = verifier().codec().decode(&refreshed.raw).unwrap();
        assert_eq!(claims.identity, identity);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn refresh_path_checks_capability_against_refresh_identity() {
        let access = expired(&tester());
        let refresh = long_lived(&tester());

        let decision = verify(&access, &refresh, &Capability::Admin);
        assert_eq!(decision.cause(), &AuthCause::NotAdmin);
        assert!(decision.refreshed().is_none());

        let decision = verify(&access, &refresh, &Capability::user("tester"));
        assert!(decision.is_authorized());
    }

    #[test]
    fn refresh_path_does_not_compare_against_expired_access_identity() {
        let decision = verify(&expired(&admin()), &long_lived(&tester()), &Capability::Simple);

        assert!(decision.is_authorized());
        assert_eq!(decision.identity(), Some(&tester()));
    }

    #[test]
    fn refresh_path_requires_complete_refresh_identity() {
        let decision = verify(
            &expired(&tester()),
            &long_lived(&Identity::default()),
            &Capability::Simple,
        );
        assert_eq!(decision.cause(), &AuthCause::MissingInformation);
    }

    #[test]
    fn refresh_path_propagates_refresh_decode_failure() {
        let decision = verify(&expired(&tester()), "garbage", &Capability::Simple);
        assert_eq!(decision.cause(), &AuthCause::Token(TokenErrorKind::Malformed));
    }

    #[test]
    fn both_tokens_expired_requires_login() {
        let decision = verify(&expired(&tester()), &expired(&tester()), &Capability::Simple);
        assert!(!decision.is_authorized());
        assert_eq!(decision.cause().to_string(), "Perform login again");
    }

    #[test]
    fn expired_refresh_next_to_live_access_requires_login() {
        let decision = verify(&valid(&tester()), &expired(&tester()), &Capability::Simple);
        assert_eq!(decision.cause(), &AuthCause::PerformLoginAgain);
    }

    #[test]
    fn refreshing_twice_yields_two_valid_tokens() {
        let access = expired(&tester());
        let refresh = long_lived(&tester());

        let first = verify(&access, &refresh, &Capability::Simple);
        let second = verify(&access, &refresh, &Capability::Simple);

        for decision in [first, second] {
            let raw = decision.into_refreshed().expect("refresh effect").raw;
            assert_eq!(verifier().codec().decode(&raw).unwrap().identity, tester());
        }
    }

    #[test]
    fn admin_capability_gates_on_role() {
        let decision = verify(&valid(&tester()), &long_lived(&tester()), &Capability::Admin);
        assert!(!decision.is_authorized());
        assert_eq!(decision.cause().to_string(), "Not admin");

        let decision = verify(&valid(&admin()), &long_lived(&admin()), &Capability::Admin);
        assert!(decision.is_authorized());
    }

    #[test]
    fn admin_named_like_target_user_is_not_self() {
        let alice_admin = Identity::new("alice", "alice@x.com", Role::Admin);
        let decision = verify(
            &valid(&alice_admin),
            &long_lived(&alice_admin),
            &Capability::user("alice"),
        );
        assert!(!decision.is_authorized());
        assert_eq!(decision.cause(), &AuthCause::NotRegularUser);

        let bob = Identity::new("bob", "bob@x.com", Role::Regular);
        let decision = verify(&valid(&bob), &long_lived(&bob), &Capability::user("alice"));
        assert_eq!(
            decision.cause().to_string(),
            "Requested user different from the logged one"
        );
    }

    #[test]
    fn group_capability_checks_membership() {
        let group = Capability::group(["a@x.com", "b@x.com"]);

        let member = Identity::new("a", "a@x.com", Role::Regular);
        assert!(verify(&valid(&member), &long_lived(&member), &group).is_authorized());

        let outsider = Identity::new("c", "c@x.com", Role::Regular);
        let decision = verify(&valid(&outsider), &long_lived(&outsider), &group);
        assert_eq!(decision.cause().to_string(), "User not in group");
    }

    #[test]
    fn verify_any_succeeds_if_one_alternative_does() {
        let alternatives = [Capability::user("bob"), Capability::Admin];

        let bob = Identity::new("bob", "bob@x.com", Role::Regular);
        let decision = verifier().verify_any(
            Some(valid(&bob).as_str()),
            Some(long_lived(&bob).as_str()),
            &alternatives,
        );
        assert!(decision.is_authorized());

        let decision = verifier().verify_any(
            Some(valid(&admin()).as_str()),
            Some(long_lived(&admin()).as_str()),
            &alternatives,
        );
        assert!(decision.is_authorized());
    }

    #[test]
    fn verify_any_joins_failure_causes() {
        let decision = verifier().verify_any(
            Some(valid(&tester()).as_str()),
            Some(long_lived(&tester()).as_str()),
            &[Capability::user("bob"), Capability::Admin],
        );
        assert!(!decision.is_authorized());
        assert_eq!(
            decision.cause().to_string(),
            "Requested user different from the logged one or Not admin"
        );
    }

    #[test]
    fn verify_any_deduplicates_identical_causes() {
        let decision = verifier().verify_any(None, None, &[Capability::Simple, Capability::Admin]);
        assert_eq!(decision.cause().to_string(), "Unauthorized");

        let decision = verifier().verify_any(None, None, &[]);
        assert_eq!(decision.cause(), &AuthCause::Unauthorized);
    }

    #[test]
    fn verify_any_keeps_refresh_effect_of_first_success() {
        let decision = verifier().verify_any(
            Some(expired(&tester()).as_str()),
            Some(long_lived(&tester()).as_str()),
            &[Capability::Admin, Capability::user("tester")],
        );
        assert!(decision.is_authorized());
        assert!(decision.refreshed().is_some());
    }

    #[test]
    fn unknown_tag_is_invalid_auth_type_after_token_checks() {
        let v = verifier();
        let access = valid(&tester());
        let refresh = long_lived(&tester());

        let decision = v.verify_tagged(
            Some(access.as_str()),
            Some(refresh.as_str()),
            "Owner",
            None,
            None,
        );
        assert_eq!(decision.cause().to_string(), "Invalid authType");

        let decision = v.verify_tagged(None, None, "Owner", None, None);
        assert_eq!(decision.cause(), &AuthCause::Unauthorized);

        let emails = vec!["t@test.com".to_string()];
        let decision = v.verify_tagged(
            Some(access.as_str()),
            Some(refresh.as_str()),
            "Group",
            None,
            Some(emails.as_slice()),
        );
        assert!(decision.is_authorized());
    }

    fn capability_strategy() -> impl Strategy<Value = Capability> {
        prop_oneof![
            Just(Capability::Simple),
            Just(Capability::Admin),
            "[a-z]{1,6}".prop_map(Capability::User),
            prop::collection::btree_set("[a-z]{1,4}@x\\.com", 0..4).prop_map(Capability::Group),
        ]
    }

    fn identity_strategy() -> impl Strategy<Value = Identity> {
        (
            "[a-z]{1,6}",
            "[a-z]{1,4}@x\\.com",
            prop_oneof![Just(Role::Regular), Just(Role::Admin)],
        )
            .prop_map(|(username, email, role)| Identity::new(username, email, role))
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a pair naming different users is rejected for every capability.
        #[test]
        fn any_mismatched_pair_is_rejected(
            access in identity_strategy(),
            refresh in identity_strategy(),
            capability in capability_strategy(),
        ) {
            prop_assume!(!access.same_user(&refresh));

            let decision = verify(&valid(&access), &long_lived(&refresh), &capability);
            prop_assert!(!decision.is_authorized());
            prop_assert_eq!(decision.cause(), &AuthCause::MismatchedUsers);
        }
    }
}

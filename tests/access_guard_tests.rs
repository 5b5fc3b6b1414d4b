use ilmo::{
    access::{AccessDecision, AuthRestrict, evaluate, login_href, safe_next},
    error::BackendError,
    models::Viewer,
    store::ViewerState,
};
use uuid::Uuid;

fn viewer(is_admin: bool) -> Viewer {
    Viewer {
        id: Uuid::new_v4(),
        name: "Teemu Teekkari".to_string(),
        username: "teemu".to_string(),
        is_admin,
        is_verified: true,
        ..Default::default()
    }
}

fn all_restrictions() -> Vec<AuthRestrict> {
    let flags = [
        AuthRestrict::LOGGED_OUT,
        AuthRestrict::LOGGED_IN,
        AuthRestrict::NOT_ADMIN,
    ];
    (0u8..8)
        .map(|mask| {
            flags
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .fold(AuthRestrict::NEVER, |acc, (_, flag)| acc | *flag)
        })
        .collect()
}

#[test]
fn test_flags_combine_bitwise() {
    let restrict = AuthRestrict::LOGGED_OUT | AuthRestrict::NOT_ADMIN;
    assert_eq!(restrict.bits(), 5);
    assert!(restrict.forbids(AuthRestrict::LOGGED_OUT));
    assert!(restrict.forbids(AuthRestrict::NOT_ADMIN));
    assert!(!restrict.forbids(AuthRestrict::LOGGED_IN));
    assert!(!restrict.forbids(AuthRestrict::NEVER));
    assert!(AuthRestrict::NEVER.is_never());

    let mut accumulated = AuthRestrict::NEVER;
    accumulated |= AuthRestrict::LOGGED_IN;
    assert_eq!(accumulated, AuthRestrict::LOGGED_IN);
}

#[test]
fn test_pending_viewer_never_redirects() {
    for restrict in all_restrictions() {
        let decision = evaluate(&ViewerState::Pending, restrict, "/settings");
        if restrict.is_never() {
            assert_eq!(decision, AccessDecision::Render);
        } else {
            assert_eq!(decision, AccessDecision::Pending, "restrict {restrict:?}");
        }
    }
}

#[test]
fn test_failed_viewer_never_redirects() {
    let failed = ViewerState::Failed(BackendError::Network("connection refused".into()));
    for restrict in all_restrictions() {
        assert_eq!(evaluate(&failed, restrict, "/"), AccessDecision::Render);
    }
}

#[test]
fn test_anonymous_viewer_redirected_to_login_with_encoded_path() {
    let decision = evaluate(
        &ViewerState::Absent,
        AuthRestrict::LOGGED_OUT,
        "/settings/emails?tab=1&x=a b",
    );
    assert_eq!(
        decision,
        AccessDecision::RedirectLogin(
            "/login?next=%2Fsettings%2Femails%3Ftab%3D1%26x%3Da+b".to_string()
        )
    );
}

#[test]
fn test_anonymous_viewer_allowed_where_only_login_is_forbidden() {
    assert_eq!(
        evaluate(&ViewerState::Absent, AuthRestrict::LOGGED_IN, "/login"),
        AccessDecision::Render
    );
    // NOT_ADMIN alone does not send anonymous viewers anywhere
    assert_eq!(
        evaluate(&ViewerState::Absent, AuthRestrict::NOT_ADMIN, "/admin/event/list"),
        AccessDecision::Render
    );
}

#[test]
fn test_non_admin_redirected_home() {
    let decision = evaluate(
        &ViewerState::Present(viewer(false)),
        AuthRestrict::LOGGED_OUT | AuthRestrict::NOT_ADMIN,
        "/admin/event/list",
    );
    assert_eq!(decision, AccessDecision::RedirectHome);
}

#[test]
fn test_admin_renders_admin_pages() {
    let decision = evaluate(
        &ViewerState::Present(viewer(true)),
        AuthRestrict::LOGGED_OUT | AuthRestrict::NOT_ADMIN,
        "/admin/event/list",
    );
    assert_eq!(decision, AccessDecision::Render);
}

#[test]
fn test_logged_in_viewer_redirected_home_from_login() {
    for is_admin in [false, true] {
        let decision = evaluate(
            &ViewerState::Present(viewer(is_admin)),
            AuthRestrict::LOGGED_IN,
            "/login",
        );
        assert_eq!(decision, AccessDecision::RedirectHome);
    }
}

#[test]
fn test_full_decision_table() {
    let states = [
        ViewerState::Pending,
        ViewerState::Failed(BackendError::graphql("boom", Some("XX000"))),
        ViewerState::Absent,
        ViewerState::Present(viewer(false)),
        ViewerState::Present(viewer(true)),
    ];

    for state in &states {
        for restrict in all_restrictions() {
            let expected = match state {
                ViewerState::Pending if !restrict.is_never() => AccessDecision::Pending,
                ViewerState::Present(v)
                    if restrict.forbids(AuthRestrict::LOGGED_IN)
                        || (restrict.forbids(AuthRestrict::NOT_ADMIN) && !v.is_admin) =>
                {
                    AccessDecision::RedirectHome
                }
                ViewerState::Absent if restrict.forbids(AuthRestrict::LOGGED_OUT) => {
                    AccessDecision::RedirectLogin("/login?next=%2Fp".to_string())
                }
                _ => AccessDecision::Render,
            };
            assert_eq!(
                evaluate(state, restrict, "/p"),
                expected,
                "state {state:?}, restrict {restrict:?}"
            );
        }
    }
}

#[test]
fn test_login_href_encodes_next() {
    assert_eq!(login_href("/"), "/login?next=%2F");
}

#[test]
fn test_safe_next_only_accepts_local_paths() {
    assert_eq!(safe_next(Some("/settings")), "/settings");
    assert_eq!(safe_next(Some("/a?b=c")), "/a?b=c");
    assert_eq!(safe_next(None), "/");
    assert_eq!(safe_next(Some("")), "/");
    assert_eq!(safe_next(Some("https://evil.example")), "/");
    assert_eq!(safe_next(Some("//evil.example")), "/");
    assert_eq!(safe_next(Some("/\\evil.example")), "/");
    assert_eq!(safe_next(Some("/\t/evil.example")), "/");
    assert_eq!(safe_next(Some("/\r\n/evil.example")), "/");
}

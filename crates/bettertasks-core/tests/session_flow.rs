mod support;

use std::fs;

use bettertasks_core::auth::{self, Credentials};
use bettertasks_core::error::{ValidationError, user_message};
use bettertasks_core::session::{Session, Theme};
use support::FakeApi;
use tempfile::tempdir;

fn creds(email: &str, password: &str) -> Credentials {
    Credentials {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn session_values_roundtrip_and_logout_keeps_theme() {
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");

    assert_eq!(session.load_user_id().expect("user"), None);
    assert_eq!(session.load_active_list().expect("active list"), None);
    assert_eq!(session.load_theme().expect("theme"), Theme::Light);

    session.save_user_id(42).expect("save user");
    session.save_active_list(Some(7)).expect("save list");
    session.save_theme(Theme::Dark).expect("save theme");

    let reopened = Session::open(temp.path()).expect("reopen session");
    assert_eq!(reopened.load_user_id().expect("user"), Some(42));
    assert_eq!(reopened.load_active_list().expect("active list"), Some(7));
    assert_eq!(reopened.load_theme().expect("theme"), Theme::Dark);

    auth::logout(&reopened).expect("logout");
    assert_eq!(reopened.load_user_id().expect("user"), None);
    assert_eq!(reopened.load_active_list().expect("active list"), None);
    assert_eq!(reopened.load_theme().expect("theme"), Theme::Dark);
}

#[test]
fn malformed_session_files_read_as_absent() {
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");
    fs::write(&session.user_path, "not-a-number\n").expect("write user");
    fs::write(&session.theme_path, "sepia").expect("write theme");

    assert_eq!(session.load_user_id().expect("user"), None);
    assert_eq!(session.load_theme().expect("theme"), Theme::Light);
}

#[test]
fn clearing_the_active_list_removes_the_file() {
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");

    session.save_active_list(Some(3)).expect("save list");
    assert!(session.active_list_path.exists());
    session.save_active_list(None).expect("clear list");
    assert!(!session.active_list_path.exists());
}

#[test]
fn register_then_login_stores_the_user() {
    let api = FakeApi::new();
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");

    let user = auth::register(&api, &session, "Ada", &creds(" ada@example.com ", "hunter22"))
        .expect("register");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(session.load_user_id().expect("user"), Some(user.id));

    auth::logout(&session).expect("logout");
    let again = auth::login(&api, &session, &creds("ada@example.com", "hunter22")).expect("login");
    assert_eq!(again.id, user.id);
    assert_eq!(session.load_user_id().expect("user"), Some(user.id));
}

#[test]
fn duplicate_registration_shows_the_server_detail() {
    let api = FakeApi::new();
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");
    auth::register(&api, &session, "Ada", &creds("ada@example.com", "hunter22"))
        .expect("register");
    auth::logout(&session).expect("logout");

    let err = auth::register(&api, &session, "Ada", &creds("ada@example.com", "hunter22"))
        .expect_err("duplicate email");

    assert_eq!(user_message(&err), "Email already registered");
    assert_eq!(session.load_user_id().expect("user"), None);
}

#[test]
fn invalid_credentials_never_reach_the_server() {
    let api = FakeApi::new();
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");

    let err = auth::login(&api, &session, &creds("ada@example.com", "short"))
        .expect_err("short password");
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::PasswordTooShort)
    );

    let err = auth::register(&api, &session, "  ", &creds("ada@example.com", "hunter22"))
        .expect_err("missing name");
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::MissingName)
    );

    assert_eq!(api.total_calls(), 0);
}

#[test]
fn failed_login_leaves_the_session_signed_out() {
    let api = FakeApi::new();
    let temp = tempdir().expect("tempdir");
    let session = Session::open(temp.path()).expect("open session");

    let err = auth::login(&api, &session, &creds("nobody@example.com", "hunter22"))
        .expect_err("unknown user");

    assert_eq!(user_message(&err), "Invalid email or password");
    assert_eq!(session.load_user_id().expect("user"), None);
}

use super::*;

#[test]
fn fs_error_mapping() {
    let e: AppError = FsError::NotFound("/a".into()).into();
    assert!(matches!(e, AppError::NotFound { .. }));
    assert_eq!(e.code_str(), "ENOENT");

    let e: AppError = FsError::AlreadyExists("/a".into()).into();
    assert!(matches!(e, AppError::Conflict { .. }));
    assert_eq!(e.code_str(), "EEXIST");

    let e: AppError = FsError::NotEmpty("/d/".into()).into();
    assert!(matches!(e, AppError::Conflict { .. }));

    let e: AppError = FsError::PermissionDenied("/a".into()).into();
    assert!(matches!(e, AppError::Forbidden { .. }));

    let e: AppError = FsError::InvalidPath { path: "/..".into(), reason: "dots".into() }.into();
    assert!(matches!(e, AppError::UserInput { .. }));
    assert_eq!(e.code_str(), "EINVAL");
}

#[test]
fn json_body_carries_type_code_and_message() {
    let body = AppError::conflict("EEXIST", "already exists: /a/c.txt").to_json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["type"], "conflict");
    assert_eq!(body["code"], "EEXIST");
    assert_eq!(body["message"], "already exists: /a/c.txt");
}

#[test]
fn every_error_is_a_500() {
    let resp = AppError::not_found("ENOENT", "missing").into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let resp = AppError::user("bad_encoding", "nope").into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

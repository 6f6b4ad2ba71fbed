use super::*;

fn temp_file(tag: &str) -> std::path::PathBuf {
    let unique = format!(
        "bastion-response-{}-{}.bin",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    );
    std::env::temp_dir().join(unique)
}

#[test]
fn delete_removes_an_existing_file() {
    let path = temp_file("delete");
    fs::write(&path, b"payload").expect("seed file");

    delete_file(path.to_str().expect("utf-8 path")).expect("delete");
    assert!(!path.exists());
}

#[test]
fn delete_reports_missing_file() {
    let path = temp_file("missing");
    let err = delete_file(path.to_str().expect("utf-8 path")).expect_err("missing file");
    assert!(matches!(err, crate::ResponseError::Io(_)));
}

use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(OzError::config("x").to_string().contains("config error:"));
    assert!(OzError::source("x").to_string().contains("source error:"));
    assert!(OzError::module("x").to_string().contains("module error:"));
    assert!(
        OzError::animation("x")
            .to_string()
            .contains("animation error:")
    );
    assert!(
        OzError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = OzError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn serde_json_errors_convert() {
    let err: OzError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, OzError::Serde(_)));
}

//! Property tests for path containment.

use std::path::{Component, Path};

use proptest::prelude::*;
use stoa_static::path::{decode_path, resolve_path, strip_root};
use stoa_static::ServeError;

const ROOT: &str = "/srv/www";

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("..".to_string()),
        Just(".".to_string()),
        Just(String::new()),
        Just("%2e%2e".to_string()),
        Just("%00".to_string()),
        Just("C:".to_string()),
        "[a-zA-Z0-9._-]{1,8}",
    ]
}

fn request_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(segment(), 0..8),
        prop_oneof![Just('/'), Just('\\')],
    )
        .prop_map(|(segments, sep)| format!("/{}", segments.join(&sep.to_string())))
}

fn resolve_request(path: &str) -> Result<std::path::PathBuf, ServeError> {
    let decoded = decode_path(strip_root(path))?;
    resolve_path(Path::new(ROOT), &decoded)
}

proptest! {
    #[test]
    fn resolved_paths_stay_under_root(path in request_path()) {
        match resolve_request(&path) {
            Ok(resolved) => {
                prop_assert!(resolved.starts_with(ROOT));
                let relative = resolved.strip_prefix(ROOT).unwrap();
                prop_assert!(relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_))));
            }
            Err(err) => {
                let status = err.status_code().as_u16();
                prop_assert!(status == 400 || status == 403, "unexpected status {}", status);
            }
        }
    }

    #[test]
    fn leading_parent_segment_always_escapes(tail in "[a-z/]{0,16}") {
        let path = format!("/../{tail}");
        prop_assert!(matches!(resolve_request(&path), Err(ServeError::PathEscape)));
    }

    #[test]
    fn embedded_nul_is_rejected(head in "[a-z]{0,8}", tail in "[a-z./]{0,8}") {
        let path = format!("/{head}%00{tail}");
        prop_assert!(matches!(resolve_request(&path), Err(ServeError::MaliciousPath)));
    }

    #[test]
    fn drive_prefixes_are_rejected(drive in "[a-zA-Z]", tail in "[a-z/]{0,8}") {
        let path = format!("/{drive}:{tail}");
        prop_assert!(matches!(resolve_request(&path), Err(ServeError::MaliciousPath)));
    }
}

#[test]
fn known_escapes() {
    for path in ["/../secret.txt", "/a/../../secret.txt", "/..%2fsecret", "/..\\secret", "/%2e%2e%5csecret"] {
        assert!(
            matches!(resolve_request(path), Err(ServeError::PathEscape)),
            "{path} should escape"
        );
    }
}

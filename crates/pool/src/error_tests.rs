// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    refused = { "error connecting to server: Connection refused (os error 111)", ConnectFailure::ServerDown },
    auth = { "password authentication failed for user \"postgres\"", ConnectFailure::BadCredentials },
    missing_db = { "database \"vigil\" does not exist", ConnectFailure::MissingDatabase },
    dns = { "failed to lookup address information: Name or service not known", ConnectFailure::BadAddress },
    unknown = { "something odd happened", ConnectFailure::Other },
)]
fn classify_message_distinguishes_common_causes(message: &str, expected: ConnectFailure) {
    assert_eq!(ConnectFailure::classify_message(message), expected);
}

#[test]
fn exhaustion_is_distinct_from_connection_errors() {
    let exhausted = PoolError::Exhausted {
        timeout: Duration::from_secs(1),
    };
    let refused = PoolError::Connection(BackendError::new(ConnectFailure::ServerDown, "refused"));

    assert!(exhausted.is_exhausted());
    assert!(!refused.is_exhausted());
    assert_eq!(exhausted.failure_kind(), None);
    assert_eq!(refused.failure_kind(), Some(ConnectFailure::ServerDown));
}

#[test]
fn backend_error_display_includes_kind() {
    let err = BackendError::lost(ConnectFailure::BadCredentials, "denied");
    assert_eq!(err.to_string(), "bad credentials: denied");
    assert!(err.connection_lost);
}

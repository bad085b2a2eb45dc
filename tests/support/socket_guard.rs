//! Fake-server tests need a bindable localhost port; sandboxes may refuse one.

use std::net::{Ipv4Addr, TcpListener};
use std::panic::Location;
use std::sync::OnceLock;

use wiremock::MockServer;

const STRICT_ENV: &str = "SONIC_MIRROR_REQUIRE_SOCKET_TESTS";

fn loopback_bindable() -> bool {
    static BINDABLE: OnceLock<bool> = OnceLock::new();
    *BINDABLE.get_or_init(|| TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).is_ok())
}

fn strict() -> bool {
    std::env::var(STRICT_ENV).is_ok_and(|value| {
        ["1", "true", "yes"]
            .iter()
            .any(|accepted| value.eq_ignore_ascii_case(accepted))
    })
}

/// Starts the fake OpenSubsonic server, or returns `None` (after a notice on
/// stderr) when localhost cannot be bound. Panics instead when
/// `SONIC_MIRROR_REQUIRE_SOCKET_TESTS` is set.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    async move {
        if loopback_bindable() {
            return Some(MockServer::start().await);
        }
        let notice = format!(
            "[fake-subsonic] {}:{} needs a localhost socket and none can be bound",
            caller.file(), caller.line()
        );
        assert!(!strict(), "{notice}; unset {STRICT_ENV} to skip instead");
        eprintln!("{notice}; skipping");
        None
    }
}

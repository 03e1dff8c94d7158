//! Manager API path templates.
//!
//! Identifiers are percent-encoded before they are spliced into a path or
//! query string.

use url::form_urlencoded;

pub(crate) fn register(account_id: &str) -> String {
    format!("/api/agent/delegates/register?accountId={}", enc(account_id))
}

pub(crate) fn heartbeat(account_id: &str) -> String {
    format!(
        "/api/agent/delegates/heartbeat-with-polling?accountId={}",
        enc(account_id)
    )
}

pub(crate) fn task_events(account_id: &str, delegate_id: &str) -> String {
    format!(
        "/api/agent/delegates/{}/task-events?accountId={}",
        enc(delegate_id),
        enc(account_id)
    )
}

pub(crate) fn acquire(account_id: &str, delegate_id: &str, task_id: &str) -> String {
    format!(
        "/api/agent/v2/delegates/{}/tasks/{}/acquire?accountId={}&delegateInstanceId={}",
        enc(delegate_id),
        enc(task_id),
        enc(account_id),
        enc(delegate_id)
    )
}

pub(crate) fn task_status(account_id: &str, delegate_id: &str, task_id: &str) -> String {
    format!(
        "/api/agent/v2/tasks/{}/delegates/{}?accountId={}",
        enc(task_id),
        enc(delegate_id),
        enc(account_id)
    )
}

/// Percent-encode one identifier. Spaces become `%20` so the result is valid
/// in a path segment as well as a query value.
fn enc(id: &str) -> String {
    form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_manager_api() {
        assert_eq!(
            register("acct"),
            "/api/agent/delegates/register?accountId=acct"
        );
        assert_eq!(
            heartbeat("acct"),
            "/api/agent/delegates/heartbeat-with-polling?accountId=acct"
        );
        assert_eq!(
            task_events("acct", "d1"),
            "/api/agent/delegates/d1/task-events?accountId=acct"
        );
        assert_eq!(
            acquire("acct", "d1", "t9"),
            "/api/agent/v2/delegates/d1/tasks/t9/acquire?accountId=acct&delegateInstanceId=d1"
        );
        assert_eq!(
            task_status("acct", "d1", "t9"),
            "/api/agent/v2/tasks/t9/delegates/d1?accountId=acct"
        );
    }

    #[test]
    fn identifiers_are_encoded() {
        assert_eq!(enc("a b/c&d"), "a%20b%2Fc%26d");
        assert_eq!(enc("plain-ID_1.2"), "plain-ID_1.2");
        assert_eq!(
            task_events("x&y=1", "d 1"),
            "/api/agent/delegates/d%201/task-events?accountId=x%26y%3D1"
        );
    }
}

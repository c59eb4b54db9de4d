use serde::{Deserialize, Serialize};

/// Connection metadata with secrets redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Redact the password and sensitive query parameters of a connection URL.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let mut info = RedactedConnection {
        engine: None,
        user: None,
        host: None,
        port: None,
        database: None,
        redacted: conn.to_string(),
    };

    let Some((scheme, rest)) = conn.split_once("://") else {
        info.redacted = redact_query_params(conn);
        return info;
    };
    info.engine = Some(scheme.to_string());

    let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = location.split_once('/').unwrap_or((location, ""));
    let (auth, host_port) = match authority.rsplit_once('@') {
        Some((auth, host_port)) => (Some(auth), host_port),
        None => (None, authority),
    };

    let mut redacted_auth = String::new();
    if let Some(auth) = auth {
        match auth.split_once(':') {
            Some((user, _password)) => {
                info.user = Some(user.to_string());
                redacted_auth = format!("{user}:***@");
            }
            None => {
                info.user = Some(auth.to_string());
                redacted_auth = format!("{auth}@");
            }
        }
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => {
            info.host = Some(host.to_string());
            info.port = port.parse().ok();
        }
        _ if !host_port.is_empty() => info.host = Some(host_port.to_string()),
        _ => {}
    }

    if !path.is_empty() {
        info.database = Some(path.to_string());
    }

    let mut redacted = format!("{scheme}://{redacted_auth}{host_port}");
    if !path.is_empty() {
        redacted.push('/');
        redacted.push_str(path);
    }
    if let Some(query) = query {
        redacted = redact_query_params(&format!("{redacted}?{query}"));
    }
    info.redacted = redacted;
    info
}

fn redact_query_params(conn: &str) -> String {
    let Some((base, query)) = conn.split_once('?') else {
        return conn.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect();

    format!("{base}?{}", params.join("&"))
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pass" | "token" | "api_key" | "apikey" | "sslpassword"
    )
}

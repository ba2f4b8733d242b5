//! Table definitions: column order for the bulk copies and first-run DDL.

use tokio_postgres::types::Type;

/// Ordered column list for the `sessions` bulk copy.
pub const SESSION_COLUMNS: [&str; 34] = [
    "sid",
    "uid",
    "source",
    "start_time",
    "end_time",
    "total_bytes",
    "codec",
    "quality",
    "ip",
    "referer",
    "ua_browser",
    "ua_browser_version",
    "ua_device",
    "ua_os",
    "ua_is_desktop",
    "ua_is_mobile",
    "ua_is_tablet",
    "ua_is_tv",
    "ua_is_bot",
    "ua_is_android",
    "ua_is_ios",
    "ua_is_windows",
    "ua_is_linux",
    "ua_is_mac",
    "ua_is_openbsd",
    "ua_is_chromeos",
    "ua_is_chrome",
    "ua_is_firefox",
    "ua_is_safari",
    "ua_is_edge",
    "ua_is_opera",
    "ua_is_samsung_browser",
    "ua_is_vivaldi",
    "ua_is_yandex_browser",
];

/// Ordered column list for the `listeners_total` bulk copy.
pub const LISTENERS_COLUMNS: [&str; 4] = ["timestamp", "source", "mount", "count"];

/// Postgres types matching [`SESSION_COLUMNS`], in the same order.
pub fn session_types() -> Vec<Type> {
    let mut types = vec![
        Type::UUID,
        Type::UUID,
        Type::INT2,
        Type::TIMESTAMPTZ,
        Type::TIMESTAMPTZ,
        Type::INT8,
        Type::INT2,
        Type::INT2,
        Type::INET,
        Type::VARCHAR,
        Type::VARCHAR,
        Type::VARCHAR,
        Type::VARCHAR,
        Type::VARCHAR,
    ];
    types.resize(SESSION_COLUMNS.len(), Type::BOOL);
    types
}

/// Postgres types matching [`LISTENERS_COLUMNS`], in the same order.
pub fn listeners_types() -> Vec<Type> {
    vec![Type::TIMESTAMPTZ, Type::INT2, Type::VARCHAR, Type::INT8]
}

pub fn copy_sessions_statement() -> String {
    format!(
        "COPY sessions ({}) FROM STDIN BINARY",
        SESSION_COLUMNS.join(", ")
    )
}

pub fn copy_listeners_statement() -> String {
    format!(
        "COPY listeners_total ({}) FROM STDIN BINARY",
        LISTENERS_COLUMNS.join(", ")
    )
}

pub const CREATE_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    sid UUID NOT NULL,
    uid UUID NOT NULL,
    source SMALLINT NOT NULL,
    start_time TIMESTAMPTZ NOT NULL,
    end_time TIMESTAMPTZ NOT NULL,
    total_bytes BIGINT NOT NULL,
    codec SMALLINT NOT NULL,
    quality SMALLINT NOT NULL,
    ip INET,
    referer VARCHAR(255),
    ua_browser VARCHAR(255),
    ua_browser_version VARCHAR(255),
    ua_device VARCHAR(255),
    ua_os VARCHAR(255),
    ua_is_desktop BOOLEAN NOT NULL,
    ua_is_mobile BOOLEAN NOT NULL,
    ua_is_tablet BOOLEAN NOT NULL,
    ua_is_tv BOOLEAN NOT NULL,
    ua_is_bot BOOLEAN NOT NULL,
    ua_is_android BOOLEAN NOT NULL,
    ua_is_ios BOOLEAN NOT NULL,
    ua_is_windows BOOLEAN NOT NULL,
    ua_is_linux BOOLEAN NOT NULL,
    ua_is_mac BOOLEAN NOT NULL,
    ua_is_openbsd BOOLEAN NOT NULL,
    ua_is_chromeos BOOLEAN NOT NULL,
    ua_is_chrome BOOLEAN NOT NULL,
    ua_is_firefox BOOLEAN NOT NULL,
    ua_is_safari BOOLEAN NOT NULL,
    ua_is_edge BOOLEAN NOT NULL,
    ua_is_opera BOOLEAN NOT NULL,
    ua_is_samsung_browser BOOLEAN NOT NULL,
    ua_is_vivaldi BOOLEAN NOT NULL,
    ua_is_yandex_browser BOOLEAN NOT NULL
)
"#;

pub const CREATE_LISTENERS_TOTAL: &str = r#"
CREATE TABLE IF NOT EXISTS listeners_total (
    timestamp TIMESTAMPTZ NOT NULL,
    source SMALLINT NOT NULL,
    mount VARCHAR(255) NOT NULL,
    count BIGINT NOT NULL
)
"#;

//! Database schema and migrations for mailroom.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations (SQLite dialect).
#[cfg(feature = "sqlite")]
pub const MIGRATIONS: &[&str] = &[
    // v1: client entries
    r#"
CREATE TABLE client (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,  -- never reused, keeps cursors monotonic
    email       TEXT NOT NULL,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    mailing_id  INTEGER NOT NULL,
    insert_time TEXT NOT NULL,
    UNIQUE (email, title, content, mailing_id, insert_time)
);

CREATE INDEX idx_client_mailing_id ON client(mailing_id);
CREATE INDEX idx_client_insert_time ON client(insert_time);
"#,
];

/// Database migrations (PostgreSQL dialect).
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub const MIGRATIONS: &[&str] = &[
    // v1: client entries
    r#"
CREATE TABLE client (
    id          BIGSERIAL PRIMARY KEY,
    email       TEXT NOT NULL,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    mailing_id  BIGINT NOT NULL,
    insert_time TIMESTAMPTZ NOT NULL,
    CONSTRAINT client_payload_unique UNIQUE (email, title, content, mailing_id, insert_time)
);

CREATE INDEX idx_client_mailing_id ON client(mailing_id);
CREATE INDEX idx_client_insert_time ON client(insert_time);
"#,
];

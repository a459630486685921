//! SQL schema for the tiergate SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Profile and subscription live in one row so that a role change and a
/// count change for the same identity can never interleave half-applied.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are never deleted while the identity exists.
CREATE TABLE IF NOT EXISTS accounts (
    identity        TEXT PRIMARY KEY,
    email           TEXT NOT NULL,
    full_name       TEXT,
    phone           TEXT,
    email_key       TEXT NOT NULL DEFAULT '',         -- Unicode-lowercased email
    name_key        TEXT NOT NULL DEFAULT '',         -- Unicode-lowercased full_name
    role            TEXT NOT NULL DEFAULT 'free',     -- 'free' | 'paid' | 'super'
    status          TEXT NOT NULL DEFAULT 'active',   -- 'active' | 'inactive' | 'trial' | 'expired'
    valid_from      TEXT,                             -- RFC 3339 UTC or NULL
    valid_until     TEXT,                             -- RFC 3339 UTC or NULL
    resource_count  INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    CHECK (resource_count >= 0),
    CHECK (valid_from IS NULL OR valid_until IS NULL OR valid_from <= valid_until)
);

CREATE INDEX IF NOT EXISTS accounts_created_idx ON accounts(created_at);
CREATE INDEX IF NOT EXISTS accounts_role_idx    ON accounts(role);

PRAGMA user_version = 1;
";

//! SQL schema for the linkshelf SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One document per user. `links_json` holds the ordered link collection;
-- NULL means the collection was never initialised.
CREATE TABLE IF NOT EXISTS users (
    uid         TEXT PRIMARY KEY,
    username    TEXT UNIQUE,              -- exact, case-sensitive
    photo_url   TEXT,
    background  TEXT,
    color       TEXT,
    links_json  TEXT,
    revision    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    uid                  TEXT NOT NULL REFERENCES users(uid),
    subscription_id      TEXT NOT NULL,
    status               TEXT NOT NULL,   -- 'trialing' | 'active' | 'canceled' | other
    cancel_at_period_end INTEGER NOT NULL DEFAULT 0,
    current_period_end   TEXT,
    PRIMARY KEY (uid, subscription_id)
);

CREATE TABLE IF NOT EXISTS templates (
    template_id TEXT PRIMARY KEY,
    doc_json    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY REFERENCES users(uid),
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 of a reset token is stored.
CREATE TABLE IF NOT EXISTS reset_tokens (
    token_hash TEXT PRIMARY KEY,
    uid        TEXT NOT NULL REFERENCES accounts(uid),
    expires_at TEXT NOT NULL
);

PRAGMA user_version = 1;
";

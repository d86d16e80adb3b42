// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test fixtures: temp databases and seeded entities.

use std::sync::Arc;

use crosstalk_core::types::{Channel, ChannelKind, Intent};
use crosstalk_storage::Database;
use crosstalk_storage::queries::{channels, intents};

/// Open a fresh migrated database in a temp directory.
///
/// The returned `TempDir` must be kept alive for the database's lifetime.
pub async fn temp_database() -> (Arc<Database>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("crosstalk-test.db");
    let db = Database::open(db_path.to_str().expect("utf-8 temp path"))
        .await
        .expect("open test database");
    (Arc::new(db), dir)
}

/// Insert an active channel with the given id and kind.
pub async fn seed_channel(db: &Database, id: &str, kind: ChannelKind) -> Channel {
    let channel = Channel {
        id: id.to_string(),
        name: format!("{kind} channel"),
        kind,
        configuration: None,
        is_active: true,
    };
    channels::insert_channel(db, &channel)
        .await
        .expect("seed channel");
    channel
}

/// Insert an intent with the given training phrases.
pub async fn seed_intent(db: &Database, id: &str, name: &str, phrases: &[&str]) -> Intent {
    let intent = Intent {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        training_phrases: phrases.iter().map(|p| p.to_string()).collect(),
    };
    intents::insert_intent(db, &intent).await.expect("seed intent");
    intent
}

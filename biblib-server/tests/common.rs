use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use biblib_core::{
    application::LibraryServices,
    database::{
        InMemoryLibraryStore, LibraryRepository, LibraryStore, PermissionStore,
        UserRepository,
    },
    read_path::ReadPathConfig,
    testing::{StubIdentity, StubIndex},
};
use biblib_model::{
    AbsoluteUid, Library, LibraryId, RoleFlags,
    chrono::{TimeZone, Utc},
};
use biblib_server::{AppState, create_app};

pub const OWNER_UID: i64 = 1;
pub const OWNER_EMAIL: &str = "owner@example.org";
pub const READER_UID: i64 = 2;
pub const READER_EMAIL: &str = "reader@example.org";
pub const STRANGER_UID: i64 = 3;

pub const CREATED_AT: i64 = 1_600_000_000;

// Code is used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryLibraryStore,
    pub index: Arc<StubIndex>,
}

#[allow(unused)]
impl TestApp {
    pub fn new() -> Self {
        Self::with(StubIndex::new(), ReadPathConfig::default())
    }

    pub fn with(index: StubIndex, config: ReadPathConfig) -> Self {
        let store = InMemoryLibraryStore::new();
        let index = Arc::new(index);
        let identity = StubIdentity::new()
            .with_user(OWNER_UID, OWNER_EMAIL)
            .with_user(READER_UID, READER_EMAIL);

        let services = LibraryServices::new(
            Arc::new(store.clone()),
            index.clone(),
            Arc::new(identity),
            config,
        );
        let server = TestServer::new(create_app(AppState::new(services)))
            .expect("failed to build test server");

        Self {
            server,
            store,
            index,
        }
    }

    /// Store a library owned by `OWNER_UID` with documents at fixed
    /// timestamps, bypassing the HTTP layer.
    pub async fn seed_library(
        &self,
        public: bool,
        documents: &[(&str, f64)],
    ) -> LibraryId {
        let created_at = Utc
            .timestamp_opt(CREATED_AT, 0)
            .single()
            .expect("valid timestamp");

        let mut tx = self.store.begin().await.expect("begin");
        let owner = tx
            .ensure_user(AbsoluteUid(OWNER_UID))
            .await
            .expect("owner user");

        let mut library =
            Library::new("Seeded", "Seeded for tests", public, owner.id, created_at);
        for (identifier, at) in documents {
            library.documents.add([*identifier], *at);
        }

        tx.insert_library(&library).await.expect("insert library");
        tx.set_permission(owner.id, library.id, RoleFlags::owner())
            .await
            .expect("owner permission");
        tx.commit().await.expect("commit");
        library.id
    }
}

pub fn uid_header(uid: i64) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-adsws-uid"),
        HeaderValue::from_str(&uid.to_string()).expect("numeric header"),
    )
}

#[allow(unused)]
pub fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(value).expect("valid header value"),
    )
}

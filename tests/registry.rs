//! Registry behavior against a live PostgreSQL server.
//!
//! Set `REGISTRY_TEST_DATABASE_URL` to run these. Each test works in its own
//! schema on its own connection, so tests can run in parallel against one
//! database. Without the variable every test returns early.

use client_registry::db::{registry, schema};
use client_registry::models::{ClientFilter, ClientUpdate, NewClient, PhoneUpdate};
use client_registry::RegistryError;
use sqlx::{Connection, PgConnection};

const TEST_DATABASE_URL: &str = "REGISTRY_TEST_DATABASE_URL";

struct TestDb {
    conn: PgConnection,
    schema: String,
}

impl TestDb {
    async fn open(test: &str) -> Option<Self> {
        let Ok(url) = std::env::var(TEST_DATABASE_URL) else {
            eprintln!("skipping {}: {} is not set", test, TEST_DATABASE_URL);
            return None;
        };

        let mut conn = PgConnection::connect(&url).await.unwrap();
        let schema = format!("registry_test_{}_{}", test, std::process::id());

        for statement in [
            format!("DROP SCHEMA IF EXISTS {} CASCADE", schema),
            format!("CREATE SCHEMA {}", schema),
            format!("SET search_path TO {}", schema),
        ] {
            sqlx::query(&statement).execute(&mut conn).await.unwrap();
        }

        schema::initialize_schema(&mut conn).await.unwrap();

        Some(Self { conn, schema })
    }

    async fn close(mut self) {
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&mut self.conn)
            .await
            .unwrap();
        self.conn.close().await.unwrap();
    }

    async fn phone_rows(&mut self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM numbers")
            .fetch_one(&mut self.conn)
            .await
            .unwrap()
    }
}

fn ivan() -> NewClient {
    NewClient::new("Ivan", "Ivanov", "ivanov@mail.ru").with_phone("+7 999 888 77 66")
}

fn petr() -> NewClient {
    NewClient::new("Petr", "Petrov", "petrov@mail.ru").with_phone("+7 999 555 44 33")
}

#[tokio::test]
async fn added_client_is_found_by_email() {
    let Some(mut db) = TestDb::open("found_by_email").await else { return };

    let id = registry::add_client(&mut db.conn, &ivan()).await.unwrap();
    let found = registry::find_client(&mut db.conn, &ClientFilter::by_email("ivanov@mail.ru"))
        .await
        .unwrap();
    assert_eq!(found, vec![id]);

    assert_eq!(
        registry::client_id_by_email(&mut db.conn, "ivanov@mail.ru").await.unwrap(),
        Some(id)
    );
    assert_eq!(
        registry::client_id_by_email(&mut db.conn, "nobody@mail.ru").await.unwrap(),
        None
    );

    db.close().await;
}

#[tokio::test]
async fn duplicate_email_is_rejected_and_first_client_kept() {
    let Some(mut db) = TestDb::open("duplicate_email").await else { return };

    let first = registry::add_client(&mut db.conn, &ivan()).await.unwrap();

    let duplicate = NewClient::new("Ivan", "Sidorov", "ivanov@mail.ru").with_phone("+7 111");
    let err = registry::add_client(&mut db.conn, &duplicate).await.unwrap_err();
    match err {
        RegistryError::DuplicateEmail { email } => assert_eq!(email, "ivanov@mail.ru"),
        other => panic!("expected DuplicateEmail, got {:?}", other),
    }

    let record = registry::get_client(&mut db.conn, first).await.unwrap();
    assert_eq!(record.client.last_name, "Ivanov");
    assert_eq!(record.phones.len(), 1);
    assert_eq!(db.phone_rows().await, 1);

    db.close().await;
}

#[tokio::test]
async fn client_and_phones_are_inserted_together() {
    let Some(mut db) = TestDb::open("insert_atomic").await else { return };

    let client = NewClient::new("Ivan", "Ivanov", "ivanov@mail.ru")
        .with_phone("+7 999 888 77 66")
        .with_phone("+7 999 888 77 66 ext. 12345678");
    let err = registry::add_client(&mut db.conn, &client).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidInput { .. }), "{:?}", err);

    let found = registry::find_client(&mut db.conn, &ClientFilter::by_email("ivanov@mail.ru"))
        .await
        .unwrap();
    assert!(found.is_empty());
    assert_eq!(db.phone_rows().await, 0);

    db.close().await;
}

#[tokio::test]
async fn add_phone_to_unknown_client_fails() {
    let Some(mut db) = TestDb::open("phone_unknown_client").await else { return };

    let err = registry::add_phone(&mut db.conn, 42, "+7 000").await.unwrap_err();
    match err {
        RegistryError::UnknownClient { client_id } => assert_eq!(client_id, 42),
        other => panic!("expected UnknownClient, got {:?}", other),
    }
    assert_eq!(db.phone_rows().await, 0);

    db.close().await;
}

#[tokio::test]
async fn add_phone_appends_to_existing_client() {
    let Some(mut db) = TestDb::open("phone_append").await else { return };

    let id = registry::add_client(&mut db.conn, &ivan()).await.unwrap();
    let phone_id = registry::add_phone(&mut db.conn, id, "+7 111 222 33 44").await.unwrap();

    let phones = registry::list_phones(&mut db.conn, id).await.unwrap();
    assert_eq!(phones.len(), 2);
    assert_eq!(phones[1].id, phone_id);
    assert_eq!(phones[1].number, "+7 111 222 33 44");

    db.close().await;
}

#[tokio::test]
async fn phone_lookup_and_removal() {
    let Some(mut db) = TestDb::open("phone_scenario").await else { return };

    let id = registry::add_client(&mut db.conn, &ivan()).await.unwrap();
    assert_eq!(id, 1);

    let by_phone = ClientFilter::by_phone("+7 999 888 77 66");
    assert_eq!(registry::find_client(&mut db.conn, &by_phone).await.unwrap(), vec![1]);

    let deleted = registry::delete_phone(&mut db.conn, 1, "+7 999 888 77 66").await.unwrap();
    assert_eq!(deleted, 1);
    assert!(registry::find_client(&mut db.conn, &by_phone).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn delete_phone_without_match_is_not_an_error() {
    let Some(mut db) = TestDb::open("phone_no_match").await else { return };

    let id = registry::add_client(&mut db.conn, &ivan()).await.unwrap();
    let deleted = registry::delete_phone(&mut db.conn, id, "+1 555%").await.unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(db.phone_rows().await, 1);

    db.close().await;
}

#[tokio::test]
async fn delete_phone_supports_wildcards() {
    let Some(mut db) = TestDb::open("phone_wildcards").await else { return };

    let client = NewClient::new("Ivan", "Ivanov", "ivanov@mail.ru")
        .with_phone("+7 999 888 77 66")
        .with_phone("+7 999 111 22 33")
        .with_phone("+1 555 0100");
    let id = registry::add_client(&mut db.conn, &client).await.unwrap();
    let other = registry::add_client(&mut db.conn, &petr()).await.unwrap();

    let deleted = registry::delete_phone(&mut db.conn, id, "+7 999%").await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = registry::list_phones(&mut db.conn, id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].number, "+1 555 0100");

    let deleted = registry::delete_phone(&mut db.conn, id, "+1 555 010_").await.unwrap();
    assert_eq!(deleted, 1);

    // Other clients' numbers are out of reach of the pattern
    assert_eq!(registry::list_phones(&mut db.conn, other).await.unwrap().len(), 1);

    db.close().await;
}

#[tokio::test]
async fn update_then_delete_client() {
    let Some(mut db) = TestDb::open("update_scenario").await else { return };

    registry::add_client(&mut db.conn, &ivan()).await.unwrap();
    let id = registry::add_client(&mut db.conn, &petr()).await.unwrap();
    assert_eq!(id, 2);

    let update = ClientUpdate::new()
        .first_name("Igor")
        .last_name("Igorev")
        .email("igorev@mail.ru");
    registry::update_client(&mut db.conn, 2, &update).await.unwrap();

    let igor = registry::find_client(&mut db.conn, &ClientFilter::by_first_name("Igor"))
        .await
        .unwrap();
    assert_eq!(igor, vec![2]);
    let petr = registry::find_client(&mut db.conn, &ClientFilter::by_first_name("Petr"))
        .await
        .unwrap();
    assert!(petr.is_empty());

    assert!(registry::delete_client(&mut db.conn, 2).await.unwrap());
    let igorev = registry::find_client(&mut db.conn, &ClientFilter::by_last_name("Igorev"))
        .await
        .unwrap();
    assert!(igorev.is_empty());

    db.close().await;
}

#[tokio::test]
async fn update_leaves_absent_fields_alone() {
    let Some(mut db) = TestDb::open("update_partial").await else { return };

    let id = registry::add_client(&mut db.conn, &petr()).await.unwrap();
    registry::update_client(&mut db.conn, id, &ClientUpdate::new().last_name("Sidorov"))
        .await
        .unwrap();

    let record = registry::get_client(&mut db.conn, id).await.unwrap();
    assert_eq!(record.client.first_name, "Petr");
    assert_eq!(record.client.last_name, "Sidorov");
    assert_eq!(record.client.email, "petrov@mail.ru");
    assert_eq!(record.phones[0].number, "+7 999 555 44 33");

    db.close().await;
}

#[tokio::test]
async fn update_of_unknown_client_is_reported() {
    let Some(mut db) = TestDb::open("update_unknown").await else { return };

    let err = registry::update_client(&mut db.conn, 7, &ClientUpdate::new().first_name("Igor"))
        .await
        .unwrap_err();
    assert!(err.is_unknown_client(), "{:?}", err);

    // Phone-only updates need the client too
    let update = ClientUpdate::new().phones(PhoneUpdate::OverwriteAll("+7 000".into()));
    let err = registry::update_client(&mut db.conn, 7, &update).await.unwrap_err();
    assert!(err.is_unknown_client(), "{:?}", err);

    db.close().await;
}

#[tokio::test]
async fn failed_update_changes_nothing() {
    let Some(mut db) = TestDb::open("update_atomic").await else { return };

    registry::add_client(&mut db.conn, &ivan()).await.unwrap();
    let id = registry::add_client(&mut db.conn, &petr()).await.unwrap();

    let update = ClientUpdate::new()
        .first_name("Igor")
        .email("ivanov@mail.ru")
        .phones(PhoneUpdate::OverwriteAll("+7 777 777 77 77".into()));
    let err = registry::update_client(&mut db.conn, id, &update).await.unwrap_err();
    assert!(err.is_duplicate_email(), "{:?}", err);

    let record = registry::get_client(&mut db.conn, id).await.unwrap();
    assert_eq!(record.client.first_name, "Petr");
    assert_eq!(record.client.email, "petrov@mail.ru");
    assert_eq!(record.phones[0].number, "+7 999 555 44 33");

    db.close().await;
}

#[tokio::test]
async fn overwrite_all_rewrites_every_number_in_place() {
    let Some(mut db) = TestDb::open("phones_overwrite").await else { return };

    let two = NewClient::new("Ivan", "Ivanov", "ivanov@mail.ru")
        .with_phone("+7 1")
        .with_phone("+7 2");
    let id = registry::add_client(&mut db.conn, &two).await.unwrap();
    let none = registry::add_client(&mut db.conn, &NewClient::new("A", "B", "ab@mail.ru"))
        .await
        .unwrap();

    let update = ClientUpdate::new().phones(PhoneUpdate::OverwriteAll("+7 777".into()));
    registry::update_client(&mut db.conn, id, &update).await.unwrap();
    registry::update_client(&mut db.conn, none, &update).await.unwrap();

    let phones = registry::list_phones(&mut db.conn, id).await.unwrap();
    assert_eq!(phones.len(), 2);
    assert!(phones.iter().all(|p| p.number == "+7 777"));
    assert!(registry::list_phones(&mut db.conn, none).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn replace_sets_exact_phone_list() {
    let Some(mut db) = TestDb::open("phones_replace").await else { return };

    let id = registry::add_client(&mut db.conn, &ivan()).await.unwrap();

    let update = ClientUpdate::new().phones(PhoneUpdate::Replace(vec!["+7 1".into(), "+7 2".into()]));
    registry::update_client(&mut db.conn, id, &update).await.unwrap();

    let numbers = registry::list_phones(&mut db.conn, id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.number)
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec!["+7 1", "+7 2"]);

    let clear = ClientUpdate::new().phones(PhoneUpdate::Replace(Vec::new()));
    registry::update_client(&mut db.conn, id, &clear).await.unwrap();
    assert_eq!(db.phone_rows().await, 0);

    db.close().await;
}

#[tokio::test]
async fn delete_client_is_idempotent() {
    let Some(mut db) = TestDb::open("delete_idempotent").await else { return };

    let client = ivan().with_phone("+7 123");
    let id = registry::add_client(&mut db.conn, &client).await.unwrap();

    assert!(registry::delete_client(&mut db.conn, id).await.unwrap());
    assert!(registry::list_phones(&mut db.conn, id).await.unwrap().is_empty());
    assert_eq!(db.phone_rows().await, 0);

    assert!(!registry::delete_client(&mut db.conn, id).await.unwrap());
    assert!(registry::get_client(&mut db.conn, id).await.unwrap_err().is_unknown_client());

    db.close().await;
}

#[tokio::test]
async fn shared_phone_number_finds_every_owner() {
    let Some(mut db) = TestDb::open("shared_phone").await else { return };

    let shared = "+7 495 000 00 00";
    let a = registry::add_client(&mut db.conn, &NewClient::new("A", "A", "a@mail.ru").with_phone(shared))
        .await
        .unwrap();
    let b = registry::add_client(
        &mut db.conn,
        &NewClient::new("B", "B", "b@mail.ru").with_phone(shared).with_phone(shared),
    )
    .await
    .unwrap();

    let found = registry::find_client(&mut db.conn, &ClientFilter::by_phone(shared))
        .await
        .unwrap();
    assert_eq!(found, vec![a, b]);

    db.close().await;
}

#[tokio::test]
async fn find_requires_exactly_one_criterion() {
    let Some(mut db) = TestDb::open("find_criteria").await else { return };

    let err = registry::find_client(&mut db.conn, &ClientFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::MissingCriteria));

    let both = ClientFilter {
        first_name: Some("Ivan".into()),
        last_name: Some("Ivanov".into()),
        ..ClientFilter::default()
    };
    let err = registry::find_client(&mut db.conn, &both).await.unwrap_err();
    assert!(matches!(err, RegistryError::AmbiguousCriteria { .. }));

    let none = registry::find_client(&mut db.conn, &ClientFilter::by_first_name("Nobody"))
        .await
        .unwrap();
    assert!(none.is_empty());

    db.close().await;
}

#[tokio::test]
async fn ensure_schema_keeps_data_and_reset_drops_it() {
    let Some(mut db) = TestDb::open("schema_lifecycle").await else { return };

    let id = registry::add_client(&mut db.conn, &ivan()).await.unwrap();

    schema::ensure_schema(&mut db.conn).await.unwrap();
    assert_eq!(registry::get_client(&mut db.conn, id).await.unwrap().client.id, id);

    schema::reset_schema(&mut db.conn).await.unwrap();
    schema::ensure_schema(&mut db.conn).await.unwrap();
    let found = registry::find_client(&mut db.conn, &ClientFilter::by_email("ivanov@mail.ru"))
        .await
        .unwrap();
    assert!(found.is_empty());

    schema::initialize_schema(&mut db.conn).await.unwrap();
    assert_eq!(registry::add_client(&mut db.conn, &petr()).await.unwrap(), 1);

    db.close().await;
}

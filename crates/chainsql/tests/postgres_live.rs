//! Round trips against a real Postgres. Skipped unless `DATABASE_URL` is set.

use chainsql::{Db, DbConfig, Dialect, FilterQb, Value};

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

fn scratch_table() -> String {
    format!("chainsql_live_{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

#[tokio::test]
async fn insert_find_update_delete() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    // The Postgres client supplies the dialect.
    let db = Db::new(client);
    assert_eq!(db.dialect(), Dialect::Postgres);
    let table = scratch_table();

    db.create_table(
        &table,
        &[
            ("id", "bigserial primary key"),
            ("email", "text not null"),
            ("status", "text"),
        ],
    )
    .await
    .unwrap();

    let inserted = db
        .insert_into(&table)
        .unwrap()
        .values([("email", "a@example.com")])
        .unwrap()
        .query()
        .await
        .unwrap();
    assert_eq!(inserted.affected(), 1);
    let id = inserted.last_insert_id().cloned().unwrap();
    assert!(matches!(id, Value::Int(_)));

    let row = db.from(&table).unwrap().find(id.clone()).await.unwrap().unwrap();
    assert_eq!(row.try_get::<String>("email").unwrap(), "a@example.com");
    assert_eq!(row.get("status"), Some(&Value::Null));

    let updated = db
        .update(&table)
        .unwrap()
        .set([("status", "active")])
        .unwrap()
        .where_("id", "=", id.clone())
        .unwrap()
        .query()
        .await
        .unwrap();
    assert_eq!(updated.affected(), 1);

    let rows = db
        .from(&table)
        .unwrap()
        .where_("status", "=", vec!["active", "pending"])
        .unwrap()
        .find_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let deleted = db
        .delete_from(&table)
        .unwrap()
        .where_("id", "=", id)
        .unwrap()
        .query()
        .await
        .unwrap();
    assert_eq!(deleted.affected(), 1);

    db.drop_table(&table).await.unwrap();
}

#[tokio::test]
async fn alter_session_reaches_requested_state() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let db = Db::with_config(client, DbConfig::new().dialect(Dialect::Postgres));
    let table = scratch_table();

    db.create_table(&table, &[("id", "bigserial primary key"), ("email", "text")])
        .await
        .unwrap();
    db.insert_into(&table)
        .unwrap()
        .values([("email", Value::Null)])
        .unwrap()
        .query()
        .await
        .unwrap();

    let mut alter = db.alter(&table).await.unwrap();
    alter
        .add_column("score", "integer")
        .await
        .unwrap()
        .modify_column("email", None)
        .await
        .unwrap()
        .add_not_null(Some("unknown@example.com".into()))
        .await
        .unwrap()
        .add_not_null(None)
        .await
        .unwrap()
        .add_unique()
        .await
        .unwrap()
        .set_default("nobody@example.com")
        .await
        .unwrap()
        .modify_column("score", None)
        .await
        .unwrap()
        .add_unsigned()
        .await
        .unwrap();

    let described = db.describe_table(&table).await.unwrap();
    let email = described.column("email").unwrap();
    assert!(!email.nullable);
    assert!(email.unique);
    assert!(email.default.is_some());
    assert!(described.column("score").unwrap().unsigned);
    assert_eq!(described.primary_key().map(|c| c.name.as_str()), Some("id"));

    let row = db.from(&table).unwrap().row().await.unwrap().unwrap();
    assert_eq!(row.try_get::<String>("email").unwrap(), "unknown@example.com");

    db.drop_table(&table).await.unwrap();
}

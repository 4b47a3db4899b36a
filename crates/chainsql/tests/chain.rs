//! Public API tests against a scripted in-memory client.

use std::sync::Mutex;

use chainsql::{
    Bindings, Db, DbConfig, Dialect, Executed, Fetched, FilterQb, GenericClient, MutationOutcome,
    OrmError, OrmResult, Record, SqlQb, StatementKind, TableDescription, Value,
};

/// Answers every read with the same rows and logs what it ran.
struct StubClient {
    rows: Vec<Record>,
    log: Mutex<Vec<String>>,
}

impl StubClient {
    fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            log: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl GenericClient for StubClient {
    async fn fetch(&self, sql: &str, _bindings: &Bindings) -> OrmResult<Vec<Record>> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, _bindings: &Bindings) -> OrmResult<u64> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(2)
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        Err(OrmError::usage(format!("table '{table}' does not exist")))
    }
}

fn user(id: i64, email: &str) -> Record {
    Record::new().with("id", id).with("email", email)
}

#[tokio::test]
async fn test_run_dispatches_on_statement_kind() {
    let client = StubClient::new(vec![user(1, "a@b.c")]);
    let empty = Bindings::new();

    match client.run("SELECT * FROM users", &empty).await.unwrap() {
        Executed::Rows(rows) => assert_eq!(rows.len(), 1),
        other => panic!("expected rows, got {other:?}"),
    }
    assert_eq!(
        client.run("  show tables", &empty).await.unwrap(),
        Executed::Rows(vec![user(1, "a@b.c")])
    );
    assert_eq!(
        client.run("DELETE FROM users", &empty).await.unwrap(),
        Executed::Affected(2)
    );
    assert_eq!(StatementKind::detect("delete from users"), StatementKind::Delete);
}

#[tokio::test]
async fn test_borrowed_client_runs_chains() {
    let client = StubClient::new(vec![user(3, "x@a.com")]);
    let db = Db::new(&client);

    let fetched = db
        .from("users")
        .unwrap()
        .where_("email", "=", vec!["x@a.com", "y@b.com"])
        .unwrap()
        .find_all()
        .await
        .unwrap();
    assert_eq!(fetched, Fetched::Many(vec![user(3, "x@a.com")]));

    let found = db.from("users").unwrap().find(3).await.unwrap();
    assert_eq!(found.unwrap().try_get::<i64>("id").unwrap(), 3);

    assert_eq!(
        client.log(),
        [
            "SELECT * FROM users WHERE (email = :usersandemailxacom OR email = :usersandemailybcom)",
            "SELECT * FROM users WHERE id = :usersandid LIMIT 1",
        ]
    );
}

#[tokio::test]
async fn test_prefixed_mutations() {
    let client = StubClient::new(Vec::new());
    let db = Db::with_config(&client, DbConfig::new().table_prefix("app_"));

    let updated = db
        .update("users")
        .unwrap()
        .set([("status", "inactive")])
        .unwrap()
        .where_("last_seen", "<", "2024-01-01")
        .unwrap()
        .query()
        .await
        .unwrap();
    assert_eq!(updated, MutationOutcome::Affected(2));

    let inserted = db
        .insert_into("users")
        .unwrap()
        .values([("email", Value::from("new@example.com")), ("bio", Value::Null)])
        .unwrap()
        .query()
        .await
        .unwrap();
    assert_eq!(inserted.affected(), 2);
    assert_eq!(inserted.last_insert_id(), None);

    assert_eq!(
        client.log(),
        [
            "UPDATE app_users SET status = :status WHERE last_seen < :appusersandlastseen",
            "INSERT INTO app_users (email, bio) VALUES (:email, :bio)",
        ]
    );
}

#[test]
fn test_postgres_limit_and_aggregate() {
    let client = StubClient::new(Vec::new());
    let db = Db::with_config(&client, DbConfig::new().dialect(Dialect::Postgres));

    let mut qb = db.select("author_id").from("posts").unwrap();
    qb.group_concat("title", "titles")
        .unwrap()
        .group_by("author_id")
        .unwrap()
        .limit(20, Some(10));

    assert_eq!(
        qb.to_sql().unwrap(),
        "SELECT author_id, string_agg((title)::text, ',') AS titles FROM posts \
         GROUP BY author_id LIMIT 10 OFFSET 20"
    );
}

#[test]
fn test_invalid_input_is_a_usage_error() {
    let client = StubClient::new(Vec::new());
    let db = Db::new(&client);

    assert!(matches!(db.from("users; drop"), Err(e) if e.is_usage()));

    let mut qb = db.from("users").unwrap();
    assert!(matches!(qb.where_("id", "~", 1), Err(e) if e.is_usage()));
    assert!(matches!(qb.where_("id", "IS", 1), Err(e) if e.is_usage()));
    assert!(client.log().is_empty());
}

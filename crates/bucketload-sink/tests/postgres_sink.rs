//! Requires Docker; run with `cargo test -p bucketload-sink -- --ignored`.

use bucketload_sink::{ConnectionConfig, PostgresSink, Sink};
use bucketload_types::InsertTarget;
use postgres::NoTls;
use serde_json::{json, Value};
use testcontainers::clients;
use testcontainers::core::WaitFor;
use testcontainers::GenericImage;

const DDL: &str = "
CREATE SCHEMA IF NOT EXISTS dbo;
CREATE TABLE dbo.encounters (
    patient_id TEXT NOT NULL,
    encounter_date DATE NOT NULL,
    claim_amount NUMERIC(12, 2),
    status_code INT
);";

fn postgres_image() -> GenericImage {
    GenericImage::new("postgres", "16-alpine")
        .with_env_var("POSTGRES_USER", "postgres")
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "claims")
        .with_exposed_port(5432)
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
}

fn target() -> InsertTarget {
    InsertTarget::new(
        "dbo.encounters",
        vec![
            "patient_id".into(),
            "encounter_date".into(),
            "claim_amount".into(),
            "status_code".into(),
        ],
    )
    .unwrap()
}

#[test]
#[ignore = "requires docker"]
fn inserts_batches_and_rolls_back_failures() {
    let docker = clients::Cli::default();
    let node = docker.run(postgres_image());
    let port = node.get_host_port_ipv4(5432);

    let config = ConnectionConfig {
        server: format!("127.0.0.1:{port}"),
        database: "claims".into(),
        user: Some("postgres".into()),
        password: Some("postgres".into()),
    };
    let mut admin = config.pg_config().unwrap().connect(NoTls).unwrap();
    admin.batch_execute(DDL).unwrap();

    let mut sink = PostgresSink::connect(&config).unwrap();
    sink.ping().unwrap();

    // CSV-style string values are coerced to DATE / NUMERIC / INT.
    let rows = vec![
        vec![json!("P1"), json!("2025-08-01"), json!("10.50"), json!("200")],
        vec![json!("P2"), json!("2025-08-02"), json!(7), Value::Null],
    ];
    assert_eq!(sink.insert_batch(&target(), &rows).unwrap(), 2);

    let bad = vec![
        vec![json!("P3"), json!("2025-08-03"), Value::Null, Value::Null],
        vec![Value::Null, json!("2025-08-04"), Value::Null, Value::Null],
    ];
    assert!(sink.insert_batch(&target(), &bad).is_err());

    let count: i64 = admin
        .query_one("SELECT COUNT(*) FROM dbo.encounters", &[])
        .unwrap()
        .get(0);
    assert_eq!(count, 2);

    let amount: String = admin
        .query_one(
            "SELECT claim_amount::text FROM dbo.encounters WHERE patient_id = 'P1'",
            &[],
        )
        .unwrap()
        .get(0);
    assert_eq!(amount, "10.50");
}

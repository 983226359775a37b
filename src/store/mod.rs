//! SQLite persistence.
//!
//! Each capture or telemetry file is written in one immediate transaction.
//! Rows are inserted under their own savepoint so a rejected row is rolled
//! back on its own and the rest of the file still commits. Only a failure
//! to begin or commit the transaction is fatal.

mod pool;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

pub use pool::{ConnectionPool, PooledConnection};

use crate::error::{Result, StoreError};
use crate::record::{
    BulkTrafficRecord, CaptureBatch, CaptureRecord, NodeSummary, RoutingUpdateRecord, RunId, TelemetryBatch,
    TelemetryRow,
};
use crate::time::epoch_seconds;

/// Rows written and rejected in one committed transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub rows_written: usize,
    pub rows_failed: usize,
}

impl CommitReport {
    fn record(&mut self, table: &'static str, result: rusqlite::Result<()>) {
        match result {
            Ok(()) => self.rows_written += 1,
            Err(source) => {
                let err = StoreError::Insert { table, source };
                warn!(error = %err, "row rejected");
                self.rows_failed += 1;
            }
        }
    }
}

/// Shared handle to the reduction database.
#[derive(Clone)]
pub struct SqliteStore {
    path: PathBuf,
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and its schema.
    pub fn open(path: impl AsRef<Path>, max_connections: usize, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let pool = ConnectionPool::open(&path, max_connections, busy_timeout)?;

        let conn = pool::open_connection(&path, busy_timeout)?;
        conn.execute_batch(schema::SCHEMA).map_err(StoreError::Schema)?;
        debug!(path = %path.display(), max_connections, "store opened");

        Ok(Self { path, pool })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert the run row and return its id.
    pub async fn register_run(&self, description: &str, date: &str) -> Result<RunId> {
        let conn = self.pool.acquire().await?;
        let description = description.to_string();
        let date = date.to_string();

        let run_id = tokio::task::spawn_blocking(move || insert_run(&conn, &description, &date)).await??;
        Ok(run_id)
    }

    /// Write one capture file's records in a single transaction.
    pub async fn commit_capture(&self, batch: CaptureBatch) -> Result<CommitReport> {
        let mut conn = self.pool.acquire().await?;
        let report = tokio::task::spawn_blocking(move || write_capture(&mut conn, &batch)).await??;
        Ok(report)
    }

    /// Write one telemetry log's rows in a single transaction.
    pub async fn commit_telemetry(&self, batch: TelemetryBatch) -> Result<CommitReport> {
        let mut conn = self.pool.acquire().await?;
        let report = tokio::task::spawn_blocking(move || write_telemetry(&mut conn, &batch)).await??;
        Ok(report)
    }

    /// Wait for in-flight transactions, then close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Insert a run row.
pub fn insert_run(conn: &Connection, description: &str, date: &str) -> std::result::Result<RunId, StoreError> {
    conn.execute(schema::INSERT_TESTCASE, params![description, date])
        .map_err(|source| StoreError::Insert {
            table: "tbl_testcase",
            source,
        })?;
    let id = conn.last_insert_rowid();
    RunId::new(id).ok_or(StoreError::InvalidRunId { id })
}

/// Write a capture batch: the node summary plus every record.
pub fn write_capture(conn: &mut Connection, batch: &CaptureBatch) -> std::result::Result<CommitReport, StoreError> {
    let mut tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::Begin)?;
    let mut report = CommitReport::default();

    let result = isolated(&mut tx, |conn| insert_summary(conn, &batch.summary));
    report.record("tbl_node_status", result);

    for record in &batch.records {
        match record {
            CaptureRecord::Bulk(r) => {
                let result = isolated(&mut tx, |conn| insert_bulk(conn, r));
                report.record("tbl_packet_cap_test", result);
            }
            CaptureRecord::Routing(r) => {
                let result = isolated(&mut tx, |conn| insert_routing(conn, r));
                report.record("tbl_rip", result);
            }
        }
    }

    tx.commit().map_err(StoreError::Commit)?;
    Ok(report)
}

/// Write a telemetry batch.
pub fn write_telemetry(conn: &mut Connection, batch: &TelemetryBatch) -> std::result::Result<CommitReport, StoreError> {
    let mut tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::Begin)?;
    let mut report = CommitReport::default();
    let run_id = batch.run_id;

    for row in &batch.rows {
        let (table, result) = match row {
            TelemetryRow::Neighbor(n) => (
                "tbl_neighbor",
                isolated(&mut tx, |conn| {
                    conn.execute(
                        schema::INSERT_NEIGHBOR,
                        params![
                            run_id,
                            n.resp_time.map(epoch_seconds),
                            n.node,
                            n.island,
                            n.adjacency,
                            n.cost,
                            n.neighbor_node
                        ],
                    )
                }),
            ),
            TelemetryRow::Forward(f) => (
                "tbl_forward",
                isolated(&mut tx, |conn| {
                    conn.execute(
                        schema::INSERT_FORWARD,
                        params![
                            run_id,
                            f.resp_time.map(epoch_seconds),
                            f.node,
                            f.forward_node,
                            f.forward_hop,
                            f.cost
                        ],
                    )
                }),
            ),
            TelemetryRow::Battery(b) => (
                "tbl_battery",
                isolated(&mut tx, |conn| {
                    conn.execute(
                        schema::INSERT_BATTERY,
                        params![run_id, b.resp_time.map(epoch_seconds), b.level, b.node_id],
                    )
                }),
            ),
            TelemetryRow::Position(p) => (
                "tbl_positioninfo",
                isolated(&mut tx, |conn| {
                    conn.execute(
                        schema::INSERT_POSITION,
                        params![
                            run_id,
                            p.resp_time.map(epoch_seconds),
                            p.node_id,
                            p.latitude,
                            p.longitude
                        ],
                    )
                }),
            ),
        };
        report.record(table, result);
    }

    tx.commit().map_err(StoreError::Commit)?;
    Ok(report)
}

/// Run one insert under its own savepoint; on failure only that insert is
/// rolled back.
fn isolated<F>(tx: &mut Transaction<'_>, insert: F) -> rusqlite::Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<usize>,
{
    let sp = tx.savepoint()?;
    insert(&*sp)?;
    sp.commit()
}

fn insert_summary(conn: &Connection, summary: &NodeSummary) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_NODE_STATUS,
        params![
            summary.run_id,
            summary.node_id,
            // Whole seconds, unlike the per-frame times
            summary.start.map(|ts| ts.timestamp()),
            summary.end.map(|ts| ts.timestamp()),
            summary.discovery_address.map(|a| a.to_string()),
        ],
    )
}

fn insert_bulk(conn: &Connection, r: &BulkTrafficRecord) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_PACKET,
        params![
            r.run_id,
            r.node_id,
            r.file_name,
            r.source.to_string(),
            r.destination.to_string(),
            r.destination_port,
            epoch_seconds(r.timestamp),
            r.capture_length,
            r.sequence_id,
            r.outbound,
            r.fingerprint,
        ],
    )
}

fn insert_routing(conn: &Connection, r: &RoutingUpdateRecord) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_RIP,
        params![
            r.run_id,
            r.source.map(|a| a.to_string()),
            r.address.to_string(),
            r.metric,
            r.netmask.to_string(),
            r.next_hop.to_string(),
            epoch_seconds(r.observed),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BatteryRow, ForwardRow, NeighborRow, PositionRow};
    use chrono::DateTime;
    use std::net::Ipv4Addr;

    fn open(dir: &tempfile::TempDir) -> Connection {
        let conn = pool::open_connection(&dir.path().join("store.sqlite"), Duration::from_secs(1)).unwrap();
        conn.execute_batch(schema::SCHEMA).unwrap();
        conn
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    fn batch(run_id: RunId) -> CaptureBatch {
        let ts = DateTime::from_timestamp(1_672_531_200, 500_000_000).unwrap();
        CaptureBatch {
            summary: NodeSummary {
                run_id,
                node_id: 7,
                start: Some(ts),
                end: Some(ts),
                discovery_address: Some(Ipv4Addr::new(192, 168, 7, 1)),
            },
            records: vec![
                CaptureRecord::Bulk(BulkTrafficRecord {
                    run_id,
                    node_id: 7,
                    file_name: "ultra7-1.pcap".into(),
                    source: Ipv4Addr::new(192, 168, 7, 10),
                    destination: Ipv4Addr::new(192, 168, 1, 20),
                    destination_port: 6000,
                    sequence_id: 0x1234,
                    capture_length: 44,
                    timestamp: ts,
                    outbound: true,
                    fingerprint: "00ff".into(),
                }),
                CaptureRecord::Routing(RoutingUpdateRecord {
                    run_id,
                    source: Some(Ipv4Addr::new(192, 168, 7, 1)),
                    address: Ipv4Addr::new(10, 0, 1, 0),
                    netmask: Ipv4Addr::new(255, 255, 255, 0),
                    next_hop: Ipv4Addr::UNSPECIFIED,
                    metric: 1,
                    observed: ts,
                }),
                CaptureRecord::Routing(RoutingUpdateRecord {
                    run_id,
                    source: Some(Ipv4Addr::new(192, 168, 7, 1)),
                    address: Ipv4Addr::new(10, 0, 2, 0),
                    netmask: Ipv4Addr::new(255, 255, 255, 0),
                    next_hop: Ipv4Addr::UNSPECIFIED,
                    metric: 99,
                    observed: ts,
                }),
            ],
        }
    }

    #[test]
    fn test_register_run_assigns_ids() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(&dir);
        let first = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();
        let second = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();
        assert!(first.get() > 0);
        assert_ne!(first, second);
    }

    #[test]
    fn test_write_capture() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir);
        let run_id = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();

        let report = write_capture(&mut conn, &batch(run_id)).unwrap();
        assert_eq!(report, CommitReport { rows_written: 4, rows_failed: 0 });
        assert_eq!(count(&conn, "tbl_node_status"), 1);
        assert_eq!(count(&conn, "tbl_packet_cap_test"), 1);
        assert_eq!(count(&conn, "tbl_rip"), 2);

        let (time, tx, hash): (f64, bool, String) = conn
            .query_row("SELECT Time, TX, Hash FROM tbl_packet_cap_test", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!(time, 1_672_531_200.5);
        assert!(tx);
        assert_eq!(hash, "00ff");
    }

    #[test]
    fn test_summary_times_are_whole_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir);
        let run_id = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();
        let mut batch = batch(run_id);
        batch.summary.end = DateTime::from_timestamp(1_672_531_201, 999_999_000);

        write_capture(&mut conn, &batch).unwrap();

        let (start, end): (i64, i64) = conn
            .query_row("SELECT Start_Time, End_Time FROM tbl_node_status", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(start, 1_672_531_200);
        assert_eq!(end, 1_672_531_201);
    }

    #[test]
    fn test_rejected_row_does_not_abort_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir);
        conn.execute_batch(
            "CREATE TRIGGER reject_metric BEFORE INSERT ON tbl_rip WHEN NEW.RIP_Metric = 99
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        let run_id = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();

        let report = write_capture(&mut conn, &batch(run_id)).unwrap();
        assert_eq!(report, CommitReport { rows_written: 3, rows_failed: 1 });
        assert_eq!(count(&conn, "tbl_rip"), 1);
        assert_eq!(count(&conn, "tbl_packet_cap_test"), 1);
    }

    #[test]
    fn test_commit_failure_leaves_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir);
        conn.execute_batch(
            "CREATE TABLE audit_parent (id INTEGER PRIMARY KEY);
             CREATE TABLE audit_child (
                 parent INTEGER REFERENCES audit_parent(id) DEFERRABLE INITIALLY DEFERRED
             );
             CREATE TRIGGER audit_summary AFTER INSERT ON tbl_node_status
             BEGIN INSERT INTO audit_child (parent) VALUES (999); END;",
        )
        .unwrap();
        let run_id = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();

        let err = write_capture(&mut conn, &batch(run_id)).unwrap_err();
        assert!(matches!(err, StoreError::Commit(_)));
        assert!(err.is_fatal());
        assert!(conn.is_autocommit());

        for table in ["tbl_node_status", "tbl_packet_cap_test", "tbl_rip", "audit_child"] {
            assert_eq!(count(&conn, table), 0, "{table}");
        }
    }

    #[test]
    fn test_unknown_run_rejects_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir);

        let report = write_capture(&mut conn, &batch(RunId::new(42).unwrap())).unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.rows_failed, 4);
    }

    #[test]
    fn test_write_telemetry() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir);
        let run_id = insert_run(&conn, "run1", "2023-01-01T00:00:00Z").unwrap();
        let ts = DateTime::from_timestamp(1_672_531_201, 0);

        let batch = TelemetryBatch {
            run_id,
            rows: vec![
                TelemetryRow::Neighbor(NeighborRow {
                    resp_time: ts,
                    node: "7".into(),
                    island: 1,
                    adjacency: "up".into(),
                    cost: 3,
                    neighbor_node: 4,
                }),
                TelemetryRow::Forward(ForwardRow {
                    resp_time: ts,
                    node: "7".into(),
                    forward_node: "9".into(),
                    forward_hop: 4,
                    cost: "2".into(),
                }),
                TelemetryRow::Battery(BatteryRow {
                    resp_time: None,
                    level: "87".into(),
                    node_id: 7,
                }),
                TelemetryRow::Position(PositionRow {
                    resp_time: ts,
                    node_id: 7,
                    latitude: "51.5".into(),
                    longitude: "-0.12".into(),
                }),
            ],
        };

        let report = write_telemetry(&mut conn, &batch).unwrap();
        assert_eq!(report.rows_written, 4);

        let (req, resp): (f64, f64) = conn
            .query_row("SELECT Req_Time, Resp_Time FROM tbl_neighbor", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(req, 0.0);
        assert_eq!(resp, 1_672_531_201.0);

        let battery_time: Option<f64> = conn
            .query_row("SELECT Resp_Time FROM tbl_battery", [], |row| row.get(0))
            .unwrap();
        assert_eq!(battery_time, None);
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("store.sqlite"), 4, Duration::from_secs(5)).unwrap();

        let run_id = store.register_run("run1", "2023-01-01T00:00:00Z").await.unwrap();
        let report = store.commit_capture(batch(run_id)).await.unwrap();
        assert_eq!(report.rows_written, 4);
        store.close().await;

        let conn = Connection::open(dir.path().join("store.sqlite")).unwrap();
        assert_eq!(count(&conn, "tbl_rip"), 2);
    }
}

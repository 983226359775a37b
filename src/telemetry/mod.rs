//! Telemetry log reduction.
//!
//! Telemetry logs hold one JSON sample per line, recorded by a node's
//! management agent. Each sample yields neighbour and forwarding rows for
//! every radio channel plus one battery and one position row.

pub mod model;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use model::TelemetrySample;

use crate::error::{Error, Result};
use crate::job::{JobContext, JobReport};
use crate::node::NodeIdentity;
use crate::record::{BatteryRow, ForwardRow, NeighborRow, PositionRow, TelemetryBatch, TelemetryRow};
use crate::time;

/// Rows for one sample.
pub fn sample_rows(sample: &TelemetrySample, node: NodeIdentity) -> Vec<TelemetryRow> {
    let mut rows = Vec::new();

    for channel in &sample.channels {
        let resp_time = time::parse(&channel.rssi.resp_time);
        for nbr in &channel.nbrs {
            rows.extend(nbr.hops.iter().map(|hop| {
                TelemetryRow::Forward(ForwardRow {
                    resp_time,
                    node: channel.node.clone(),
                    forward_node: hop.node.clone(),
                    forward_hop: nbr.node,
                    cost: hop.cost.clone(),
                })
            }));
            rows.push(TelemetryRow::Neighbor(NeighborRow {
                resp_time,
                node: channel.node.clone(),
                island: nbr.island,
                adjacency: nbr.adj.clone(),
                cost: nbr.cost,
                neighbor_node: nbr.node,
            }));
        }
    }

    rows.push(TelemetryRow::Battery(BatteryRow {
        resp_time: time::parse(&sample.battery.resp_time),
        level: sample.battery.life.clone(),
        node_id: node.node_id,
    }));
    rows.push(TelemetryRow::Position(PositionRow {
        resp_time: time::parse(&sample.gps.resp_time),
        node_id: node.node_id,
        latitude: sample.gps.latitude.clone(),
        longitude: sample.gps.longitude.clone(),
    }));

    rows
}

/// Read every line of a log into rows, skipping lines that do not parse.
pub fn read_log(path: &Path, node: NodeIdentity) -> Result<Vec<TelemetryRow>> {
    let file = File::open(path).map_err(|source| Error::Telemetry {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(file = %path.display(), line = index + 1, error = %e, "stopping at unreadable line");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match TelemetrySample::from_line(&line) {
            Ok(sample) => rows.extend(sample_rows(&sample, node)),
            Err(e) => debug!(file = %path.display(), line = index + 1, error = %e, "skipping sample"),
        }
    }
    Ok(rows)
}

/// Reduces one telemetry log in a single transaction.
pub struct TelemetryJob {
    path: PathBuf,
    ctx: Arc<JobContext>,
}

impl TelemetryJob {
    pub fn new(path: impl Into<PathBuf>, ctx: Arc<JobContext>) -> Self {
        Self { path: path.into(), ctx }
    }

    pub async fn run(self) -> Result<JobReport> {
        let node = NodeIdentity::from_telemetry_path(&self.path, &self.ctx.config.node_prefix)?;

        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || read_log(&path, node)).await??;
        let records = rows.len();

        let commit = self
            .ctx
            .store
            .commit_telemetry(TelemetryBatch {
                run_id: self.ctx.run_id,
                rows,
            })
            .await?;

        info!(
            file = %self.path.display(),
            records,
            written = commit.rows_written,
            failed = commit.rows_failed,
            "telemetry reduced"
        );

        Ok(JobReport {
            path: self.path,
            node_id: node.node_id,
            records,
            rows_written: commit.rows_written,
            rows_failed: commit.rows_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINE: &str = r#"{"battery":{"respTime":"2023-01-01 00:00:01.000000","life":"87"},"gps":{"respTime":"2023-01-01 00:00:02.000000","latitude":"51.5","longitude":"-0.12"},"channels":[{"node":"7","rssi":{"respTime":"2023-01-01 00:00:03.000000","rssi":"-60"},"nbrs":[{"node":4,"cost":3,"adj":"up","island":1,"hops":[{"node":"9","cost":"2"},{"node":"11","cost":"5"}]},{"node":5,"cost":1,"adj":"up","island":1,"hops":[]}]}]}"#;

    #[test]
    fn test_sample_rows() {
        let sample = TelemetrySample::from_line(LINE).unwrap();
        let rows = sample_rows(&sample, NodeIdentity::new(7));

        let forwards: Vec<_> = rows
            .iter()
            .filter_map(|r| match r {
                TelemetryRow::Forward(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(forwards.len(), 2);
        assert_eq!(forwards[0].forward_node, "9");
        assert_eq!(forwards[0].forward_hop, 4);
        assert_eq!(forwards[1].cost, "5");

        let neighbors = rows.iter().filter(|r| matches!(r, TelemetryRow::Neighbor(_))).count();
        assert_eq!(neighbors, 2);

        match rows.last().unwrap() {
            TelemetryRow::Position(p) => {
                assert_eq!(p.node_id, 7);
                assert_eq!(p.resp_time.unwrap().timestamp(), 1_672_531_202);
            }
            other => panic!("expected position row, got {other:?}"),
        }
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn test_unparsable_time_is_none() {
        let sample = TelemetrySample::from_line(r#"{"battery":{"respTime":"soon","life":"10"}}"#).unwrap();
        let rows = sample_rows(&sample, NodeIdentity::new(3));
        match &rows[0] {
            TelemetryRow::Battery(b) => assert!(b.resp_time.is_none()),
            other => panic!("expected battery row, got {other:?}"),
        }
    }

    #[test]
    fn test_read_log_skips_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{LINE}").unwrap();
        writeln!(file, "{{ truncated").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{LINE}").unwrap();
        file.flush().unwrap();

        let rows = read_log(file.path(), NodeIdentity::new(7)).unwrap();
        assert_eq!(rows.len(), 12);
    }

    #[test]
    fn test_read_log_missing_file() {
        let err = read_log(Path::new("/nonexistent/ultra7_HMS_SNMP.json"), NodeIdentity::new(7)).unwrap_err();
        assert!(matches!(err, Error::Telemetry { .. }));
        assert!(!err.is_fatal());
    }
}

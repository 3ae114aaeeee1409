//! Query Log Tests
//!
//! Validates the line-oriented JSON format, field ordering, optional error
//! field handling, and the flush-on-shutdown guarantee.

#[cfg(test)]
mod tests {
    use crate::logging::{now_ms, QueryLog, QueryRecord};
    use tempfile::TempDir;

    fn sample_record(query_len: usize, matched: bool) -> QueryRecord {
        QueryRecord {
            ts: now_ms(),
            peer: "127.0.0.1:50000".to_string(),
            mode: "preloaded".to_string(),
            algorithm: "hash".to_string(),
            query_len,
            matched,
            elapsed_ns: 1_234,
            queue_depth: 0,
            err_kind: None,
        }
    }

    // ============================================================
    // TEST 1: one JSON object per line, parseable
    // ============================================================

    #[tokio::test]
    async fn test_records_written_one_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.log");

        let (log, writer) = QueryLog::open(&path).await.unwrap();
        log.record(sample_record(4, true)).await;
        log.record(sample_record(7, false)).await;
        drop(log);
        writer.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: QueryRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.query_len, 4);
        assert!(first.matched);

        let second: QueryRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.query_len, 7);
        assert!(!second.matched);
    }

    // ============================================================
    // TEST 2: deterministic field order
    // ============================================================

    #[tokio::test]
    async fn test_field_order_is_declaration_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.log");

        let (log, writer) = QueryLog::open(&path).await.unwrap();
        log.record(sample_record(4, true)).await;
        drop(log);
        writer.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let line = contents.lines().next().unwrap();

        let ts_pos = line.find("\"ts\"").unwrap();
        let peer_pos = line.find("\"peer\"").unwrap();
        let mode_pos = line.find("\"mode\"").unwrap();
        let matched_pos = line.find("\"matched\"").unwrap();
        let queue_pos = line.find("\"queue_depth\"").unwrap();
        assert!(ts_pos < peer_pos && peer_pos < mode_pos);
        assert!(mode_pos < matched_pos && matched_pos < queue_pos);
    }

    // ============================================================
    // TEST 3: err_kind omitted when absent
    // ============================================================

    #[tokio::test]
    async fn test_err_kind_only_present_on_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.log");

        let (log, writer) = QueryLog::open(&path).await.unwrap();
        log.record(sample_record(4, true)).await;

        let mut failed = sample_record(4, false);
        failed.err_kind = Some("worker_panic".to_string());
        log.record(failed).await;

        drop(log);
        writer.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(!lines[0].contains("err_kind"));
        assert!(lines[1].contains("\"err_kind\":\"worker_panic\""));
    }

    // ============================================================
    // TEST 4: many records survive, in order
    // ============================================================

    #[tokio::test]
    async fn test_no_records_lost_under_burst() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.log");

        let (log, writer) = QueryLog::open(&path).await.unwrap();
        for i in 0..2_000 {
            log.record(sample_record(i, i % 2 == 0)).await;
        }
        drop(log);
        writer.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2_000);

        // Emission order is preserved end to end.
        for (i, line) in lines.iter().enumerate() {
            let record: QueryRecord = serde_json::from_str(line).unwrap();
            assert_eq!(record.query_len, i);
        }
    }

    // ============================================================
    // TEST 5: log directory is created on demand
    // ============================================================

    #[tokio::test]
    async fn test_parent_directory_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("nested").join("queries.log");

        let (log, writer) = QueryLog::open(&path).await.unwrap();
        log.record(sample_record(1, false)).await;
        drop(log);
        writer.shutdown().await;

        assert!(path.exists());
    }
}

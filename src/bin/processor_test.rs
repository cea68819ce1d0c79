use async_trait::async_trait;
use rpa_dashboard::loader::ingest;
use rpa_dashboard::{
    BackendError, ProcessingRun, ReportRow, RowId, RowStatus, StatusBackend, StatusProcessor,
    StatusStore,
};
use std::sync::Arc;

// Backend stand-in: fails ids divisible by `fail_every`, completes the rest
struct LocalBackend {
    store: Arc<StatusStore>,
    fail_every: RowId,
}

#[async_trait]
impl StatusBackend for LocalBackend {
    async fn update_status(&self, id: RowId, status: RowStatus) -> Result<ReportRow, BackendError> {
        let row = self.store.get(id).ok_or(BackendError::Api {
            status: 404,
            message: format!("row {} not found", id),
        })?;

        // Only the row being handled may be Processing
        assert_eq!(self.store.summary().processing, 1);
        assert_eq!(row.status, RowStatus::Processing);

        if id % self.fail_every == 0 {
            return Err(BackendError::Api {
                status: 500,
                message: "robot offline".to_string(),
            });
        }
        Ok(ReportRow {
            status,
            time: "0.10s".to_string(),
            ..row
        })
    }
}

async fn test_csv_batch() {
    println!("\n====== Testing CSV batch processing ======");
    let csv = "ID,Name,Email,Company\n1,Ada,ada@example.com,Acme\n2,Bob,bob@example.com,Initech\n3,Cy,cy@example.com,Globex\n";
    let rows = ingest("batch.csv", Some("text/csv"), csv.as_bytes()).unwrap();
    assert_eq!(rows.len(), 3);
    println!("✓ Ingested {} rows", rows.len());

    let store = Arc::new(StatusStore::new());
    let generation = store.replace_all(rows, None).unwrap();
    let backend = Arc::new(LocalBackend {
        store: store.clone(),
        fail_every: 2,
    });
    let processor = StatusProcessor::new(backend);
    let run = ProcessingRun::new(generation);

    let report = run.start(&processor, &store).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    println!(
        "✓ Run finished: {} succeeded, {} failed",
        report.succeeded, report.failed
    );

    assert_eq!(store.get(1).unwrap().status, RowStatus::Completed);
    assert_eq!(store.get(2).unwrap().status, RowStatus::Error);
    assert_eq!(store.get(3).unwrap().status, RowStatus::Completed);
    println!("✓ Row 2 marked Error, rows 1 and 3 Completed");

    assert!(run.start(&processor, &store).await.is_none());
    println!("✓ Second start of the same run ignored");

    let summary = store.summary();
    assert_eq!(
        summary.pending + summary.processing + summary.completed + summary.errors,
        summary.total
    );
    println!("✓ Summary: {:?}", summary);
}

fn test_rejected_upload() {
    println!("\n====== Testing rejected upload ======");
    let result = ingest("notes.txt", Some("text/plain"), b"id\n1\n");
    assert!(result.is_err());
    println!("✓ .txt refused: {}", result.unwrap_err());
}

#[tokio::main]
async fn main() {
    test_csv_batch().await;
    test_rejected_upload();
    println!("\nAll processor tests passed");
}

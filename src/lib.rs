/*!
# RPA Dashboard

A login-gated web dashboard for triggering and monitoring RPA (robotic process
automation) business workflows, built in Rust.

## Overview

Each workflow (COGSA/SAFTA, EDOC upload, FCR submission, e-invoicing, EXP
download, EXP duplication, REX issuance) has a page of its own. A user signs in,
uploads a spreadsheet of work items to a workflow page, and watches the status
table as each row is pushed through the remote RPA status service and moves
from `Pending` to `Completed` or `Error`.

## Architecture

### Ingestion
- **Spreadsheet Ingestor** - Accepts `.xlsx`, `.xls` and `.csv` uploads, reads
  the first sheet and maps its columns onto report rows

### Processing
- **Status Store** - Ordered in-memory row table per workflow page, updated by
  row id and observable through a revision channel
- **Status Backend** - `PUT /api/v1/rpa/{id}/status/{status}` against the RPA
  service
- **Sequential Status Processor** - Drives every pending row through exactly one
  status-update call, one row at a time

### Web Layer
- **Technologies**: Rust, axum, handlebars
- **Key Components**:
  - Auth Gate - One session token, persisted to disk, checked by a middleware
  - Pages - Login, dashboard and one page per workflow with upload form,
    summary counts and status table
  - Export - Current table as CSV or XLSX

## Modules

- **report**: Row, status and summary types
- **loader**: Spreadsheet ingestion
- **store**: Per-page row table
- **backend**: Remote status-update client
- **processor**: Processing runs over pending rows
- **auth**: Session token gate
- **workflow**: The set of workflow pages
- **downloader**: CSV/XLSX export
- **app**, **login**, **view**, **config**: Web server (feature `web`)

## REST API Endpoints

- `/api/{workflow}/rows` - Current rows and summary as JSON
- `/api/{workflow}/records` - Every parsed column of the current upload
- `/api/{workflow}/export.csv`, `/api/{workflow}/export.xlsx` - Report download
- `/{workflow}/upload` - Multipart spreadsheet upload
- `/{workflow}/clear` - Drop the current upload ("Upload New File")
*/

pub mod auth;
pub mod backend;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod processor;
pub mod report;
pub mod store;
pub mod workflow;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod view;

pub use auth::AuthGate;
pub use backend::{HttpStatusBackend, StatusBackend};
pub use error::{AuthError, BackendError, IngestError, StoreError};
pub use processor::{ProcessingRun, RunReport, StatusProcessor};
pub use report::{ReportRow, RowId, RowStatus, Summary, UploadInfo};
pub use store::StatusStore;
pub use workflow::Workflow;

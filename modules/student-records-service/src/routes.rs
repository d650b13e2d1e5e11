//! Axum route handlers for the student records RPC API and downloads.

use crate::export;
use crate::store::RecordStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use std::time::Instant;
use student_records_types::*;

pub struct AppState {
    pub store: Arc<RecordStore>,
    pub start_time: Instant,
}

// =====================================================
// Record Endpoints
// =====================================================

// POST /rpc/records/submit
pub async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordSubmission>, JsonRejection>,
) -> (StatusCode, Json<RpcResponse<Record>>) {
    let submission = match payload {
        Ok(Json(s)) => s,
        Err(rejection) => {
            log::warn!("Rejected submission: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(RpcResponse::err(rejection.body_text())),
            );
        }
    };

    match state.store.append(submission) {
        Ok(record) => (
            StatusCode::OK,
            Json(RpcResponse::ok_with_message(record, "Data saved successfully")),
        ),
        Err(e) if e.is_client_error() => {
            log::warn!("Rejected submission: {}", e);
            (StatusCode::BAD_REQUEST, Json(RpcResponse::err(e.to_string())))
        }
        Err(e) => {
            log::error!("Failed to store submission: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RpcResponse::err(e.to_string())),
            )
        }
    }
}

// GET /rpc/records/count
pub async fn count(State(state): State<Arc<AppState>>) -> (StatusCode, Json<RpcResponse<RecordCount>>) {
    let count = state.store.count();
    (StatusCode::OK, Json(RpcResponse::ok(RecordCount { count })))
}

// GET /rpc/records/all
pub async fn list_all(State(state): State<Arc<AppState>>) -> (StatusCode, Json<RpcResponse<Vec<Record>>>) {
    (StatusCode::OK, Json(RpcResponse::ok(state.store.load())))
}

// POST /rpc/records/clear
pub async fn clear(State(state): State<Arc<AppState>>) -> (StatusCode, Json<RpcResponse<bool>>) {
    match state.store.clear() {
        Ok(()) => (
            StatusCode::OK,
            Json(RpcResponse::ok_with_message(true, "Data cleared successfully")),
        ),
        Err(e) => {
            log::error!("Failed to clear records: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RpcResponse::err(e.to_string())),
            )
        }
    }
}

// =====================================================
// Downloads
// =====================================================

// GET /download/:format
pub async fn download(State(state): State<Arc<AppState>>, Path(format): Path<String>) -> Response {
    let Some(format) = ExportFormat::parse(&format) else {
        return (StatusCode::BAD_REQUEST, "Invalid format").into_response();
    };

    let body = match format {
        ExportFormat::Json => match state.store.load_document() {
            Ok(document) if document.is_empty() => None,
            Ok(document) => match serde_json::to_vec_pretty(&document) {
                Ok(bytes) => Some(bytes),
                Err(e) => return download_failed(e),
            },
            Err(e) => return download_failed(e),
        },
        ExportFormat::Csv => match state.store.refresh_tabular() {
            Ok(bytes) => bytes,
            Err(e) => return download_failed(e),
        },
    };

    let Some(body) = body else {
        return (StatusCode::NOT_FOUND, "No data available for download").into_response();
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_filename(format, chrono::Local::now())
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

fn download_failed(e: impl std::fmt::Display) -> Response {
    log::error!("Download failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error downloading file: {}", e),
    )
        .into_response()
}

/// `rp_student_data_YYYYmmdd_HHMMSS.<ext>`
fn download_filename<Tz>(format: ExportFormat, at: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "rp_student_data_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

// =====================================================
// Service Endpoints
// =====================================================

// GET /rpc/status
pub async fn status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<RpcResponse<ServiceStatus>>) {
    let records = state.store.load();
    (
        StatusCode::OK,
        Json(RpcResponse::ok(ServiceStatus {
            running: true,
            uptime_secs: state.start_time.elapsed().as_secs(),
            total_records: records.len(),
            subject_columns: export::subject_columns(&records).len(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> Arc<AppState> {
        let store = RecordStore::open(dir.path().join("r.json"), dir.path().join("r.csv")).unwrap();
        Arc::new(AppState {
            store: Arc::new(store),
            start_time: Instant::now(),
        })
    }

    fn submission(marks: &[(&str, u8)]) -> RecordSubmission {
        RecordSubmission {
            timestamp: None,
            examination_board: ExaminationBoard::Reb,
            year_completed: "2022".to_string(),
            rp_admission_year: "2023".to_string(),
            combination: "PCM".to_string(),
            department: "Mining & Natural Resources".to_string(),
            course: "Mining Technology".to_string(),
            year_study: "Year 1".to_string(),
            marks: marks
                .iter()
                .map(|(s, m)| (s.to_string(), *m))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_count() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (code, Json(resp)) = submit(
            State(state.clone()),
            Ok(Json(submission(&[("Mathematics", 88), ("Physics", 91)]))),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert!(resp.success);
        assert_eq!(resp.message.as_deref(), Some("Data saved successfully"));
        assert_eq!(resp.data.unwrap().marks["Physics"], 91);

        let (_, Json(resp)) = count(State(state.clone())).await;
        assert_eq!(resp.data.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_submit_out_of_range_mark() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (code, Json(resp)) =
            submit(State(state.clone()), Ok(Json(submission(&[("Physics", 120)])))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(!resp.success);
        assert!(resp.data.is_none());

        let (_, Json(resp)) = count(State(state)).await;
        assert_eq!(resp.data.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_download_when_empty_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        for format in ["json", "csv"] {
            let response = download(State(state.clone()), Path(format.to_string())).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_string(response).await, "No data available for download");
        }
        assert!(!state.store.csv_path().exists());
    }

    #[tokio::test]
    async fn test_download_unknown_format() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        state.store.append(submission(&[("Physics", 40)])).unwrap();

        let response = download(State(state), Path("xlsx".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Invalid format");
    }

    #[tokio::test]
    async fn test_download_csv_is_fresh() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        state
            .store
            .append(submission(&[("Mathematics", 88), ("Physics", 91)]))
            .unwrap();
        state
            .store
            .append(submission(&[("Physics", 70), ("Chemistry", 65)]))
            .unwrap();
        std::fs::remove_file(state.store.csv_path()).unwrap();

        let response = download(State(state.clone()), Path("csv".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"rp_student_data_"));
        assert!(disposition.ends_with(".csv\""));

        let body = body_string(response).await;
        let header_line = body.lines().next().unwrap();
        assert!(header_line.ends_with("Mark_Chemistry,Mark_Mathematics,Mark_Physics"));
        assert_eq!(body.lines().count(), 3);
        assert!(state.store.csv_path().exists());
    }

    #[tokio::test]
    async fn test_download_json_matches_store() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let mut sub = submission(&[("Kinyarwanda", 95)]);
        sub.course = "Génie Civil".to_string();
        state.store.append(sub).unwrap();

        let response = download(State(state.clone()), Path("json".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = body_string(response).await;
        let records: Vec<Record> = serde_json::from_str(&body).unwrap();
        assert_eq!(records, state.store.load());
        assert!(body.contains("Génie Civil"));
    }

    #[tokio::test]
    async fn test_download_json_keeps_legacy_fields() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        std::fs::write(
            state.store.json_path(),
            r#"[{"id": 1, "course": "Civil", "notes": "entered by hand"}]"#,
        )
        .unwrap();

        let response = download(State(state.clone()), Path("json".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body[0]["notes"], "entered by hand");

        let response = download(State(state), Path("csv".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Civil"));
    }

    #[tokio::test]
    async fn test_submit_over_unreadable_store_fails() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        std::fs::create_dir_all(state.store.json_path().join("keep")).unwrap();

        let (code, Json(resp)) =
            submit(State(state.clone()), Ok(Json(submission(&[("Physics", 60)])))).await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!resp.success);

        let response = download(State(state), Path("json".to_string())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.starts_with("Error downloading file:"));
    }

    #[tokio::test]
    async fn test_clear_and_status() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        state.store.append(submission(&[("Physics", 40), ("Biology", 55)])).unwrap();

        let (_, Json(resp)) = status(State(state.clone())).await;
        let s = resp.data.unwrap();
        assert_eq!(s.total_records, 1);
        assert_eq!(s.subject_columns, 2);

        let (code, Json(resp)) = clear(State(state.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(resp.message.as_deref(), Some("Data cleared successfully"));

        let (_, Json(resp)) = list_all(State(state)).await;
        assert!(resp.data.unwrap().is_empty());
    }

    #[test]
    fn test_download_filename() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(
            download_filename(ExportFormat::Json, at),
            "rp_student_data_20240307_090502.json"
        );
    }
}

//! HTML listing of every stored record.

use crate::export;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;
use student_records_types::Record;

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = state.store.load();
    let uptime = state.start_time.elapsed().as_secs();
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        render_page(&records, uptime),
    )
}

fn render_page(records: &[Record], uptime_secs: u64) -> String {
    if records.is_empty() {
        return r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Student Records</title></head>
<body><h2>No data available</h2></body>
</html>"#
            .to_string();
    }

    let subject_count = export::subject_columns(records).len();
    let mut rows = String::new();
    for r in records {
        let marks = r
            .marks
            .iter()
            .map(|(subject, score)| format!("{}: {}", escape_html(subject), score))
            .collect::<Vec<_>>()
            .join("<br>");
        rows.push_str(&format!(
            "<tr><td class=\"mono\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"marks\">{}</td></tr>\n",
            r.id,
            escape_html(r.submitted_on()),
            r.examination_board.map(|b| b.as_str()).unwrap_or(""),
            escape_html(&r.year_completed),
            escape_html(&r.rp_admission_year),
            escape_html(&r.combination),
            escape_html(&r.department),
            escape_html(&r.course),
            escape_html(&r.year_study),
            marks,
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Student Records</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #0f1117; color: #e0e0e0; padding: 20px; }}
  h1 {{ color: #667eea; margin-bottom: 8px; }}
  .meta {{ color: #8b949e; font-size: 0.85em; margin-bottom: 20px; }}
  .stats {{ display: flex; gap: 16px; margin-bottom: 24px; flex-wrap: wrap; }}
  .stat {{ background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 16px 24px; text-align: center; min-width: 140px; }}
  .stat .val {{ display: block; font-size: 2em; font-weight: bold; color: #667eea; }}
  .stat .lbl {{ display: block; font-size: 0.85em; color: #8b949e; margin-top: 4px; }}
  .nav {{ margin-bottom: 20px; }}
  .nav a {{ display: inline-block; padding: 8px 14px; background: #667eea; color: #fff; text-decoration: none; border-radius: 6px; margin-right: 8px; font-size: 0.9em; }}
  table {{ width: 100%; border-collapse: collapse; margin-bottom: 24px; }}
  th {{ background: #161b22; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.85em; text-transform: uppercase; border-bottom: 1px solid #30363d; }}
  td {{ padding: 8px 12px; border-bottom: 1px solid #21262d; font-size: 0.9em; vertical-align: top; }}
  tr:hover {{ background: #161b22; }}
  .mono {{ font-family: 'SF Mono', 'Consolas', monospace; font-size: 0.85em; }}
  .marks {{ font-size: 0.85em; }}
</style>
</head>
<body>
  <h1>Student Performance Records</h1>
  <p class="meta">Uptime: {uptime}</p>

  <div class="stats">
    <div class="stat"><span class="val">{total}</span><span class="lbl">Total Records</span></div>
    <div class="stat"><span class="val">{subjects}</span><span class="lbl">Subject Columns</span></div>
  </div>

  <div class="nav">
    <a href="/download/json">Download JSON</a>
    <a href="/download/csv">Download CSV</a>
  </div>

  <table>
    <thead><tr><th>ID</th><th>Submitted</th><th>Board</th><th>HS Year</th><th>RP Year</th><th>Combination</th><th>Department</th><th>Course</th><th>Year of Study</th><th>Marks</th></tr></thead>
    <tbody>{rows}</tbody>
  </table>
</body>
</html>"#,
        uptime = format_uptime(uptime_secs),
        total = records.len(),
        subjects = subject_count,
        rows = rows,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

//! Text and JSON-lines renderings of catalogs, previews and run results

use serde_json::json;

use super::terminal::Painter;
use crate::cache::LoadSummary;
use crate::catalog::{Catalog, InfoKind, Language, Step, Workflow};
use crate::engine::{AbortReason, ResponsePayload, RunReport, RunState, StepResult, StepStatus, SynthesizedRequest};

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────────────────";

pub fn format_workflows(catalog: &Catalog, lang: Language, painter: Painter) -> String {
    let mut output = String::new();
    for workflow in catalog.workflows() {
        output.push_str(&format!("{}  {}\n", painter.label(&workflow.id), workflow.name.get(lang)));
        if !workflow.description.is_empty() {
            output.push_str(&format!("    {}\n", painter.muted(workflow.description.get(lang))));
        }
        if !workflow.scenarios.is_empty() {
            let scenarios: Vec<String> = workflow
                .scenarios
                .iter()
                .map(|s| format!("{} ({})", s.id, s.label.get(lang)))
                .collect();
            output.push_str(&format!("    scenarios: {}\n", scenarios.join(", ")));
        }
        output.push_str(&format!("    steps: {}\n", workflow.steps.len()));
    }
    output
}

/// Visible step list with status markers, headed by the info box
pub fn format_steps(
    workflow: &Workflow,
    scenario: Option<&str>,
    steps: &[(&Step, StepStatus)],
    lang: Language,
    painter: Painter,
) -> String {
    let mut output = format!("{}  {}\n", painter.label(&workflow.id), workflow.name.get(lang));
    if let Some(scenario) = scenario.and_then(|id| workflow.scenario(id)) {
        output.push_str(&format!("scenario: {} ({})\n", scenario.id, scenario.label.get(lang)));
    }

    if let Some(ref info) = workflow.info {
        let title = match info.kind {
            InfoKind::Note => painter.info(info.title.get(lang)),
            InfoKind::Warning => painter.warning(info.title.get(lang)),
            InfoKind::Success => painter.success(info.title.get(lang)),
        };
        output.push_str(&format!("\n  {}\n  {}\n", title, info.text.get(lang)));
    }

    output.push('\n');
    for (position, (step, status)) in steps.iter().enumerate() {
        let marker = match status {
            StepStatus::Success => painter.success(status.marker()),
            StepStatus::Error => painter.error(status.marker()),
            StepStatus::Active => painter.info(status.marker()),
            StepStatus::Pending => painter.muted(status.marker()),
        };
        output.push_str(&format!(
            "  {} {}. {}  {}  {} {}\n",
            marker,
            position + 1,
            step.id,
            step.name.get(lang),
            painter.http_method(&step.method),
            step.endpoint
        ));
        if !step.description.is_empty() {
            output.push_str(&format!("       {}\n", painter.muted(step.description.get(lang))));
        }
    }
    output
}

/// Request preview: method, URL, headers, body
pub fn format_preview(step: &Step, request: &SynthesizedRequest, lang: Language, painter: Painter) -> String {
    let mut output = format!("{} ({})\n", step.name.get(lang), painter.label(&step.id));
    output.push_str(&format!("{} {}\n", painter.http_method(&request.method), request.url));
    for (name, value) in request.headers(true) {
        output.push_str(&format!("{}: {}\n", painter.label(name), value));
    }
    if let Some(ref body) = request.body {
        output.push('\n');
        output.push_str(&body.to_pretty());
        output.push('\n');
    }
    output
}

/// One executed step with its full response
pub fn format_step_result(result: &StepResult, painter: Painter) -> String {
    let icon = if result.success() { painter.success("✓") } else { painter.error("✗") };
    let mut output = format!(
        "{} {} {} {} ({} ms)\n",
        icon,
        result.step_id,
        painter.http_method(&result.method),
        painter.http_status(result.outcome.status),
        result.outcome.duration_ms()
    );
    output.push_str(&format!("  {}\n", painter.muted(&result.url)));

    let pagination = &result.outcome.pagination;
    if !pagination.is_empty() {
        let part = |name: &str, value: Option<u64>| value.map(|v| format!("{} {}", name, v));
        let parts: Vec<String> = [
            part("total", pagination.total_count),
            part("pages", pagination.total_pages),
            part("page", pagination.current_page),
        ]
        .into_iter()
        .flatten()
        .collect();
        output.push_str(&format!("  {}\n", painter.muted(&parts.join(" | "))));
    }

    output.push('\n');
    output.push_str(&result.outcome.payload.render());
    output.push('\n');
    output
}

fn describe_state(state: &RunState) -> String {
    match state {
        RunState::Idle => "idle".to_string(),
        RunState::Running => "running".to_string(),
        RunState::Completed => "completed".to_string(),
        RunState::Aborted { step_id, reason: AbortReason::StepFailed { status: 0 } } => {
            format!("aborted at {} (no response)", step_id)
        }
        RunState::Aborted { step_id, reason: AbortReason::StepFailed { status } } => {
            format!("aborted at {} (HTTP {})", step_id, status)
        }
        RunState::Aborted { step_id, reason: AbortReason::Validation { message } } => {
            format!("aborted at {}: {}", step_id, message)
        }
        RunState::Cancelled { next_step: Some(next) } => format!("cancelled before {}", next),
        RunState::Cancelled { next_step: None } => "cancelled".to_string(),
    }
}

/// Run summary table; `total` is the number of visible steps
pub fn format_run_report(report: &RunReport, total: usize, painter: Painter) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", HEAVY_RULE));
    output.push_str("                        WORKFLOW RESULTS\n");
    output.push_str(&format!("{}\n\n", HEAVY_RULE));

    for (i, result) in report.executed.iter().enumerate() {
        let icon = if result.success() { painter.success("✓") } else { painter.error("✗") };
        output.push_str(&format!(
            "  {} Step {}: {} ({} {})\n",
            icon,
            i + 1,
            result.step_id,
            result.method,
            painter.http_status(result.outcome.status)
        ));
        output.push_str(&format!("      URL: {}\n", result.url));
        output.push_str(&format!("      Time: {} ms\n", result.outcome.duration_ms()));

        if !result.success() {
            let detail = match &result.outcome.payload {
                ResponsePayload::Json(value) => value.to_string(),
                other => other.render(),
            };
            output.push_str(&format!("      Response: {}\n", painter.error(&detail)));
        }
        output.push('\n');
    }

    let passed = report.passed();
    let failed = report.executed.len() - passed;
    let not_run = total.saturating_sub(report.executed.len());

    output.push_str(&format!("{}\n", LIGHT_RULE));
    match report.scenario {
        Some(ref scenario) => output.push_str(&format!("  Workflow: {} ({})\n", report.workflow_id, scenario)),
        None => output.push_str(&format!("  Workflow: {}\n", report.workflow_id)),
    }
    let state = describe_state(&report.state);
    let state = match report.state {
        RunState::Completed => painter.success(&state),
        RunState::Aborted { .. } => painter.error(&state),
        _ => painter.warning(&state),
    };
    output.push_str(&format!("  State: {}\n", state));
    output.push_str(&format!(
        "  Total: {} | Passed: {} | Failed: {} | Not run: {}\n",
        total, passed, failed, not_run
    ));
    output.push_str(&format!("{}\n", HEAVY_RULE));

    output
}

fn step_line(result: &StepResult, with_response: bool) -> serde_json::Value {
    let mut line = json!({
        "level": if result.success() { "info" } else { "error" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": "step_result",
        "step_id": result.step_id,
        "method": result.method,
        "url": result.url,
        "status": result.outcome.status,
        "duration_ms": result.outcome.duration_ms(),
        "success": result.success(),
        "executed_at": result.executed_at.to_rfc3339(),
    });
    if let ResponsePayload::TransportError(ref message) = result.outcome.payload {
        line["error"] = json!(message);
    }
    if with_response || !result.success() {
        line["response"] = json!(result.outcome.payload);
    }
    if !result.outcome.pagination.is_empty() {
        line["pagination"] = json!(result.outcome.pagination);
    }
    line
}

/// One JSON line for a single executed step, response included
pub fn format_step_result_json(result: &StepResult) -> String {
    format!("{}\n", step_line(result, true))
}

/// JSON lines: one per executed step, then a summary line
pub fn format_run_report_json(report: &RunReport, total: usize) -> String {
    let mut output = String::new();
    for result in &report.executed {
        output.push_str(&step_line(result, false).to_string());
        output.push('\n');
    }

    let passed = report.passed();
    let failed = report.executed.len() - passed;
    let summary = json!({
        "level": if report.state == RunState::Completed { "info" } else { "error" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": "workflow_summary",
        "workflow_id": report.workflow_id,
        "scenario": report.scenario,
        "run": report.state,
        "total": total,
        "passed": passed,
        "failed": failed,
        "not_run": total.saturating_sub(report.executed.len()),
        "success": report.state == RunState::Completed,
    });
    output.push_str(&summary.to_string());
    output.push('\n');
    output
}

/// Per-category outcome of a reference data load
pub fn format_load_summary(summary: &LoadSummary, painter: Painter) -> String {
    let mut output = String::new();
    for (category, count) in &summary.loaded {
        output.push_str(&format!("  {} {:<14} {} records\n", painter.success("✓"), category, count));
    }
    for (category, message) in &summary.failed {
        output.push_str(&format!("  {} {:<14} {}\n", painter.error("✗"), category, painter.muted(message)));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::engine::{ExecutionOutcome, ResponsePayload};
    use std::time::Duration;

    fn result(step: &str, status: u16) -> StepResult {
        StepResult::new(
            step,
            "POST",
            "https://api.example.test/2.0/customers",
            ExecutionOutcome::new(status, Duration::from_millis(42), ResponsePayload::Json(json!({"errors": ["taken"]}))),
        )
    }

    fn aborted_report() -> RunReport {
        RunReport {
            workflow_id: "order-processing".into(),
            scenario: Some("new-customer".into()),
            state: RunState::Aborted {
                step_id: "create-customer".into(),
                reason: AbortReason::StepFailed { status: 422 },
            },
            executed: vec![result("search-customer", 200), result("create-customer", 422)],
        }
    }

    #[test]
    fn test_run_report_counts() {
        let text = format_run_report(&aborted_report(), 4, Painter::plain());
        assert!(text.contains("WORKFLOW RESULTS"));
        assert!(text.contains("✓ Step 1: search-customer (POST 200)"));
        assert!(text.contains("✗ Step 2: create-customer (POST 422)"));
        assert!(text.contains("Response: {\"errors\":[\"taken\"]}"));
        assert!(text.contains("State: aborted at create-customer (HTTP 422)"));
        assert!(text.contains("Total: 4 | Passed: 1 | Failed: 1 | Not run: 2"));
    }

    #[test]
    fn test_run_report_json_lines() {
        let text = format_run_report_json(&aborted_report(), 4);
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "step_result");
        assert!(lines[0].get("response").is_none());
        assert_eq!(lines[1]["level"], "error");
        assert_eq!(lines[1]["response"]["kind"], "json");
        assert_eq!(lines[2]["event"], "workflow_summary");
        assert_eq!(lines[2]["run"]["state"], "aborted");
        assert_eq!(lines[2]["run"]["reason"]["status"], 422);
        assert_eq!(lines[2]["not_run"], 2);
        assert_eq!(lines[2]["success"], false);
    }

    #[test]
    fn test_workflows_listing_in_arabic() {
        let text = format_workflows(&builtin_catalog(), Language::Ar, Painter::plain());
        assert!(text.contains("order-processing  معالجة الطلبات"));
        assert!(text.contains("scenarios: existing-customer"));
    }

    #[test]
    fn test_transport_error_line_carries_message() {
        let failed = StepResult::new(
            "fetch-vendors",
            "GET",
            "http://localhost:1/vendors",
            ExecutionOutcome::transport_error(Duration::from_millis(3), "connection refused"),
        );
        let line: serde_json::Value = serde_json::from_str(format_step_result_json(&failed).trim()).unwrap();
        assert_eq!(line["status"], 0);
        assert_eq!(line["error"], "connection refused");
        assert!(format_step_result(&failed, Painter::plain()).contains("✗ fetch-vendors GET ---"));
    }
}

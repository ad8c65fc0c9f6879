use crate::client::{SubRequest, SubResponse};
use crate::models::{BatchDetail, QueryPlan, QueryPlanOutcome, ResultEntry};
use serde_json::Value;
use url::form_urlencoded;

pub const MISSING_CARDINALITY: &str = "Query plan missing cardinality data.";
pub const MISSING_RESPONSE: &str = "Missing response from composite batch.";
const UNKNOWN_ERROR: &str = "Unknown error.";

pub fn explain_query(entity: &str, field: &str) -> String {
    format!("SELECT count(Id) FROM {} WHERE {} != null", entity, field)
}

/// Tooling API path that returns the query plan of the non-null count query.
/// The query is form-encoded (`+` for spaces, `!()` escaped); the query
/// endpoint decodes this the same as percent-encoded `%20`.
pub fn explain_url(api_version: &str, entity: &str, field: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("explain", &explain_query(entity, field))
        .finish();
    format!("/services/data/{}/tooling/query/?{}", api_version, query)
}

/// One GET per detail, tagged `plan{position}`.
pub fn build_sub_requests(api_version: &str, chunk: &[&BatchDetail]) -> Vec<SubRequest> {
    chunk
        .iter()
        .enumerate()
        .map(|(index, detail)| SubRequest {
            method: "GET".to_string(),
            url: explain_url(api_version, &detail.entity, &detail.field),
            reference_id: format!("plan{}", index),
        })
        .collect()
}

fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

/// Reads `plans[0].cardinality` and `plans[0].sobjectCardinality`.
pub fn parse_plan(body: &Value) -> Option<QueryPlan> {
    let plan = body.get("plans")?.as_array()?.first()?;
    let non_null_count = as_count(plan.get("cardinality")?)?;
    let total_count = as_count(plan.get("sobjectCardinality")?)?;
    Some(QueryPlan::new(non_null_count, total_count))
}

fn is_blank(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        _ => false,
    }
}

fn message_of(value: &Value) -> Option<&str> {
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
}

/// Error text of a failed sub-response: the first structured message when
/// there is one, the raw body otherwise.
pub fn extract_error(body: &Value) -> String {
    if is_blank(body) {
        return UNKNOWN_ERROR.to_string();
    }
    if let Some(first) = body.as_array().and_then(|items| items.first()) {
        return message_of(first)
            .map(str::to_string)
            .unwrap_or_else(|| first.to_string());
    }
    if let Some(message) = message_of(body) {
        return message.to_string();
    }
    match body {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn outcome_for(response: &SubResponse) -> QueryPlanOutcome {
    if response.is_success() {
        match parse_plan(&response.body) {
            Some(plan) => QueryPlanOutcome::Plan(plan),
            None => QueryPlanOutcome::Error(MISSING_CARDINALITY.to_string()),
        }
    } else {
        QueryPlanOutcome::Error(extract_error(&response.body))
    }
}

/// Maps sub-responses back onto their details by position. Details without a
/// response become errors; surplus responses are ignored.
pub fn demultiplex(chunk: &[&BatchDetail], responses: Vec<SubResponse>) -> Vec<ResultEntry> {
    let mut responses = responses.into_iter();
    chunk
        .iter()
        .map(|detail| match responses.next() {
            Some(response) => ResultEntry::from_outcome(detail, outcome_for(&response)),
            None => ResultEntry::failed(detail, MISSING_RESPONSE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldMetadata, FieldRef};
    use serde_json::json;

    fn detail(field: &str) -> BatchDetail {
        BatchDetail::new(
            &FieldRef::new("Account", field),
            "Account (Account)",
            Some(FieldMetadata::new(field, None, Some("string"))),
        )
    }

    fn response(status: u16, body: Value) -> SubResponse {
        SubResponse {
            body,
            http_status_code: status,
            reference_id: None,
        }
    }

    #[test]
    fn test_explain_url_encodes_query() {
        let url = explain_url("v57.0", "Account", "Industry");
        assert_eq!(
            url,
            "/services/data/v57.0/tooling/query/?explain=SELECT+count%28Id%29+FROM+Account+WHERE+Industry+%21%3D+null"
        );
    }

    #[test]
    fn test_sub_requests_are_tagged_by_position() {
        let a = detail("Name");
        let b = detail("Industry");
        let requests = build_sub_requests("v57.0", &[&a, &b]);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].reference_id, "plan0");
        assert_eq!(requests[1].reference_id, "plan1");
        assert!(requests[1].url.contains("Industry"));
        assert!(requests.iter().all(|r| r.method == "GET"));
    }

    #[test]
    fn test_parse_plan_reads_first_plan() {
        let body = json!({ "plans": [
            { "cardinality": 40, "sobjectCardinality": 160, "leadingOperationType": "TableScan" },
            { "cardinality": 1, "sobjectCardinality": 1 }
        ]});
        let plan = parse_plan(&body).unwrap();
        assert_eq!(plan.non_null_count, 40);
        assert_eq!(plan.total_count, 160);
        assert_eq!(plan.non_null_percentage, 0.25);
    }

    #[test]
    fn test_parse_plan_requires_both_cardinalities() {
        assert!(parse_plan(&json!({ "plans": [] })).is_none());
        assert!(parse_plan(&json!({ "plans": [{ "cardinality": 4 }] })).is_none());
        assert!(parse_plan(&json!({ "plans": [{ "cardinality": "4", "sobjectCardinality": 5 }] })).is_none());
        assert!(parse_plan(&json!({})).is_none());
    }

    #[test]
    fn test_extract_error_shapes() {
        assert_eq!(extract_error(&Value::Null), "Unknown error.");
        assert_eq!(
            extract_error(&json!([{ "message": "No such column", "errorCode": "INVALID_FIELD" }])),
            "No such column"
        );
        assert_eq!(
            extract_error(&json!([{ "errorCode": "INVALID_FIELD" }])),
            r#"{"errorCode":"INVALID_FIELD"}"#
        );
        assert_eq!(extract_error(&json!({ "message": "Denied" })), "Denied");
        assert_eq!(extract_error(&json!({ "code": 7 })), r#"{"code":7}"#);
        assert_eq!(extract_error(&json!("gateway down")), "gateway down");
    }

    #[test]
    fn test_success_without_cardinality_is_an_error() {
        let outcome = outcome_for(&response(200, json!({ "plans": [] })));
        assert_eq!(outcome, QueryPlanOutcome::Error(MISSING_CARDINALITY.to_string()));
    }

    #[test]
    fn test_demultiplex_is_positional_and_pads_missing() {
        let a = detail("Name");
        let b = detail("Industry");
        let c = detail("Rating");
        let entries = demultiplex(
            &[&a, &b, &c],
            vec![
                response(200, json!({ "plans": [{ "cardinality": 3, "sobjectCardinality": 4 }] })),
                response(400, json!([{ "message": "No such column 'Industry'" }])),
            ],
        );

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].field, "Name");
        assert_eq!(entries[0].non_null_percentage, Some(0.75));
        assert_eq!(entries[1].status.to_string(), "Error: No such column 'Industry'");
        assert_eq!(
            entries[2].status.to_string(),
            "Error: Missing response from composite batch."
        );
    }
}

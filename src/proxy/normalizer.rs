//! Upstream response normalization.
//!
//! Applied once per cache miss, before the response is stored:
//! - `set-cookie` is always removed and `Cache-Control: s-maxage=<edge ttl>`
//!   always appended, whatever the status
//! - 2xx only: content type chosen from the request path (`.xlsx` →
//!   spreadsheet, anything else → JSON), and for JSON, the string-typed
//!   numbers of a `REQUEST_SUCCEEDED` series payload are coerced to native
//!   JSON types
//!
//! Coercion never fails: a body that does not have the expected shape is
//! returned byte for byte.

use bytes::Bytes;
use axum::http::{header, HeaderValue};
use serde_json::{Map, Number, Value};
use url::Url;

use crate::http::response::ProxyResponse;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const JSON_CONTENT_TYPE: &str = "application/json";

const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";

/// Content type served for a successful response to `url`.
pub fn content_type_for(url: &Url) -> &'static str {
    if url.path().ends_with(".xlsx") {
        XLSX_CONTENT_TYPE
    } else {
        JSON_CONTENT_TYPE
    }
}

/// Produce the cacheable form of `raw`. `raw` itself is not modified.
pub fn normalize(raw: &ProxyResponse, request_url: &Url, edge_max_age_secs: u64) -> ProxyResponse {
    let mut headers = raw.headers.without(header::SET_COOKIE).with_appended(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("s-maxage={}", edge_max_age_secs))
            .unwrap_or_else(|_| HeaderValue::from_static("s-maxage=86400")),
    );

    if !raw.is_success() {
        return raw.with_headers(headers);
    }

    let content_type = content_type_for(request_url);
    headers = headers.with_set(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    let body = if content_type == JSON_CONTENT_TYPE {
        coerce_body(&raw.body)
    } else {
        raw.body.clone()
    };

    ProxyResponse::new(raw.status, headers, body)
}

/// Coerce a series payload; any other body comes back unchanged.
pub fn coerce_body(body: &Bytes) -> Bytes {
    let Ok(mut document) = serde_json::from_slice::<Value>(body) else {
        return body.clone();
    };
    if !coerce_series(&mut document) {
        return body.clone();
    }
    match serde_json::to_vec(&document) {
        Ok(encoded) => Bytes::from(encoded),
        Err(_) => body.clone(),
    }
}

/// Coerce every data cell of a `{status: REQUEST_SUCCEEDED, Results: {series: [..]}}`
/// document in place. Returns false (and touches nothing) when the shape
/// does not match.
pub fn coerce_series(document: &mut Value) -> bool {
    if document.get("status").and_then(Value::as_str) != Some(REQUEST_SUCCEEDED) {
        return false;
    }
    let Some(series) = document
        .get_mut("Results")
        .and_then(|r| r.get_mut("series"))
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    for entry in series.iter_mut() {
        let Some(data) = entry.get_mut("data").and_then(Value::as_array_mut) else {
            continue;
        };
        for cell in data.iter_mut().filter_map(Value::as_object_mut) {
            coerce_cell(cell);
        }
    }
    true
}

fn coerce_cell(cell: &mut Map<String, Value>) {
    if let Some(year) = cell.get_mut("year") {
        if let Some(parsed) = year.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
            *year = Value::from(parsed);
        }
    }
    if let Some(value) = cell.get_mut("value") {
        if let Some(parsed) = value
            .as_str()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .and_then(Number::from_f64)
        {
            *value = Value::Number(parsed);
        }
    }
    if let Some(latest) = cell.get_mut("latest") {
        if let Some(flag) = latest.as_str().map(|s| s == "true") {
            *latest = Value::Bool(flag);
        }
    }
}

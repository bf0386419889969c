//! Single case execution
//!
//! resolve request -> dispatch -> extract -> resolve expectations -> assert.
//! The loaded case is never modified; every run works on freshly resolved
//! values.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::assertions::{assert_json, assert_status};
use super::config::{RequestTemplate, TestCase};
use crate::common::{mask_secret, Error, Result};
use crate::context::RunContext;
use crate::extract::{extract_variables, ExtractionReport};
use crate::http::{Dispatcher, HttpResponse, PreparedRequest};
use crate::store::{global_path, is_set};

/// Details of a case that passed
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub status: u16,
    pub elapsed: Duration,
    pub extraction: ExtractionReport,
}

/// Resolve a request template into a request ready to send
///
/// Body, form and query leaves that reference unset variables keep their
/// `${name}` text. The auth token header is added when the token is set.
pub fn prepare_request(ctx: &RunContext, api: &RequestTemplate) -> Result<PreparedRequest> {
    let path = api
        .path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(Error::MissingRequestPath)?;

    let resolver = ctx.resolver();

    let json = match &api.json {
        Some(body) => Some(resolver.resolve_map(body, "JSON")?),
        None => None,
    };
    let params = resolver.resolve_map(&api.params, "URL")?;
    let form = resolver.resolve_map(&api.data, "form")?;

    let headers = api
        .headers
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect();

    let mut request = PreparedRequest {
        method: api.method.to_uppercase(),
        path: path.to_string(),
        headers,
        params,
        json,
        form,
    };

    let token = ctx.state.get(&global_path(&ctx.auth.token_var))?;
    if is_set(token.as_ref()) {
        let token = match token {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        debug!(
            "Attaching token header '{}': {}",
            ctx.auth.token_header,
            mask_secret(&token, 10)
        );
        request.set_header(&ctx.auth.token_header, token);
    }

    Ok(request)
}

/// Run one case to completion
///
/// Returns `Ok` only if every assertion passed. Assertion errors abort the
/// case at the first mismatch.
pub async fn execute_case(
    ctx: &mut RunContext,
    dispatcher: &dyn Dispatcher,
    case: &TestCase,
) -> Result<CaseReport> {
    info!("Executing case: {} - {}", case.case_id, case.title);

    let request = prepare_request(ctx, &case.api)?;
    let response = dispatcher.dispatch(&request).await?;
    debug!("Response body: {}", response.body);

    let mut body: Option<Value> = None;

    let extraction = if case.extract.is_empty() {
        ExtractionReport::default()
    } else {
        let parsed = parsed_body(&mut body, &response)?;
        extract_variables(ctx.state.as_mut(), parsed, &case.extract)?
    };

    let expected_json = ctx
        .resolver()
        .resolve_map(&case.expected.json, "assertion")?;

    assert_status(response.status, case.expected.code)?;

    if !expected_json.is_empty() {
        let parsed = parsed_body(&mut body, &response)?;
        for (key, expected) in &expected_json {
            assert_json(parsed, key, expected)?;
        }
    }

    info!("Case finished: {}", case.case_id);

    Ok(CaseReport {
        status: response.status,
        elapsed: response.elapsed,
        extraction,
    })
}

/// Parse the response body once and reuse it
fn parsed_body<'a>(cache: &'a mut Option<Value>, response: &HttpResponse) -> Result<&'a Value> {
    if cache.is_none() {
        *cache = Some(response.json()?);
    }
    cache
        .as_ref()
        .ok_or_else(|| Error::ResponseNotJson(String::new()))
}

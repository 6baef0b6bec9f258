//! Per-test execution
//!
//! One test runs as a small state machine:
//!
//! ```text
//! Build -> Send -> WaitCheck -> (sleep, Build) | Validate -> Save -> Done
//! ```
//!
//! Each attempt interpolates the immutable [`TestDefinition`] into a fresh
//! [`HttpRequest`]. Variables are only written once every assertion passed
//! and every save field resolved.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::common::config::RetryConfig;
use crate::common::{Error, PathError, Result};
use crate::dsl::{TestDefinition, WaitCondition, FORM_CONTENT_TYPE};

use super::transport::{HttpRequest, HttpResponse, Transport};
use super::validate::{parse_json_object, validate_all, ResponseView};
use super::values::{display_value, parse_expected, values_equal};
use super::vars::{extract, VariableStore};

/// The response of the attempt that got past the wait check
struct Attempt {
    response: HttpResponse,
    json: Option<Map<String, Value>>,
    duration: Duration,
}

/// An unmet wait condition and what was observed instead
struct Unmet {
    condition: String,
    observed: String,
}

/// Runs single tests against a [`Transport`]
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    preview_chars: usize,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig, preview_chars: usize) -> Self {
        Self {
            transport,
            retry,
            preview_chars,
        }
    }

    /// Run one test, storing its saved fields in `vars` on success
    #[tracing::instrument(skip(self, test, vars), fields(test = %test.name))]
    pub async fn run(&self, test: &TestDefinition, vars: &mut VariableStore) -> Result<()> {
        let attempt = self.send_until_ready(test, vars).await?;

        let view = ResponseView {
            status: attempt.response.status,
            body: &attempt.response.body,
            json: attempt.json.as_ref(),
            duration: attempt.duration,
            preview_chars: self.preview_chars,
        };
        validate_all(&test.assertions, &view)?;

        let mut saved = Vec::with_capacity(test.saves.len());
        for save in &test.saves {
            let json = attempt.json.as_ref().ok_or_else(|| {
                Error::Save(PathError::NotFound {
                    path: save.field.clone(),
                })
            })?;
            let value = extract(json, &save.field).map_err(Error::Save)?;
            saved.push((save.variable.clone(), value.clone()));
        }
        for (name, value) in saved {
            tracing::debug!(variable = %name, value = %display_value(&value), "Saved variable");
            vars.insert(name, value);
        }

        Ok(())
    }

    /// Build, send and wait-check until the wait condition holds or the attempts run out
    async fn send_until_ready(&self, test: &TestDefinition, vars: &VariableStore) -> Result<Attempt> {
        let delay = test
            .retry
            .delay
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| self.retry.delay());
        let max_attempts = test
            .retry
            .max_attempts
            .filter(|n| *n > 0)
            .unwrap_or(self.retry.max_attempts);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let request = build_request(test, vars);
            tracing::debug!(attempt = attempts, method = %request.method, url = %request.url, "Sending request");

            let start = Instant::now();
            let sent = self.transport.send(request).await;
            let duration = start.elapsed();

            let unmet = match sent {
                Ok(response) => {
                    tracing::debug!(status = response.status, elapsed_ms = duration.as_millis() as u64, "Received response");
                    let json = parse_json_object(&response.body);
                    let attempt = Attempt {
                        response,
                        json,
                        duration,
                    };
                    match check_wait(&test.wait, &attempt) {
                        None => return Ok(attempt),
                        Some(unmet) => unmet,
                    }
                }
                Err(e) if test.wait.is_active() => Unmet {
                    condition: describe_wait(&test.wait),
                    observed: e.to_string(),
                },
                Err(e) => return Err(e),
            };

            if attempts >= max_attempts {
                return Err(Error::wait_timeout(unmet.condition, unmet.observed, attempts));
            }
            tracing::info!(
                attempt = attempts,
                max_attempts,
                condition = %unmet.condition,
                observed = %unmet.observed,
                "Wait condition not met, retrying in {:?}",
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Interpolate the test template into a request for one attempt
fn build_request(test: &TestDefinition, vars: &VariableStore) -> HttpRequest {
    let headers = test
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), vars.interpolate(value)))
        .collect();

    let body = (!test.body.is_empty()).then(|| {
        let body = vars.interpolate(&test.body);
        if is_form(test.content_type.as_deref()) {
            encode_form(&body)
        } else {
            body
        }
    });

    HttpRequest {
        method: test.method,
        url: vars.interpolate(&test.url),
        headers,
        content_type: test.content_type.clone(),
        body,
    }
}

fn is_form(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Encode `key=value` lines; later keys win and pairs go out sorted by key
fn encode_form(body: &str) -> String {
    let pairs: BTreeMap<&str, &str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once('='))
        .collect();

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// First unmet wait condition, status before field
fn check_wait(wait: &WaitCondition, attempt: &Attempt) -> Option<Unmet> {
    if let Some(expected) = wait.status {
        if attempt.response.status != expected {
            return Some(Unmet {
                condition: format!("status {expected}"),
                observed: format!("got {}", attempt.response.status),
            });
        }
    }

    let (path, raw_expected) = wait.field.as_ref()?;
    let actual = attempt
        .json
        .as_ref()
        .and_then(|json| extract(json, path).ok());
    match actual {
        None => Some(Unmet {
            condition: format!("field `{path}`"),
            observed: "field not found".to_string(),
        }),
        Some(actual) if !values_equal(actual, &parse_expected(raw_expected)) => Some(Unmet {
            condition: format!("field `{path}` equals `{raw_expected}`"),
            observed: format!("got `{}`", display_value(actual)),
        }),
        Some(_) => None,
    }
}

fn describe_wait(wait: &WaitCondition) -> String {
    match (&wait.status, &wait.field) {
        (Some(status), _) => format!("status {status}"),
        (None, Some((path, value))) => format!("field `{path}` equals `{value}`"),
        (None, None) => "response".to_string(),
    }
}

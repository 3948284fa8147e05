//! Endpoint request builders
//!
//! Each function maps typed parameters to an [`ApiRequest`]. Paths are
//! relative to the `/api/` base URL. Optional query parameters are appended
//! in a fixed order so the resulting URLs are stable.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{InputError, InputResult};
use crate::query::QueryString;
use crate::request::ApiRequest;

/// `GET /api/` - the server greeting
pub fn server_status() -> ApiRequest {
    ApiRequest::get("")
}

/// `GET /api/config`
pub fn config() -> ApiRequest {
    ApiRequest::get("config")
}

/// `GET /api/components`
pub fn components() -> ApiRequest {
    ApiRequest::get("components")
}

/// `POST /api/config/core/check_config`
pub fn check_config() -> ApiRequest {
    ApiRequest::post("config/core/check_config", None)
}

/// `GET /api/events`
pub fn events() -> ApiRequest {
    ApiRequest::get("events")
}

/// `POST /api/events/{event_type}` with optional event data
pub fn fire_event(event_type: &str, data: Option<&Value>) -> InputResult<ApiRequest> {
    require("event_type", event_type)?;
    let body = data.map(Value::to_string);
    Ok(ApiRequest::post(format!("events/{}", event_type), body))
}

/// `GET /api/services`
pub fn services() -> ApiRequest {
    ApiRequest::get("services")
}

/// `GET /api/states` or `GET /api/states/{entity_id}`
pub fn states(entity_id: Option<&str>) -> InputResult<ApiRequest> {
    match entity_id {
        Some(entity_id) => {
            require("entity_id", entity_id)?;
            Ok(ApiRequest::get(format!("states/{}", entity_id)))
        }
        None => Ok(ApiRequest::get("states")),
    }
}

/// `GET /api/error_log` (plain text)
pub fn error_log() -> ApiRequest {
    ApiRequest::get("error_log")
}

/// `GET /api/camera_proxy/{entity_id}[?time=...]` (binary image)
///
/// `time` is an opaque cache-busting value passed through as is.
pub fn camera_proxy(entity_id: &str, time: Option<&str>) -> InputResult<ApiRequest> {
    require("entity_id", entity_id)?;
    Ok(ApiRequest::get(format!("camera_proxy/{}", entity_id))
        .with_query(QueryString::new().param_opt("time", time)))
}

/// `GET /api/calendars`
pub fn calendars() -> ApiRequest {
    ApiRequest::get("calendars")
}

/// `GET /api/calendars/{entity_id}?start=...&end=...`
pub fn calendar_events(entity_id: &str, start: &str, end: &str) -> InputResult<ApiRequest> {
    require("entity_id", entity_id)?;
    require("start", start)?;
    require("end", end)?;
    Ok(ApiRequest::get(format!("calendars/{}", entity_id))
        .with_query(QueryString::new().param("start", start).param("end", end)))
}

#[derive(Serialize)]
struct TemplateBody<'a> {
    template: &'a str,
}

/// `POST /api/template` with `{"template": ...}`
pub fn render_template(template: &str) -> InputResult<ApiRequest> {
    require("template", template)?;
    let body = encode("template", &TemplateBody { template })?;
    Ok(ApiRequest::post("template", Some(body)))
}

/// Parameters for a service invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceCall {
    /// Explicit domain; derived from `entity_id` when absent
    pub domain: Option<String>,
    pub service: String,
    pub entity_id: Option<String>,
    /// Extra service data sent alongside `entity_id`
    pub data: Map<String, Value>,
}

impl ServiceCall {
    /// Create a call for `service`, with the domain taken from the entity id
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Add a service data field (e.g. `brightness`)
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Domain the call is routed to
    ///
    /// An explicit domain wins; otherwise the part of the entity id before
    /// the first `.` is used. The entity id is not validated further.
    pub fn resolved_domain(&self) -> InputResult<&str> {
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            return Ok(domain);
        }
        self.entity_id
            .as_deref()
            .and_then(|id| id.split_once('.'))
            .map(|(domain, _)| domain)
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| InputError::MissingDomain {
                service: self.service.clone(),
            })
    }
}

#[derive(Serialize)]
struct ServiceBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_id: Option<&'a str>,
    #[serde(flatten)]
    data: &'a Map<String, Value>,
}

/// `POST /api/services/{domain}/{service}`
///
/// The body carries `entity_id` (plus any extra data) when given, and is
/// omitted entirely otherwise.
pub fn call_service(call: &ServiceCall) -> InputResult<ApiRequest> {
    require("service", &call.service)?;
    let domain = call.resolved_domain()?;

    let mut data = call.data.clone();
    if call.entity_id.is_some() {
        data.remove("entity_id");
    }

    let body = if call.entity_id.is_none() && data.is_empty() {
        None
    } else {
        Some(encode(
            "service_data",
            &ServiceBody {
                entity_id: call.entity_id.as_deref(),
                data: &data,
            },
        )?)
    };

    Ok(ApiRequest::post(
        format!("services/{}/{}", domain, call.service),
        body,
    ))
}

/// New state for an entity, written as-is by the server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChange {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl StateChange {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: None,
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// `POST /api/states/{entity_id}` with `{"state": ..., "attributes": ...}`
pub fn set_state(entity_id: &str, change: &StateChange) -> InputResult<ApiRequest> {
    require("entity_id", entity_id)?;
    let body = encode("state", change)?;
    Ok(ApiRequest::post(format!("states/{}", entity_id), Some(body)))
}

/// Filters for `GET /api/history/period`
///
/// Timestamps are sent verbatim. Use the `Z` suffix for UTC or
/// percent-encode the offset (`%2B01:00`): a literal `+` reaches the
/// server as a space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub filter_entity_ids: Vec<String>,
    pub minimal_response: bool,
    pub no_attributes: bool,
    pub significant_changes_only: bool,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.filter_entity_ids.push(entity_id.into());
        self
    }

    pub fn minimal_response(mut self) -> Self {
        self.minimal_response = true;
        self
    }

    pub fn no_attributes(mut self) -> Self {
        self.no_attributes = true;
        self
    }

    pub fn significant_changes_only(mut self) -> Self {
        self.significant_changes_only = true;
        self
    }
}

/// `GET /api/history/period[/{start_time}]`
///
/// Query order: `end_time`, `filter_entity_id`, `minimal_response`,
/// `no_attributes`, `significant_changes_only`.
pub fn history(query: &HistoryQuery) -> ApiRequest {
    let path = match query.start_time.as_deref() {
        Some(start) => format!("history/period/{}", start),
        None => "history/period".to_string(),
    };

    let filter = (!query.filter_entity_ids.is_empty()).then(|| query.filter_entity_ids.join(","));

    ApiRequest::get(path).with_query(
        QueryString::new()
            .param_opt("end_time", query.end_time.as_deref())
            .param_opt("filter_entity_id", filter.as_deref())
            .flag("minimal_response", query.minimal_response)
            .flag("no_attributes", query.no_attributes)
            .flag("significant_changes_only", query.significant_changes_only),
    )
}

/// Filters for `GET /api/logbook`
///
/// Timestamps follow the same rules as [`HistoryQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogbookQuery {
    pub start_time: Option<String>,
    pub entity: Option<String>,
    pub end_time: Option<String>,
}

impl LogbookQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity = Some(entity_id.into());
        self
    }

    pub fn end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }
}

/// `GET /api/logbook[/{start_time}]`, query order `entity`, `end_time`
pub fn logbook(query: &LogbookQuery) -> ApiRequest {
    let path = match query.start_time.as_deref() {
        Some(start) => format!("logbook/{}", start),
        None => "logbook".to_string(),
    };

    ApiRequest::get(path).with_query(
        QueryString::new()
            .param_opt("entity", query.entity.as_deref())
            .param_opt("end_time", query.end_time.as_deref()),
    )
}

fn require(field: &'static str, value: &str) -> InputResult<()> {
    if value.trim().is_empty() {
        return Err(InputError::EmptyField { field });
    }
    Ok(())
}

fn encode<T: Serialize>(field: &'static str, value: &T) -> InputResult<String> {
    serde_json::to_string(value).map_err(|e| InputError::InvalidValue {
        field,
        reason: e.to_string(),
    })
}

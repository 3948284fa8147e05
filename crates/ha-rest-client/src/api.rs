//! Endpoint operations on a connected session
//!
//! Each operation builds its request with `ha_rest_core::endpoints`, so
//! invalid parameters are rejected before the connection is checked, and
//! then runs it through the session's dispatcher.

use std::io::{BufWriter, Write};
use std::path::Path;

use ha_rest_core::endpoints::{self, HistoryQuery, LogbookQuery, ServiceCall, StateChange};
use ha_rest_core::models::{Calendar, ConfigCheck, EntityState, EventListener, ServiceDomain};
use ha_rest_core::ServerInfo;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use crate::transport::Transport;

/// Approval for a state write
///
/// `POST /api/states/{entity_id}` overwrites the state the server holds
/// without any validation, so [`Session::set_state`] asks for approval
/// before sending. `true`/`false` act as fixed answers; closures can
/// inspect the pending change.
pub trait Confirm {
    fn confirm(&self, entity_id: &str, change: &StateChange) -> bool;
}

impl Confirm for bool {
    fn confirm(&self, _entity_id: &str, _change: &StateChange) -> bool {
        *self
    }
}

impl<F> Confirm for F
where
    F: Fn(&str, &StateChange) -> bool,
{
    fn confirm(&self, entity_id: &str, change: &StateChange) -> bool {
        self(entity_id, change)
    }
}

/// Outcome of [`Session::set_state`]
#[derive(Debug, Clone, PartialEq)]
pub enum StateWrite {
    /// The server accepted the write and returned the new state
    Applied(Value),
    /// Approval was withheld; nothing was sent
    Declined,
}

impl<T: Transport> Session<T> {
    /// `GET /api/` - the server greeting
    pub fn server_status(&self) -> ClientResult<ServerInfo> {
        self.dispatch(&endpoints::server_status())?.deserialize()
    }

    /// `GET /api/config` - core configuration (location, units, version...)
    pub fn config(&self) -> ClientResult<Value> {
        Ok(self.dispatch(&endpoints::config())?.into_json())
    }

    /// `GET /api/components` - loaded integrations
    pub fn components(&self) -> ClientResult<Vec<String>> {
        self.dispatch(&endpoints::components())?.deserialize()
    }

    /// `POST /api/config/core/check_config`
    pub fn check_config(&self) -> ClientResult<ConfigCheck> {
        self.dispatch(&endpoints::check_config())?.deserialize()
    }

    /// `GET /api/events` - event types and their listener counts
    pub fn events(&self) -> ClientResult<Vec<EventListener>> {
        self.dispatch(&endpoints::events())?.deserialize()
    }

    /// `POST /api/events/{event_type}`
    #[instrument(skip(self, data))]
    pub fn fire_event(&self, event_type: &str, data: Option<&Value>) -> ClientResult<Value> {
        let request = endpoints::fire_event(event_type, data)?;
        Ok(self.dispatch(&request)?.into_json())
    }

    /// `GET /api/services` - services grouped by domain
    pub fn services(&self) -> ClientResult<Vec<ServiceDomain>> {
        self.dispatch(&endpoints::services())?.deserialize()
    }

    /// `POST /api/services/{domain}/{service}`
    ///
    /// Returns the states that changed while the service ran.
    #[instrument(skip(self, call), fields(service = %call.service))]
    pub fn call_service(&self, call: &ServiceCall) -> ClientResult<Value> {
        let request = endpoints::call_service(call)?;
        Ok(self.dispatch(&request)?.into_json())
    }

    /// `GET /api/states`
    pub fn states(&self) -> ClientResult<Vec<EntityState>> {
        self.dispatch(&endpoints::states(None)?)?.deserialize()
    }

    /// `GET /api/states/{entity_id}`
    pub fn state(&self, entity_id: &str) -> ClientResult<EntityState> {
        self.dispatch(&endpoints::states(Some(entity_id))?)?
            .deserialize()
    }

    /// `POST /api/states/{entity_id}`, sent only once `confirm` approves
    #[instrument(skip(self, change, confirm))]
    pub fn set_state(
        &self,
        entity_id: &str,
        change: &StateChange,
        confirm: impl Confirm,
    ) -> ClientResult<StateWrite> {
        let request = endpoints::set_state(entity_id, change)?;
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if !confirm.confirm(entity_id, change) {
            info!(entity_id, "State write declined");
            return Ok(StateWrite::Declined);
        }
        Ok(StateWrite::Applied(self.dispatch(&request)?.into_json()))
    }

    /// `GET /api/history/period[/{start_time}]`
    pub fn history(&self, query: &HistoryQuery) -> ClientResult<Value> {
        Ok(self.dispatch(&endpoints::history(query))?.into_json())
    }

    /// `GET /api/logbook[/{start_time}]`
    pub fn logbook(&self, query: &LogbookQuery) -> ClientResult<Value> {
        Ok(self.dispatch(&endpoints::logbook(query))?.into_json())
    }

    /// `GET /api/error_log` - the server log as plain text
    pub fn error_log(&self) -> ClientResult<String> {
        Ok(self.dispatch(&endpoints::error_log())?.into_text())
    }

    /// `POST /api/template` - render a template on the server
    pub fn render_template(&self, template: &str) -> ClientResult<String> {
        let request = endpoints::render_template(template)?;
        Ok(self.dispatch(&request)?.into_text())
    }

    /// `GET /api/calendars`
    pub fn calendars(&self) -> ClientResult<Vec<Calendar>> {
        self.dispatch(&endpoints::calendars())?.deserialize()
    }

    /// `GET /api/calendars/{entity_id}?start=...&end=...`
    pub fn calendar_events(&self, entity_id: &str, start: &str, end: &str) -> ClientResult<Value> {
        let request = endpoints::calendar_events(entity_id, start, end)?;
        Ok(self.dispatch(&request)?.into_json())
    }

    /// `GET /api/camera_proxy/{entity_id}`, saving the image to `path`
    ///
    /// `time`, when given, is sent as the `time` query parameter. The image
    /// is streamed into a uniquely named temporary file in the same
    /// directory, which replaces `path` only once the download completes.
    /// On failure `path` and its neighbours are left as they were. Returns
    /// the bytes written.
    #[instrument(skip(self, path))]
    pub fn camera_proxy(
        &self,
        entity_id: &str,
        time: Option<&str>,
        path: impl AsRef<Path>,
    ) -> ClientResult<u64> {
        let path = path.as_ref();
        let request = endpoints::camera_proxy(entity_id, time)?;
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let io_err = |source| ClientError::Io {
            path: Some(path.to_path_buf()),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Dropping the temporary file on any early return removes it
        let mut partial = NamedTempFile::new_in(dir).map_err(io_err)?;
        let bytes = {
            let mut writer = BufWriter::new(partial.as_file_mut());
            let bytes = self.download(&request, &mut writer).map_err(|err| match err {
                ClientError::Io { path: None, source } => io_err(source),
                other => other,
            })?;
            writer.flush().map_err(io_err)?;
            bytes
        };
        partial.persist(path).map_err(|err| io_err(err.error))?;

        debug!(bytes, "Saved camera image");
        Ok(bytes)
    }
}

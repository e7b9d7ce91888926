use std::{
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use percent_encoding::percent_decode_str;
use tauri::{
    http::{header::CONTENT_TYPE, Request, Response, StatusCode},
    AppHandle, Manager, Runtime,
};
use thiserror::Error;

use crate::{
    lockdown::{self, KeyBlockerProcess},
    main_window,
    process_control::SpawnError,
    unsaved_state::{self, UnsavedStateDescriptor, UnsavedStateError},
    AppContext, APP_PROTOCOL_HOST, EXAM_OFF_MARKER, EXAM_ON_MARKER, SET_UNSAVED_MARKER,
};

#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error("malformed unsaved-state payload: {0}")]
    Unsaved(#[from] UnsavedStateError),
    #[error("resource path is not valid UTF-8 after decoding: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("resource path {0:?} escapes the resource directory")]
    OutsideBase(String),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ResourceRequest<'a> {
    pub(crate) scheme: &'a str,
    pub(crate) raw_url: &'a str,
}

/// What a request on the app scheme asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProtocolMessage {
    Resource(PathBuf),
    EnterLockdown,
    ExitLockdown,
    SetUnsavedState(Option<UnsavedStateDescriptor>),
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// Drops `scheme://` (or the `http://scheme.localhost/` form some webviews
/// use) and the canonical host, leaving the resource-relative payload.
pub(crate) fn strip_scheme_prefix<'a>(raw_url: &'a str, scheme: &str) -> &'a str {
    let rest = [
        format!("http://{scheme}.{APP_PROTOCOL_HOST}/"),
        format!("https://{scheme}.{APP_PROTOCOL_HOST}/"),
        format!("{scheme}://"),
        format!("{scheme}:"),
    ]
    .iter()
    .find_map(|prefix| strip_prefix_ignore_case(raw_url, prefix))
    .unwrap_or(raw_url);

    let rest = strip_prefix_ignore_case(rest, APP_PROTOCOL_HOST)
        .filter(|after_host| after_host.is_empty() || after_host.starts_with('/'))
        .unwrap_or(rest);
    rest.trim_start_matches('/')
}

fn contains_ignore_case(haystack: &str, marker: &str) -> bool {
    haystack
        .to_ascii_uppercase()
        .contains(&marker.to_ascii_uppercase())
}

pub(crate) fn decode_request(
    request: ResourceRequest<'_>,
    base_dir: &Path,
) -> Result<ProtocolMessage, ResolveError> {
    let payload = strip_scheme_prefix(request.raw_url, request.scheme);

    if contains_ignore_case(payload, EXAM_ON_MARKER) {
        return Ok(ProtocolMessage::EnterLockdown);
    }
    if contains_ignore_case(payload, EXAM_OFF_MARKER) {
        return Ok(ProtocolMessage::ExitLockdown);
    }
    if contains_ignore_case(payload, SET_UNSAVED_MARKER) {
        let encoded = payload.split_once('=').map_or("", |(_, value)| value);
        let descriptor = unsaved_state::parse_unsaved_payload(encoded)?;
        return Ok(ProtocolMessage::SetUnsavedState(descriptor));
    }

    let path_part = payload.split(['?', '#']).next().unwrap_or_default();
    let relative = percent_decode_str(path_part).decode_utf8()?;
    resolve_resource_path(base_dir, &relative).map(ProtocolMessage::Resource)
}

/// Lexically normalizes `relative` under `base_dir`. Paths that would climb
/// above `base_dir` are rejected rather than clamped.
pub(crate) fn resolve_resource_path(
    base_dir: &Path,
    relative: &str,
) -> Result<PathBuf, ResolveError> {
    let mut resolved = base_dir.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir if depth > 0 => {
                resolved.pop();
                depth -= 1;
            }
            Component::ParentDir | Component::Prefix(_) => {
                return Err(ResolveError::OutsideBase(relative.to_string()));
            }
        }
    }

    Ok(resolved)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("mp3") => "audio/mpeg",
        Some("ggb") => "application/vnd.geogebra.file",
        _ => "application/octet-stream",
    }
}

fn respond(status: StatusCode, content_type: &str, body: Vec<u8>) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .unwrap_or_else(|error| {
            tracing::error!(%error, "failed to build protocol response");
            let mut fallback = Response::new(Vec::new());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

fn empty(status: StatusCode) -> Response<Vec<u8>> {
    respond(status, "text/plain", Vec::new())
}

fn serve_file(path: &Path) -> Response<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => {
            tracing::debug!(path = %path.display(), "file is to be loaded");
            respond(StatusCode::OK, content_type_for(path), bytes)
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "requested resource not found");
            empty(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!(%error, path = %path.display(), "failed to read resource");
            empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Applies a control signal to the shared state and returns the kiosk mode the
/// window has to switch to, if any.
pub(crate) fn apply_control<S>(
    context: &AppContext,
    message: ProtocolMessage,
    spawn_key_blocker: S,
) -> Option<bool>
where
    S: FnOnce() -> Result<KeyBlockerProcess, SpawnError>,
{
    match message {
        ProtocolMessage::Resource(_) => None,
        ProtocolMessage::EnterLockdown => {
            context.lockdown().enter(spawn_key_blocker);
            Some(true)
        }
        ProtocolMessage::ExitLockdown => {
            if context.lockdown().exit() {
                tracing::debug!("key blocker released");
            }
            Some(false)
        }
        ProtocolMessage::SetUnsavedState(descriptor) => {
            context.lifecycle().set_unsaved(descriptor);
            None
        }
    }
}

pub(crate) fn apply_message<R: Runtime>(
    app_handle: &AppHandle<R>,
    context: &AppContext,
    message: ProtocolMessage,
) -> Response<Vec<u8>> {
    if let ProtocolMessage::Resource(path) = &message {
        return serve_file(path);
    }
    if let Some(kiosk) = apply_control(context, message, lockdown::spawn_key_blocker) {
        main_window::set_kiosk(app_handle, kiosk);
    }
    empty(StatusCode::NO_CONTENT)
}

pub(crate) fn handle_protocol_request<R: Runtime>(
    app_handle: &AppHandle<R>,
    scheme: &str,
    request: &Request<Vec<u8>>,
) -> Response<Vec<u8>> {
    let Some(context) = app_handle.try_state::<AppContext>() else {
        tracing::error!("protocol request before application context was ready");
        return empty(StatusCode::SERVICE_UNAVAILABLE);
    };

    let raw_url = request.uri().to_string();
    let resource_request = ResourceRequest {
        scheme,
        raw_url: &raw_url,
    };
    match decode_request(resource_request, &context.resource_dir) {
        Ok(message) => apply_message(app_handle, &context, message),
        Err(error @ ResolveError::OutsideBase(_)) => {
            tracing::warn!(%error, "rejected resource request");
            empty(StatusCode::FORBIDDEN)
        }
        Err(error) => {
            tracing::warn!(%error, url = %raw_url, "ignoring malformed protocol request");
            empty(StatusCode::BAD_REQUEST)
        }
    }
}

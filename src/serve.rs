//! HTTP server for interactive filtering mode
//!
//! `cinefacet serve movies.csv` → loads the dataset, opens the browser, and
//! drives one [`Session`] from the embedded UI.
//!
//! Requests are handled one at a time on the accept loop, which owns the
//! session outright. Every state-changing endpoint answers with a fresh
//! [`Refresh`] so the UI redraws from a single response.

use crate::engine::Availability;
use crate::error::{Error, Result};
use crate::facet::{Facet, NumericFacet};
use crate::report::Summary;
use crate::session::{Action, Session, StateView};
use crate::view::{GroupMode, SizeMetric, SortColumn, SortOrder, TableQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use tiny_http::{Header, Method, Request, Response, Server};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(error: impl ToString) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Everything the UI needs after a change.
#[derive(Serialize)]
pub struct Refresh<'a> {
    pub state: StateView<'a>,
    pub availability: Availability,
    pub extents: BTreeMap<NumericFacet, Option<(f64, f64)>>,
    pub summary: Summary,
}

impl<'a> Refresh<'a> {
    fn build(availability: Availability, session: &'a Session) -> Self {
        Self {
            state: session.state_view(),
            availability,
            extents: NumericFacet::ALL
                .iter()
                .map(|&f| (f, session.numeric_extent(f)))
                .collect(),
            summary: session.summary(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct PickerParams {
    facet: Facet,
    #[serde(default)]
    search: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ColumnParams {
    facet: Facet,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct MovieParams {
    sort: Option<SortColumn>,
    order: Option<SortOrder>,
    page: Option<usize>,
    per_page: Option<usize>,
    metric: Option<SizeMetric>,
}

impl MovieParams {
    fn query(&self) -> TableQuery {
        let defaults = TableQuery::default();
        TableQuery {
            sort: self.sort.unwrap_or(defaults.sort),
            order: self.order.unwrap_or(defaults.order),
            page: self.page.unwrap_or(1),
            // Zero defers to the configured page size
            per_page: self.per_page.unwrap_or(0),
            metric: self.metric.unwrap_or(defaults.metric),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct HierarchyParams {
    mode: GroupMode,
    size: SizeMetric,
}

/// Start server, open browser, serve UI
pub fn start(port: u16, mut session: Session, open_browser: bool) -> Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let url = format!("http://localhost:{}", port);

    eprintln!("\n\x1b[1;32m🎬 cinefacet\x1b[0m");
    eprintln!("   {}", url);
    eprintln!(
        "   {} movies, {} distinct titles\n",
        session.dataset().len(),
        session.dataset().unique_titles()
    );

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &mut session) {
            tracing::error!(error = %e, "request failed");
        }
    }

    Ok(())
}

fn handle_request(mut request: Request, session: &mut Session) -> Result<()> {
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, q),
        None => (url.as_str(), ""),
    };
    let method = request.method().clone();
    tracing::debug!(%method, path, "request");

    match (&method, path) {
        // Serve embedded UI
        (&Method::Get, "/") => {
            let response = with_content_type(Response::from_string(UI_HTML), "text/html; charset=utf-8");
            request.respond(response)?;
            Ok(())
        }

        (&Method::Get, "/api/state") => {
            let availability = session.availability();
            respond(request, &Refresh::build(availability, session))
        }

        (&Method::Post, "/api/action") => {
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body)?;
            let applied = serde_json::from_str::<Action>(&body)
                .map_err(Error::from)
                .and_then(|action| {
                    tracing::info!(action = %action, "action");
                    session.apply(action)
                });
            match applied {
                Ok(()) => {
                    let availability = session.availability();
                    respond(request, &Refresh::build(availability, session))
                }
                Err(e) => respond_error(request, 400, e),
            }
        }

        (&Method::Post, "/api/undo") | (&Method::Post, "/api/redo") => {
            let changed = if path == "/api/undo" {
                session.undo()
            } else {
                session.redo()
            };
            tracing::info!(path, changed, "history");
            let availability = session.availability();
            respond(request, &Refresh::build(availability, session))
        }

        (&Method::Post, "/api/gesture/begin") => {
            session.begin_gesture();
            respond(request, &())
        }

        (&Method::Post, "/api/gesture/end") => {
            session.end_gesture();
            let availability = session.availability();
            respond(request, &Refresh::build(availability, session))
        }

        (&Method::Get, "/api/available") => {
            let availability = session.availability();
            respond(request, &availability)
        }

        (&Method::Get, "/api/picker") => match serde_urlencoded::from_str::<PickerParams>(query) {
            Ok(params) => {
                let entries = session.picker(params.facet, params.search.as_deref());
                respond(request, &entries)
            }
            Err(e) => respond_error(request, 400, Error::from(e)),
        },

        (&Method::Get, "/api/movies") => match serde_urlencoded::from_str::<MovieParams>(query) {
            Ok(params) => {
                let page = session.table(&params.query());
                respond(request, &page)
            }
            Err(e) => respond_error(request, 400, Error::from(e)),
        },

        (&Method::Get, "/api/columns") => match serde_urlencoded::from_str::<ColumnParams>(query) {
            Ok(params) => {
                let values = session.column_values(params.facet);
                respond(request, &values)
            }
            Err(e) => respond_error(request, 400, Error::from(e)),
        },

        (&Method::Get, "/api/hierarchy") => match serde_urlencoded::from_str::<HierarchyParams>(query) {
            Ok(params) => {
                let hierarchy = session.hierarchy(params.mode, params.size);
                let legend = session.size_legend(params.size);
                respond(
                    request,
                    &serde_json::json!({ "hierarchy": hierarchy, "legend": legend }),
                )
            }
            Err(e) => respond_error(request, 400, Error::from(e)),
        },

        (&Method::Get, "/api/summary") => {
            let summary = session.summary();
            respond(request, &summary)
        }

        // 404
        _ => {
            let response = Response::from_string("Not found").with_status_code(404);
            request.respond(response)?;
            Ok(())
        }
    }
}

fn with_content_type<R: Read>(response: Response<R>, value: &str) -> Response<R> {
    match Header::from_bytes(&b"Content-Type"[..], value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn respond<T: Serialize>(request: Request, data: &T) -> Result<()> {
    let json = serde_json::to_string(&ApiResponse::success(data))?;
    let response = with_content_type(Response::from_string(json), "application/json");
    request.respond(response)?;
    Ok(())
}

fn respond_error(request: Request, status: u16, error: Error) -> Result<()> {
    tracing::warn!(error = %error, "rejected request");
    let json = serde_json::to_string(&ApiResponse::failure(&error))?;
    let response = with_content_type(Response::from_string(json).with_status_code(status), "application/json");
    request.respond(response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // QUERY STRING TESTS
    // ==========================================================================
    //
    // The UI builds plain query strings; these pin the names it relies on.
    // ==========================================================================

    #[test]
    fn test_movie_params_defaults() {
        let params: MovieParams = serde_urlencoded::from_str("").unwrap();
        let q = params.query();
        assert_eq!(q.sort, SortColumn::Year);
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 0);
    }

    #[test]
    fn test_movie_params_parse() {
        let params: MovieParams = serde_urlencoded::from_str("sort=budget&order=asc&page=3&per_page=25").unwrap();
        let q = params.query();
        assert_eq!(q.sort, SortColumn::Budget);
        assert_eq!(q.order, SortOrder::Asc);
        assert_eq!(q.page, 3);
        assert_eq!(q.per_page, 25);
    }

    #[test]
    fn test_picker_params() {
        let params: PickerParams = serde_urlencoded::from_str("facet=production&search=warner").unwrap();
        assert_eq!(params.facet, Facet::Production);
        assert_eq!(params.search.as_deref(), Some("warner"));
        assert!(serde_urlencoded::from_str::<PickerParams>("search=x").is_err());
    }

    #[test]
    fn test_column_params() {
        let params: ColumnParams = serde_urlencoded::from_str("facet=note").unwrap();
        assert_eq!(params.facet, Facet::Note);
        assert!(serde_urlencoded::from_str::<ColumnParams>("facet=budget").is_err());
    }

    #[test]
    fn test_column_values_serialize_as_strings() {
        use crate::config::Config;
        use crate::dataset::fixtures::sample;
        use std::sync::Arc;

        let session = Session::new(Arc::new(sample()), Config::default());
        let json = serde_json::to_value(session.column_values(Facet::Note)).unwrap();
        assert_eq!(json, serde_json::json!(["8.4", "7.9", "7.7"]));
    }

    #[test]
    fn test_hierarchy_params() {
        let params: HierarchyParams = serde_urlencoded::from_str("mode=production&size=vote_average").unwrap();
        assert_eq!(params.mode, GroupMode::Production);
        assert_eq!(params.size, SizeMetric::VoteAverage);
    }

    #[test]
    fn test_api_response_shape() {
        let ok = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(ok, serde_json::json!({ "ok": true, "data": 3, "error": null }));
        let err = serde_json::to_value(ApiResponse::failure("bad")).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"], "bad");
    }

    #[test]
    fn test_refresh_serializes() {
        use crate::config::Config;
        use crate::dataset::fixtures::sample;
        use std::sync::Arc;

        let mut session = Session::new(Arc::new(sample()), Config::default());
        let availability = session.availability();
        let json = serde_json::to_value(Refresh::build(availability, &session)).unwrap();
        assert_eq!(json["summary"]["total"], 6);
        assert_eq!(json["extents"]["budget"], serde_json::json!([0.0, 175000000.0]));
        assert!(json["availability"]["genre"].is_array());
    }

    #[test]
    fn test_ui_is_embedded() {
        assert!(UI_HTML.contains("/api/action"));
        assert!(UI_HTML.contains("/api/columns"));
    }
}

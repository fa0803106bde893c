//! cinefacet - Cross-filtering facet engine for movie datasets
//!
//! cinefacet loads a movie metadata CSV (title, genres, production
//! companies, release year, vote average, popularity, budget, revenue,
//! runtime) and answers the questions a faceted explorer asks on every
//! click: which movies pass the current filters, and which values of each
//! facet are still reachable.
//!
//! # Overview
//!
//! Five categorical facets (genre, production, title, year, note) each carry
//! a selected set, an excluded set and, for the multi-valued ones, a strict
//! (AND) flag. Popularity, budget and revenue take one numeric constraint
//! each. A record passes when it passes every active constraint. A missing
//! year is a wildcard for the year range only: it still fails a year
//! selection, and a missing numeric field fails any numeric filter.
//!
//! Availability of a facet is computed with that facet's own constraints
//! ignored, so picking "Drama" never hides "Comedy" from the genre list.
//!
//! # Quick Start
//!
//! ```no_run
//! use cinefacet::{load_csv, Action, Config, Facet, Session};
//! use std::sync::Arc;
//!
//! let dataset = load_csv("movies.csv")?;
//! let mut session = Session::new(Arc::new(dataset), Config::default());
//!
//! session.apply(Action::Select {
//!     facet: Facet::Genre,
//!     value: "Drama".to_string(),
//! })?;
//! println!("{} movies", session.filtered().len());
//! println!("{:?}", session.available(Facet::Production));
//!
//! session.undo();
//! # Ok::<(), cinefacet::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`facet`]: facet identifiers, typed values and the mutable [`FacetState`]
//! - [`engine`]: record evaluation and availability
//! - [`history`]: snapshot undo/redo
//! - [`session`]: one user's state, history and view queries
//! - [`view`]: table, picker and hierarchy projections
//! - [`report`]: output formatters (JSON, CSV)
//! - [`serve`]: local HTTP UI

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod facet;
pub mod history;
pub mod report;
pub mod serve;
pub mod session;
pub mod view;

pub use config::Config;
pub use dataset::{load_csv, Dataset, MovieRecord};
pub use engine::{available, evaluate, Availability};
pub use error::{Error, Result};
pub use facet::{Facet, FacetState, FacetValue, NumericFacet, NumericFilter};
pub use history::History;
pub use session::{Action, Session};

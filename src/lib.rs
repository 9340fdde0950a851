//! # DirVis-RS: dataflow processing for scientific visualization
//!
//! A processing network of algorithms connected output-to-input. Datasets
//! are injected at the sources, a background scheduler re-runs whatever
//! became dirty in topological order, and visualizations at the sinks are
//! drawn once per frame by the display surface.
//!
//! ## Architecture
//!
//! - **Network**: graph registry, validation and the scheduler thread
//! - **Algorithms**: data injection, normal estimation, renderers
//! - **Commands**: background work with status observers, delivered to the
//!   UI thread through an event queue
//! - **Communication**: Crossbeam channels for wake-ups and status events
//!
//! ## Configuration
//!
//! Settings are stored in the platform-appropriate data directory under
//! `dev.dirvis.dirvis-rs`; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use dirvis_rs::algorithms::{DataInject, RenderTriangles};
//! use dirvis_rs::network::{shared, ProcessingNetwork};
//! use dirvis_rs::types::{demo, TriangleDataSet};
//!
//! let network = ProcessingNetwork::default();
//! let inject = DataInject::of::<TriangleDataSet>();
//! let injector = inject.injector();
//! let source = network.add_algorithm(shared(inject))?;
//! let render = network.add_algorithm(shared(RenderTriangles::new()))?;
//! network.connect(source, "Data", render, "Triangles")?;
//! network.start()?;
//!
//! injector.inject_value(demo::wave_surface(64))?;
//! network.visit_visualizations(|vis| {
//!     vis.update();
//!     vis.render();
//! });
//! ```

pub mod algorithms;
pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod types;

pub use error::{DirVisError, Result};

//! Paper configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_graph::CellId;

use crate::error::{Error, Result};

/// How cell views are ordered inside their layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sorting {
    /// Node order matches the graph's z order whenever a resort runs.
    Exact,
    /// Nodes are bucketed by z behind pivot comments; order within a bucket is insertion order.
    #[default]
    Approx,
    /// Nodes are appended in render order.
    None,
}

impl FromStr for Sorting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "approx" | "approximate" => Ok(Self::Approx),
            "none" => Ok(Self::None),
            other => Err(Error::InvalidOptions {
                reason: format!("unknown sorting mode `{other}`"),
            }),
        }
    }
}

impl fmt::Display for Sorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sorting::Exact => "exact",
            Sorting::Approx => "approx",
            Sorting::None => "none",
        })
    }
}

/// Connector used by links that do not name one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultConnector {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl Default for DefaultConnector {
    fn default() -> Self {
        Self {
            name: "normal".to_string(),
            args: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaperOptions {
    pub sorting: Sorting,
    /// Start frozen: nothing is flushed until the first `unfreeze`.
    pub frozen: bool,
    pub grid_size: f64,
    pub draw_grid: bool,
    pub width: f64,
    pub height: f64,
    pub default_connector: DefaultConnector,
}

impl Default for PaperOptions {
    fn default() -> Self {
        Self {
            sorting: Sorting::Approx,
            frozen: false,
            grid_size: 1.0,
            draw_grid: false,
            width: 800.0,
            height: 600.0,
            default_connector: DefaultConnector::default(),
        }
    }
}

impl PaperOptions {
    pub fn from_json(value: Value) -> Result<Self> {
        let opts: Self = serde_json::from_value(value).map_err(|e| Error::InvalidOptions {
            reason: e.to_string(),
        })?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidOptions {
            reason: e.to_string(),
        })?;
        Self::from_json(value)
    }

    pub fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    pub fn with_default_connector(mut self, name: &str, args: Value) -> Self {
        self.default_connector = DefaultConnector {
            name: name.to_string(),
            args,
        };
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(Error::InvalidOptions {
                reason: format!("gridSize must be positive, got {}", self.grid_size),
            });
        }
        if !(self.width >= 0.0 && self.height >= 0.0) {
            return Err(Error::InvalidOptions {
                reason: "width and height must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-request scheduling options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Do not propagate the update to connected links.
    pub isolate: bool,
    /// The request comes from mounting a view.
    pub mounting: bool,
}

impl UpdateOptions {
    pub fn isolated() -> Self {
        Self {
            isolate: true,
            ..Self::default()
        }
    }
}

pub type ProgressFn = Box<dyn FnMut(bool, usize, usize)>;

/// Options of [`crate::Paper::unfreeze`].
#[derive(Default)]
pub struct UnfreezeOptions {
    pub key: Option<String>,
    /// Process at most this many updates per [`crate::Paper::tick`].
    pub batch_size: Option<usize>,
    /// Called after every chunk with `(done, processed, total)`.
    pub progress: Option<ProgressFn>,
}

impl UnfreezeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size.max(1));
        self
    }

    pub fn progress(mut self, f: impl FnMut(bool, usize, usize) + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for UnfreezeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnfreezeOptions")
            .field("key", &self.key)
            .field("batch_size", &self.batch_size)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Host callbacks around flushes.
#[derive(Default)]
pub struct PaperHooks {
    pub before_render: Option<Box<dyn FnMut()>>,
    pub after_render: Option<Box<dyn FnMut(&crate::RenderStats)>>,
    pub on_view_error: Option<Box<dyn FnMut(&CellId, &Error)>>,
}

impl fmt::Debug for PaperHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaperHooks")
            .field("before_render", &self.before_render.is_some())
            .field("after_render", &self.after_render.is_some())
            .field("on_view_error", &self.on_view_error.is_some())
            .finish()
    }
}

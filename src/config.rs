//! YAML-backed sign settings. Every key has a default so a partial document
//! (or none at all) yields a working 32x32 sign showing the default text.

use std::path::Path;

use serde::Deserialize;

use crate::disc::{RingLayout, Sampling, DEFAULT_ELEMENT_TOTAL};
use crate::error::Error;
use crate::filter::Filter;
use crate::generators::{AnimationOptions, EffectOptions, TextStyle};
use crate::reshape::Topology;
use crate::tasks::producer::LoopPolicy;
use crate::transform::{TransformOptions, Transpose, ZoomOptions};
use crate::transition::TransitionOptions;

/// What content the sign shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Text,
    File,
    Waving,
    Glitch,
    Rainbow,
    Pattern,
}

/// One ring of a disc layout as written in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RingSpec {
    pub radius: f32,
    pub count: usize,
}

/// Physical wiring description.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum TopologySettings {
    #[default]
    Plain,
    Chain {
        panels: u32,
    },
    Disc {
        /// Explicit ring table; omitted means the stock 255-element disc.
        #[serde(default)]
        rings: Option<Vec<RingSpec>>,
        #[serde(default = "default_elements")]
        elements: usize,
        #[serde(default)]
        sampling: Sampling,
    },
}

fn default_elements() -> usize {
    DEFAULT_ELEMENT_TOTAL
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct SignSettings {
    pub rows: u32,
    pub cols: u32,
    pub topology: TopologySettings,
    /// Global brightness, 0-255; 255 leaves pixels untouched.
    pub brightness: u8,
    pub transpose: Transpose,
    /// Arbitrary clockwise rotation in degrees, applied after transpose.
    pub rotate: f32,
    pub zoom: Option<ZoomOptions>,
    /// Stretch to fill instead of preserving aspect ratio.
    pub fit: bool,
    /// Pixels reserved as a black border on every edge.
    pub underscan: u32,
    /// Play sequences forward then backward instead of wrapping.
    pub back_and_forth: bool,
    /// Play sequences a single time, then hold the last frame off-queue.
    pub no_loop: bool,
    /// Frames the producer keeps buffered ahead of playback.
    pub queue_target_depth: usize,
    pub mode: Mode,
    pub text: TextStyle,
    pub animation: EffectOptions,
    pub file: AnimationOptions,
    /// Recolor pass over rendered frames.
    pub filter: Filter,
    /// Bridge frames played once when new content replaces the old.
    pub transition: TransitionOptions,
}

impl Default for SignSettings {
    fn default() -> Self {
        Self {
            rows: 32,
            cols: 32,
            topology: TopologySettings::Plain,
            brightness: 255,
            transpose: Transpose::None,
            rotate: 0.0,
            zoom: None,
            fit: false,
            underscan: 0,
            back_and_forth: false,
            no_loop: false,
            queue_target_depth: 20,
            mode: Mode::Text,
            text: TextStyle::default(),
            animation: EffectOptions::default(),
            file: AnimationOptions::default(),
            filter: Filter::default(),
            transition: TransitionOptions::default(),
        }
    }
}

impl SignSettings {
    pub fn from_yaml_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::Invalid("rows and cols must be nonzero".into()));
        }
        if self.underscan * 2 >= self.cols.min(self.rows) {
            return Err(Error::Invalid(format!(
                "underscan {} leaves no active area on a {}x{} sign",
                self.underscan, self.cols, self.rows
            )));
        }
        if let Some(zoom) = &self.zoom {
            if zoom.level < 1.0 {
                return Err(Error::Invalid(format!(
                    "zoom level {} must be at least 1.0",
                    zoom.level
                )));
            }
        }
        if let TopologySettings::Chain { panels } = self.topology {
            if panels == 0 {
                return Err(Error::Invalid("chain needs at least one panel".into()));
            }
            if self.rows % panels != 0 {
                return Err(Error::Invalid(format!(
                    "{} rows do not divide evenly across {} panels",
                    self.rows, panels
                )));
            }
        }
        if self.queue_target_depth == 0 {
            return Err(Error::Invalid("queue-target-depth must be nonzero".into()));
        }
        Ok(())
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            cols: self.cols,
            rows: self.rows,
            zoom: self.zoom,
            fit: self.fit,
            brightness: self.brightness,
            transpose: self.transpose,
            rotate_degrees: self.rotate,
            underscan: self.underscan,
        }
    }

    pub fn topology(&self) -> Result<Topology, Error> {
        match &self.topology {
            TopologySettings::Plain => Ok(Topology::Plain),
            TopologySettings::Chain { panels } => Ok(Topology::Chain { panels: *panels }),
            TopologySettings::Disc {
                rings,
                elements,
                sampling,
            } => {
                let layout = match rings {
                    Some(specs) => RingLayout::new(
                        specs.iter().map(|r| (r.radius, r.count)).collect(),
                        *elements,
                    )?,
                    None => RingLayout::stock(),
                };
                Ok(Topology::Disc {
                    layout,
                    sampling: *sampling,
                })
            }
        }
    }

    pub fn loop_policy(&self) -> LoopPolicy {
        if self.no_loop {
            LoopPolicy::Once
        } else if self.back_and_forth {
            LoopPolicy::BackAndForth
        } else {
            LoopPolicy::Loop
        }
    }
}

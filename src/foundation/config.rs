use std::collections::BTreeMap;

use crate::foundation::error::{OzError, OzResult};

/// Loader options. Every field is optional so a value doubles as a patch: see
/// [`LoaderConfig::merge`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Prefix prepended to relative script urls.
    pub base_url: Option<String>,
    /// First-segment aliases, e.g. `pachislot -> ../pachislot/`.
    pub aliases: BTreeMap<String, String>,
    /// Bundled mode: remote modules lose their declared deps and load from `dist_url`.
    pub enable_ozma: Option<bool>,
    /// Base url used instead of `base_url` when `enable_ozma` is set.
    pub dist_url: Option<String>,
    /// Rewrite `x.js` to `x_pack.js` and `x_src.js` to `x_combo.js` before fetching.
    pub enable_auto_suffix: Option<bool>,
    /// Allow re-defining modules that already loaded or executed.
    pub debug: Option<bool>,
    /// Suffix appended to ids that name no file type (without the dot).
    pub default_suffix: Option<String>,
}

impl LoaderConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(s: &str) -> OzResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the resolver cannot work with.
    pub fn validate(&self) -> OzResult<()> {
        for (name, target) in &self.aliases {
            if name.is_empty() || name.contains('/') {
                return Err(OzError::config(format!(
                    "alias name '{name}' must be a single path segment"
                )));
            }
            if target.is_empty() {
                return Err(OzError::config(format!(
                    "alias '{name}' must map to a non-empty path"
                )));
            }
        }
        if let Some(suffix) = &self.default_suffix {
            if suffix.is_empty() || suffix.starts_with('.') {
                return Err(OzError::config(
                    "default_suffix must be a bare extension like 'js'",
                ));
            }
        }
        Ok(())
    }

    /// Overlay `patch`: set fields replace ours, aliases are merged key by key.
    pub fn merge(&mut self, patch: LoaderConfig) {
        self.aliases.extend(patch.aliases);
        if patch.base_url.is_some() {
            self.base_url = patch.base_url;
        }
        if patch.enable_ozma.is_some() {
            self.enable_ozma = patch.enable_ozma;
        }
        if patch.dist_url.is_some() {
            self.dist_url = patch.dist_url;
        }
        if patch.enable_auto_suffix.is_some() {
            self.enable_auto_suffix = patch.enable_auto_suffix;
        }
        if patch.debug.is_some() {
            self.debug = patch.debug;
        }
        if patch.default_suffix.is_some() {
            self.default_suffix = patch.default_suffix;
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("")
    }

    pub(crate) fn ozma(&self) -> bool {
        self.enable_ozma.unwrap_or(false)
    }

    pub(crate) fn auto_suffix(&self) -> bool {
        self.enable_auto_suffix.unwrap_or(false)
    }

    pub(crate) fn debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    pub(crate) fn suffix(&self) -> &str {
        self.default_suffix.as_deref().unwrap_or("js")
    }
}

/// Frame scheduler options.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Frame cap per stage; `0` means render on every tick.
    pub fps: u32,
}

impl SchedulerConfig {
    /// Minimum interval between two renders of one stage, in milliseconds.
    pub fn frame_interval_ms(self) -> f64 {
        if self.fps == 0 {
            0.0
        } else {
            1000.0 / f64::from(self.fps)
        }
    }
}

/// How actors turn property changes into motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Write target values with a `transition` declaration and wait for transition ends.
    Css,
    /// Interpolate every frame through the scheduler.
    #[default]
    Js,
}

impl RenderMode {
    /// Stable lowercase name (`"css"` / `"js"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
        }
    }
}

/// Animation engine options.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChoreoConfig {
    /// Overrides the render strategy picked at construction.
    pub render_mode: Option<RenderMode>,
    /// Extra CSS timing values by easing name, e.g. `easeOutBack -> cubic-bezier(...)`.
    pub timing_values: BTreeMap<String, String>,
    /// Scheduler options for JS mode.
    pub scheduler: SchedulerConfig,
}

impl ChoreoConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(s: &str) -> OzResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;

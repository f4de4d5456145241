use std::{collections::HashMap, f64::consts::PI, fmt, rc::Rc};

/// Built-in easing curves, named after the Penner equations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    /// Alias of [`Ease::OutQuad`], the default curve.
    Swing,
    /// Half cosine.
    JSwing,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
    InElastic,
    OutElastic,
    InOutElastic,
    InBounce,
    OutBounce,
    InOutBounce,
}

const BACK: f64 = 1.70158;

fn out_bounce(t: f64) -> f64 {
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        let t = t - 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}

impl Ease {
    pub const ALL: [Ease; 33] = [
        Self::Linear,
        Self::Swing,
        Self::JSwing,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InQuart,
        Self::OutQuart,
        Self::InOutQuart,
        Self::InQuint,
        Self::OutQuint,
        Self::InOutQuint,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
        Self::InExpo,
        Self::OutExpo,
        Self::InOutExpo,
        Self::InCirc,
        Self::OutCirc,
        Self::InOutCirc,
        Self::InBack,
        Self::OutBack,
        Self::InOutBack,
        Self::InElastic,
        Self::OutElastic,
        Self::InOutElastic,
        Self::InBounce,
        Self::OutBounce,
        Self::InOutBounce,
    ];

    /// Eased progress for `t` in `[0, 1]`. Back and elastic curves overshoot.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Swing | Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::JSwing => 0.5 - (t * PI).cos() / 2.0,
            Self::InQuad => t * t,
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InQuart => t.powi(4),
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(4) / 2.0)
                }
            }
            Self::InQuint => t.powi(5),
            Self::OutQuint => 1.0 - (1.0 - t).powi(5),
            Self::InOutQuint => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(5) / 2.0)
                }
            }
            Self::InSine => 1.0 - (t * PI / 2.0).cos(),
            Self::OutSine => (t * PI / 2.0).sin(),
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::InExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * (t - 1.0))
                }
            }
            Self::OutExpo => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            Self::InOutExpo => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::InCirc => 1.0 - (1.0 - t * t).sqrt(),
            Self::OutCirc => (1.0 - (t - 1.0).powi(2)).sqrt(),
            Self::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Self::InBack => t * t * ((BACK + 1.0) * t - BACK),
            Self::OutBack => {
                let t = t - 1.0;
                t * t * ((BACK + 1.0) * t + BACK) + 1.0
            }
            Self::InOutBack => {
                let s = BACK * 1.525;
                if t < 0.5 {
                    let t = 2.0 * t;
                    t * t * ((s + 1.0) * t - s) / 2.0
                } else {
                    let t = 2.0 * t - 2.0;
                    (t * t * ((s + 1.0) * t + s) + 2.0) / 2.0
                }
            }
            Self::InElastic => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let p = 0.3;
                let s = p / 4.0;
                let t = t - 1.0;
                -(2f64.powf(10.0 * t) * ((t - s) * (2.0 * PI) / p).sin())
            }
            Self::OutElastic => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let p = 0.3;
                let s = p / 4.0;
                2f64.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / p).sin() + 1.0
            }
            Self::InOutElastic => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let p = 0.3 * 1.5;
                let s = p / 4.0;
                let t = 2.0 * t - 1.0;
                if t < 0.0 {
                    -0.5 * (2f64.powf(10.0 * t) * ((t - s) * (2.0 * PI) / p).sin())
                } else {
                    2f64.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / p).sin() * 0.5 + 1.0
                }
            }
            Self::InBounce => 1.0 - out_bounce(1.0 - t),
            Self::OutBounce => out_bounce(t),
            Self::InOutBounce => {
                if t < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * t)) * 0.5
                } else {
                    out_bounce(2.0 * t - 1.0) * 0.5 + 0.5
                }
            }
        }
    }

    /// Penner form: value at elapsed `t` of `d`, starting at `b` and changing by `c`.
    pub fn value(self, t: f64, b: f64, c: f64, d: f64) -> f64 {
        if d <= 0.0 {
            return b + c;
        }
        b + c * self.apply(t / d)
    }

    /// Canonical name, as used in easing tables and transition strings.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Swing => "swing",
            Self::JSwing => "jswing",
            Self::InQuad => "easeInQuad",
            Self::OutQuad => "easeOutQuad",
            Self::InOutQuad => "easeInOutQuad",
            Self::InCubic => "easeInCubic",
            Self::OutCubic => "easeOutCubic",
            Self::InOutCubic => "easeInOutCubic",
            Self::InQuart => "easeInQuart",
            Self::OutQuart => "easeOutQuart",
            Self::InOutQuart => "easeInOutQuart",
            Self::InQuint => "easeInQuint",
            Self::OutQuint => "easeOutQuint",
            Self::InOutQuint => "easeInOutQuint",
            Self::InSine => "easeInSine",
            Self::OutSine => "easeOutSine",
            Self::InOutSine => "easeInOutSine",
            Self::InExpo => "easeInExpo",
            Self::OutExpo => "easeOutExpo",
            Self::InOutExpo => "easeInOutExpo",
            Self::InCirc => "easeInCirc",
            Self::OutCirc => "easeOutCirc",
            Self::InOutCirc => "easeInOutCirc",
            Self::InBack => "easeInBack",
            Self::OutBack => "easeOutBack",
            Self::InOutBack => "easeInOutBack",
            Self::InElastic => "easeInElastic",
            Self::OutElastic => "easeOutElastic",
            Self::InOutElastic => "easeInOutElastic",
            Self::InBounce => "easeInBounce",
            Self::OutBounce => "easeOutBounce",
            Self::InOutBounce => "easeInOutBounce",
        }
    }

    /// Look up a curve by name. `easeIn`, `easeOut` and `easeInOut` are the quadratic curves.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "easeIn" => Some(Self::InQuad),
            "easeOut" => Some(Self::OutQuad),
            "easeInOut" => Some(Self::InOutQuad),
            _ => Self::ALL.into_iter().find(|e| e.name() == name),
        }
    }

    /// CSS `transition-timing-function` value, when CSS can express the curve.
    pub fn css_timing(self) -> Option<&'static str> {
        Some(match self {
            Self::Linear => "linear",
            Self::Swing | Self::OutQuad => "ease-out",
            Self::InQuad => "ease-in",
            Self::InOutQuad => "ease-in-out",
            Self::JSwing => "ease-in-out",
            Self::InCubic => "cubic-bezier(0.550, 0.055, 0.675, 0.190)",
            Self::OutCubic => "cubic-bezier(0.215, 0.610, 0.355, 1.000)",
            Self::InOutCubic => "cubic-bezier(0.645, 0.045, 0.355, 1.000)",
            Self::InQuart => "cubic-bezier(0.895, 0.030, 0.685, 0.220)",
            Self::OutQuart => "cubic-bezier(0.165, 0.840, 0.440, 1.000)",
            Self::InOutQuart => "cubic-bezier(0.770, 0.000, 0.175, 1.000)",
            Self::InQuint => "cubic-bezier(0.755, 0.050, 0.855, 0.060)",
            Self::OutQuint => "cubic-bezier(0.230, 1.000, 0.320, 1.000)",
            Self::InOutQuint => "cubic-bezier(0.860, 0.000, 0.070, 1.000)",
            Self::InSine => "cubic-bezier(0.470, 0.000, 0.745, 0.715)",
            Self::OutSine => "cubic-bezier(0.390, 0.575, 0.565, 1.000)",
            Self::InOutSine => "cubic-bezier(0.445, 0.050, 0.550, 0.950)",
            Self::InExpo => "cubic-bezier(0.950, 0.050, 0.795, 0.035)",
            Self::OutExpo => "cubic-bezier(0.190, 1.000, 0.220, 1.000)",
            Self::InOutExpo => "cubic-bezier(1.000, 0.000, 0.000, 1.000)",
            Self::InCirc => "cubic-bezier(0.600, 0.040, 0.980, 0.335)",
            Self::OutCirc => "cubic-bezier(0.075, 0.820, 0.165, 1.000)",
            Self::InOutCirc => "cubic-bezier(0.785, 0.135, 0.150, 0.860)",
            Self::InBack => "cubic-bezier(0.600, -0.280, 0.735, 0.045)",
            Self::OutBack => "cubic-bezier(0.175, 0.885, 0.320, 1.275)",
            Self::InOutBack => "cubic-bezier(0.680, -0.550, 0.265, 1.550)",
            Self::InElastic
            | Self::OutElastic
            | Self::InOutElastic
            | Self::InBounce
            | Self::OutBounce
            | Self::InOutBounce => return None,
        })
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized easing function: progress in, eased progress out.
pub type EaseFn = Rc<dyn Fn(f64) -> f64>;

/// Named easing functions plus their CSS timing values.
///
/// Starts with every [`Ease`] curve; embedders add their own with [`EasingTable::add`].
#[derive(Clone)]
pub struct EasingTable {
    functions: HashMap<String, EaseFn>,
    values: HashMap<String, String>,
}

impl fmt::Debug for EasingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EasingTable")
            .field("functions", &names)
            .field("values", &self.values.len())
            .finish()
    }
}

impl Default for EasingTable {
    fn default() -> Self {
        let mut table = Self {
            functions: HashMap::new(),
            values: HashMap::new(),
        };
        for ease in Ease::ALL {
            table.insert_builtin(ease.name(), ease);
        }
        for (alias, ease) in [
            ("easeIn", Ease::InQuad),
            ("easeOut", Ease::OutQuad),
            ("easeInOut", Ease::InOutQuad),
        ] {
            table.insert_builtin(alias, ease);
        }
        table
    }
}

impl EasingTable {
    fn insert_builtin(&mut self, name: &str, ease: Ease) {
        self.functions
            .insert(name.to_string(), Rc::new(move |t| ease.apply(t)));
        if let Some(css) = ease.css_timing() {
            self.values.insert(name.to_string(), css.to_string());
        }
    }

    /// Register or replace a named function.
    pub fn add(&mut self, name: impl Into<String>, f: impl Fn(f64) -> f64 + 'static) {
        self.functions.insert(name.into(), Rc::new(f));
    }

    /// Register or replace the CSS timing value used for `name` in transition strings.
    pub fn add_value(&mut self, name: impl Into<String>, css: impl Into<String>) {
        self.values.insert(name.into(), css.into());
    }

    pub fn get(&self, name: &str) -> Option<EaseFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Eased progress through the named function; unknown names are linear.
    pub fn ease(&self, name: Option<&str>, t: f64) -> f64 {
        match name.and_then(|n| self.functions.get(n)) {
            Some(f) => f(t),
            None => t,
        }
    }

    /// CSS timing value for `name`; `linear` when none is known.
    pub fn timing_value(&self, name: Option<&str>) -> &str {
        name.and_then(|n| self.values.get(n))
            .map_or("linear", String::as_str)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;

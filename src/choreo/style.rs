use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    rc::Rc,
    str::FromStr,
};

use crate::{
    choreo::transform::{self, TRANSFORM, TRANSFORM_DEFAULT},
    foundation::error::{OzError, OzResult},
};

/// Style property holding the element's transition declaration.
pub const TRANSITION: &str = "transition";

struct ElementInner {
    label: String,
    style: RefCell<BTreeMap<String, String>>,
    fx: Cell<Option<u64>>,
}

/// Animated target: a shared node with an inline style map.
///
/// Clones are handles to the same node; equality is identity.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("label", &self.inner.label)
            .field("style", &*self.inner.style.borrow())
            .finish()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Element {}

impl Element {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                label: label.into(),
                style: RefCell::new(BTreeMap::new()),
                fx: Cell::new(None),
            }),
        }
    }

    /// Builder form of [`Element::set_style`].
    pub fn with_style(self, prop: &str, value: impl Into<String>) -> Self {
        self.set_style(prop, value);
        self
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn style(&self, prop: &str) -> Option<String> {
        self.inner.style.borrow().get(prop).cloned()
    }

    pub fn set_style(&self, prop: &str, value: impl Into<String>) {
        self.inner
            .style
            .borrow_mut()
            .insert(prop.to_string(), value.into());
    }

    pub fn remove_style(&self, prop: &str) -> Option<String> {
        self.inner.style.borrow_mut().remove(prop)
    }

    /// Current transition declaration, empty when none.
    pub fn transition(&self) -> String {
        self.style(TRANSITION).unwrap_or_default()
    }

    pub fn styles(&self) -> BTreeMap<String, String> {
        self.inner.style.borrow().clone()
    }

    pub(crate) fn fx_id(&self) -> Option<u64> {
        self.inner.fx.get()
    }

    pub(crate) fn stamp_fx(&self, id: u64) {
        self.inner.fx.set(Some(id));
    }
}

/// Leading numeric part of a CSS value, like `parseFloat`.
pub fn parse_number(value: &str) -> Option<f64> {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = exp;
        while bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            exp += 1;
        }
        if exp > exp_digits {
            end = exp;
        }
    }
    s[..end].parse().ok()
}

/// What follows the leading `[-\d.]` run of a value.
pub fn unit_of(value: &str) -> &str {
    value.trim_start_matches(|c: char| c == '-' || c == '.' || c.is_ascii_digit())
}

/// Unit shared by an animation from `from` to `to`.
///
/// A zero endpoint takes the unit of the other endpoint; otherwise the target's unit wins.
pub fn get_unit(from: &str, to: &str) -> String {
    let from_unit = unit_of(from);
    let to_unit = unit_of(to);
    let unit = if parse_number(from) == Some(0.0) && !to_unit.is_empty() {
        to_unit
    } else if parse_number(to) == Some(0.0) && !from_unit.is_empty() {
        from_unit
    } else if !to_unit.is_empty() {
        to_unit
    } else {
        from_unit
    };
    unit.to_string()
}

/// Shortest decimal form of `v`, without a trailing `.0`.
pub fn format_number(v: f64) -> String {
    if v == 0.0 { "0".to_string() } else { format!("{v}") }
}

/// A number followed by a unit, e.g. `12.5px` or `90deg`.
#[derive(Clone, Debug, PartialEq)]
pub struct CssValue {
    pub number: f64,
    pub unit: String,
}

impl FromStr for CssValue {
    type Err = OzError;

    fn from_str(s: &str) -> OzResult<Self> {
        let number = parse_number(s)
            .ok_or_else(|| OzError::animation(format!("not a numeric css value: {s:?}")))?;
        Ok(Self {
            number,
            unit: unit_of(s.trim()).to_string(),
        })
    }
}

impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.number), self.unit)
    }
}

/// Current value of `prop` on `elm` as an animation start point.
///
/// Transform functions read from the element's transform list, `transform` falls back to
/// the identity list, and anything without a digit reads as `0`.
pub(crate) fn get_style_value(elm: &Element, prop: &str) -> String {
    if transform::is_transform_prop(prop) {
        return transform::get(elm, prop).unwrap_or_else(|| "0".to_string());
    }
    if prop == TRANSFORM {
        return elm
            .style(TRANSFORM)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| TRANSFORM_DEFAULT.to_string());
    }
    match elm.style(prop) {
        Some(v) if v.chars().any(|c| c.is_ascii_digit()) => v,
        _ => "0".to_string(),
    }
}

/// Write `value` to `prop`, merging transform functions into the transform list.
pub(crate) fn set_style_prop(elm: &Element, prop: &str, value: &str) {
    if transform::is_transform_prop(prop) {
        transform::set(elm, prop, value);
    } else {
        elm.set_style(prop, value);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/style.rs"]
mod tests;

//! Transform lists: parsing `translateX(10px) scale(2)` into per-function values and
//! merging single functions back into an element's `transform` style.

use crate::choreo::style::{Element, get_style_value};

/// Style property animated through per-function sub-actors.
pub const TRANSFORM: &str = "transform";

/// Identity transform list used when an element has no transform yet.
pub const TRANSFORM_DEFAULT: &str = "rotateX(0deg) rotateY(0deg) rotateZ(0deg) \
     translateX(0px) translateY(0px) translateZ(0px) \
     scaleX(1) scaleY(1) scaleZ(1) skewX(0deg) skewY(0deg)";

/// Argument shape of a transform function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    /// Takes one value and keeps its own name (`rotate`, `translateX`).
    Single,
    /// Up to two values, split into `X`/`Y` functions (`scale`, `translate`, `skew`).
    Pair,
    /// Up to three values, split into `X`/`Y`/`Z` functions (`scale3d`, `translate3d`).
    Triple,
}

/// Shape of the transform function `name`, `None` when it is not animatable.
pub fn transform_kind(name: &str) -> Option<TransformKind> {
    match name {
        "rotate" | "rotateX" | "rotateY" | "rotateZ" | "scaleX" | "scaleY" | "scaleZ" | "skewX"
        | "skewY" | "translateX" | "translateY" | "translateZ" => Some(TransformKind::Single),
        "scale" | "skew" | "translate" => Some(TransformKind::Pair),
        "scale3d" | "translate3d" => Some(TransformKind::Triple),
        _ => None,
    }
}

pub fn is_transform_prop(name: &str) -> bool {
    transform_kind(name).is_some()
}

const AXES: [&str; 3] = ["X", "Y", "Z"];

/// Split a transform list into `(function, value)` pairs in source order.
///
/// Multi-value functions are spread over their axes (`translate(1px, 2px)` gives
/// `translateX` and `translateY`), a later entry replaces an earlier one of the same name,
/// and unknown functions are skipped.
pub fn parse_transform(value: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for item in value.split(')') {
        let item = item.trim();
        let Some((name, args)) = item.split_once('(') else {
            continue;
        };
        let name = name.trim();
        let Some(kind) = transform_kind(name) else {
            continue;
        };
        let values: Vec<&str> = args.split(',').map(str::trim).collect();
        let single = kind == TransformKind::Single || values.len() <= 1;
        let base = name.replace("3d", "");
        for (i, v) in values.iter().enumerate() {
            let keep = (kind == TransformKind::Triple && !v.is_empty() && i < AXES.len())
                || (single && i < 1)
                || (!single && i < 2);
            if !keep {
                continue;
            }
            let key = if single {
                base.clone()
            } else {
                format!("{base}{}", AXES[i])
            };
            mix(&mut out, key, (*v).to_string());
        }
    }
    out
}

fn mix(list: &mut Vec<(String, String)>, key: String, value: String) {
    match list.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => list.push((key, value)),
    }
}

/// Value of one transform function on `elm`; `rotate` defaults to `0deg`.
pub fn get(elm: &Element, prop: &str) -> Option<String> {
    let current = parse_transform(&get_style_value(elm, TRANSFORM));
    current
        .into_iter()
        .find(|(k, _)| k == prop)
        .map(|(_, v)| v)
        .or_else(|| (prop == "rotate").then(|| "0deg".to_string()))
}

/// Merge `prop(value)` into the transform list of `elm`. Empty values are ignored.
pub fn set(elm: &Element, prop: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let mut current = parse_transform(&get_style_value(elm, TRANSFORM));
    for (k, v) in parse_transform(&format!("{prop}({value})")) {
        mix(&mut current, k, v);
    }
    let list = current
        .iter()
        .map(|(k, v)| format!("{k}({v})"))
        .collect::<Vec<_>>()
        .join(" ");
    elm.set_style(TRANSFORM, list);
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/transform.rs"]
mod tests;

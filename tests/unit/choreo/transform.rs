use super::*;

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn kinds_cover_the_animatable_functions() {
    assert_eq!(transform_kind("rotate"), Some(TransformKind::Single));
    assert_eq!(transform_kind("translate"), Some(TransformKind::Pair));
    assert_eq!(transform_kind("scale3d"), Some(TransformKind::Triple));
    assert_eq!(transform_kind("matrix"), None);
    assert!(is_transform_prop("skewY"));
    assert!(!is_transform_prop(TRANSFORM));
}

#[test]
fn parse_keeps_source_order_and_single_values() {
    assert_eq!(
        parse_transform("translateX(10px) scale(2)"),
        pairs(&[("translateX", "10px"), ("scale", "2")])
    );
}

#[test]
fn parse_spreads_multi_value_functions_over_axes() {
    assert_eq!(
        parse_transform("translate(1px, 2px)"),
        pairs(&[("translateX", "1px"), ("translateY", "2px")])
    );
    assert_eq!(
        parse_transform("translate3d(1px, 2px, 3px)"),
        pairs(&[("translateX", "1px"), ("translateY", "2px"), ("translateZ", "3px")])
    );
    assert_eq!(
        parse_transform("skew(10deg, 20deg, 30deg)"),
        pairs(&[("skewX", "10deg"), ("skewY", "20deg")])
    );
}

#[test]
fn parse_skips_unknown_functions_and_lets_later_entries_win() {
    assert_eq!(
        parse_transform("rotate(45deg) matrix(1, 0, 0, 1, 0, 0) rotate(90deg)"),
        pairs(&[("rotate", "90deg")])
    );
    assert!(parse_transform("none").is_empty());
    assert!(parse_transform("").is_empty());
}

#[test]
fn set_merges_into_the_identity_list() {
    let elm = Element::new("box");
    set(&elm, "translateX", "10px");
    let expected = TRANSFORM_DEFAULT.replace("translateX(0px)", "translateX(10px)");
    assert_eq!(elm.style(TRANSFORM).as_deref(), Some(expected.as_str()));
    assert_eq!(get(&elm, "translateX").as_deref(), Some("10px"));

    set(&elm, "rotate", "30deg");
    assert!(elm.style(TRANSFORM).unwrap().ends_with("rotate(30deg)"));

    let before = elm.style(TRANSFORM);
    set(&elm, "scaleX", "");
    assert_eq!(elm.style(TRANSFORM), before);
}

#[test]
fn get_defaults_rotate_only() {
    let elm = Element::new("box").with_style(TRANSFORM, "scale(2)");
    assert_eq!(get(&elm, "scale").as_deref(), Some("2"));
    assert_eq!(get(&elm, "rotate").as_deref(), Some("0deg"));
    assert_eq!(get(&elm, "translateX"), None);
}

use super::*;

#[test]
fn parse_number_reads_the_leading_number() {
    assert_eq!(parse_number("12.5px"), Some(12.5));
    assert_eq!(parse_number("-3deg"), Some(-3.0));
    assert_eq!(parse_number(".5em"), Some(0.5));
    assert_eq!(parse_number("  7"), Some(7.0));
    assert_eq!(parse_number("1e3ms"), Some(1000.0));
    assert_eq!(parse_number("px"), None);
    assert_eq!(parse_number("-"), None);
}

#[test]
fn units_follow_the_non_zero_endpoint() {
    assert_eq!(unit_of("-0.5em"), "em");
    assert_eq!(unit_of("3"), "");
    assert_eq!(get_unit("0", "10px"), "px");
    assert_eq!(get_unit("10px", "0"), "px");
    assert_eq!(get_unit("10em", "20px"), "px");
    assert_eq!(get_unit("10em", "20"), "em");
}

#[test]
fn numbers_format_without_trailing_zero() {
    assert_eq!(format_number(50.0), "50");
    assert_eq!(format_number(0.5), "0.5");
    assert_eq!(format_number(-0.0), "0");
}

#[test]
fn css_value_parses_and_reports_bad_input() {
    let v: CssValue = "12.5px".parse().unwrap();
    assert_eq!(v.number, 12.5);
    assert_eq!(v.unit, "px");
    assert_eq!(v.to_string(), "12.5px");

    let err = "auto".parse::<CssValue>().unwrap_err();
    assert!(matches!(err, OzError::Animation(_)));
}

#[test]
fn style_values_fall_back_to_zero_and_identity() {
    let elm = Element::new("box").with_style("left", "10px").with_style("width", "auto");
    assert_eq!(get_style_value(&elm, "left"), "10px");
    assert_eq!(get_style_value(&elm, "width"), "0");
    assert_eq!(get_style_value(&elm, "top"), "0");
    assert_eq!(get_style_value(&elm, TRANSFORM), TRANSFORM_DEFAULT);
    assert_eq!(get_style_value(&elm, "translateX"), "0px");
    assert_eq!(get_style_value(&elm, "rotate"), "0deg");
    assert_eq!(get_style_value(&elm, "scale"), "0");
}

#[test]
fn transform_functions_are_merged_into_the_list() {
    let elm = Element::new("box");
    set_style_prop(&elm, "left", "5px");
    set_style_prop(&elm, "translateY", "20px");
    assert_eq!(elm.style("left").as_deref(), Some("5px"));
    let list = elm.style(TRANSFORM).unwrap();
    assert!(list.contains("translateY(20px)"));
    assert!(list.contains("translateX(0px)"));
}

#[test]
fn elements_compare_by_identity() {
    let a = Element::new("a");
    let b = Element::new("a");
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    a.set_style("opacity", "1");
    assert_eq!(a.clone().style("opacity").as_deref(), Some("1"));
    assert_eq!(a.remove_style("opacity").as_deref(), Some("1"));
    assert!(a.styles().is_empty());
    assert_eq!(a.transition(), "");
}

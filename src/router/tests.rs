use http::Method;

use super::{RouteMeta, Router};

#[test]
fn test_root_path() {
    let (re, params) = Router::path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/cources"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = Router::path_to_regex("/cources/{id}").unwrap();
    assert!(re.is_match("/cources/123"));
    assert!(!re.is_match("/cources/123/extra"));
    assert_eq!(params, vec!["id"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = Router::path_to_regex("/v1.0/items").unwrap();
    assert!(re.is_match("/v1.0/items"));
    assert!(!re.is_match("/v1x0/items"));
}

#[test]
fn test_route_extracts_params_and_respects_method() {
    let router = Router::new(vec![
        RouteMeta::new(Method::GET, "/", "home"),
        RouteMeta::new(Method::GET, "/cources", "list_courses"),
        RouteMeta::new(Method::GET, "/cources/{id}", "get_course"),
    ])
    .unwrap();

    let m = router.route(Method::GET, "/cources/2").unwrap();
    assert_eq!(m.handler_name, "get_course");
    assert_eq!(m.get_path_param("id"), Some("2"));

    assert_eq!(router.route(Method::GET, "/").unwrap().handler_name, "home");
    assert!(router.route(Method::DELETE, "/cources").is_none());
    assert!(router.route(Method::GET, "/courses").is_none());
    assert_eq!(router.routes().count(), 3);
}

//! Architecture contract tests.

mod support;

use support::architecture::{find_lines_containing, path_exists};

#[test]
fn domain_has_no_framework_or_outer_layer_imports() {
    let hits = find_lines_containing(
        "src/domain",
        &[
            "crate::adapter",
            "crate::infrastructure",
            "crate::application",
            "crate::port",
            "tokio::",
        ],
    );

    assert!(
        hits.is_empty(),
        "found forbidden imports in domain layer: {hits:#?}"
    );
}

#[test]
fn ports_depend_only_on_domain() {
    let hits = find_lines_containing(
        "src/port",
        &["crate::adapter", "crate::infrastructure", "crate::application"],
    );

    assert!(hits.is_empty(), "found outer-layer imports in ports: {hits:#?}");
}

#[test]
fn application_does_not_reach_into_adapters() {
    let hits = find_lines_containing("src/application", &["crate::adapter"]);

    assert!(
        hits.is_empty(),
        "application must go through ports, found: {hits:#?}"
    );
}

#[test]
fn application_does_not_depend_on_infrastructure() {
    let hits = find_lines_containing(
        "src/application",
        &["crate::infrastructure", "infrastructure::config"],
    );

    assert!(
        hits.is_empty(),
        "application takes its settings as plain values, found: {hits:#?}"
    );
}

#[test]
fn external_commands_stay_in_outbound_adapters() {
    let hits = find_lines_containing(
        "src/application",
        &["\"k3d\"", "\"docker\"", "\"kubectl\""],
    );

    assert!(hits.is_empty(), "CLI names leaked into the core: {hits:#?}");
    assert!(path_exists("src/adapter/outbound/k3d.rs"));
    assert!(path_exists("src/adapter/outbound/docker.rs"));
    assert!(path_exists("src/adapter/outbound/kubectl.rs"));
}

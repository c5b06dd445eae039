// tests/shell_navigation.rs

mod common;

use common::{fail, listing_ids, run, session};
use netscope::{
    cli::render::{self, CommandOutput},
    core::{
        config_loader::PromptSection, navigator::NavigationError, resolver::ResolveError,
        validators::ValidationError,
    },
    models::{ContextType, OutputFormat},
};

#[test]
fn test_set_by_ordinal_enters_context_and_updates_prompt() {
    // --- Setup ---
    let mut s = session();
    let listed = run(&mut s, "show vpcs");
    assert_eq!(listing_ids(&listed), vec!["vpc-1", "vpc-2", "vpc-3"]);

    // --- Execute ---
    run(&mut s, "set vpc 1");

    // --- Assert ---
    assert_eq!(s.navigator.current_context_type(), ContextType::Vpc);
    let frame = s.navigator.current_frame().unwrap();
    assert_eq!(frame.reference, "vpc-1");
    assert_eq!(frame.selection_index, 1);
    // The frame carries the full detail, not the listing summary.
    assert!(frame.detail.get("route_tables").is_some());
    assert_eq!(
        render::prompt(s.navigator.frames(), &PromptSection::default()),
        "netscope>vpc:1> "
    );
}

#[test]
fn test_set_without_prior_show_fetches_the_list() {
    let mut s = session();
    run(&mut s, "set transit-gateway tgw-1");
    assert_eq!(s.navigator.current_context_type(), ContextType::TransitGateway);
}

#[test]
fn test_name_match_is_case_insensitive_and_ambiguity_is_reported() {
    let mut s = session();
    run(&mut s, "set vpc DR");
    assert_eq!(s.navigator.current_frame().unwrap().reference, "vpc-2");

    run(&mut s, "end");
    let err = fail(&mut s, "set vpc prod");
    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::Ambiguous { candidates, .. }) => {
            assert_eq!(candidates, &vec!["vpc-1".to_string(), "vpc-3".to_string()]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
    assert_eq!(s.navigator.current_context_type(), ContextType::Root);
}

#[test]
fn test_out_of_range_ordinal_is_not_found() {
    let mut s = session();
    let err = fail(&mut s, "set vpc 9");
    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::NotFound { .. })
    ));
}

#[test]
fn test_exit_and_end_walk_back_up() {
    let mut s = session();
    run(&mut s, "set vpc 1");
    run(&mut s, "set route-table private");
    assert_eq!(s.navigator.depth(), 2);
    assert_eq!(s.navigator.current_frame().unwrap().reference, "rtb-b");

    run(&mut s, "exit");
    assert_eq!(s.navigator.current_context_type(), ContextType::Vpc);

    run(&mut s, "set route-table 1");
    run(&mut s, "end");
    assert_eq!(s.navigator.depth(), 0);

    assert_eq!(run(&mut s, "exit"), CommandOutput::Quit);
}

#[test]
fn test_deepest_path_through_global_network() {
    // --- Setup ---
    let mut s = session();
    run(&mut s, "set global-network corp");

    // --- Execute ---
    let cores = run(&mut s, "show core-networks");
    run(&mut s, "set core-network 1");
    let tables = run(&mut s, "show route-tables");
    run(&mut s, "set route-table 2");

    // --- Assert ---
    assert_eq!(listing_ids(&cores), vec!["core-network-1"]);
    assert_eq!(listing_ids(&tables), vec!["prod|us-east-1", "dev|eu-west-1"]);
    assert_eq!(s.navigator.depth(), 3);
    assert_eq!(
        render::prompt(s.navigator.frames(), &PromptSection::default()),
        "netscope>gn:1>cn:1>rt:2> "
    );
    match run(&mut s, "show routes") {
        CommandOutput::Routes { routes, .. } => {
            assert_eq!(routes.len(), 1);
            assert_eq!(routes[0].destination, "10.99.0.0/16");
        }
        other => panic!("expected routes, got {:?}", other),
    }
}

#[test]
fn test_illegal_commands_are_rejected_per_context() {
    let mut s = session();
    let err = fail(&mut s, "show segments");
    assert!(err.to_string().contains("not available in the 'root' context"));

    run(&mut s, "set elb 1");
    assert!(fail(&mut s, "find_prefix 10.0.0.0/8").to_string().contains("not available"));
    assert!(fail(&mut s, "set route-table 1").to_string().contains("not available"));
}

#[test]
fn test_transition_errors_name_reachable_contexts() {
    let mut s = session();
    run(&mut s, "set vpc 1");
    let err = s
        .navigator
        .push(ContextType::Elb, "elb-1", None, serde_json::Value::Null, 1)
        .unwrap_err();
    assert_eq!(
        err,
        NavigationError::InvalidTransition {
            from: ContextType::Vpc,
            to: ContextType::Elb,
            legal: vec![ContextType::RouteTable],
        }
    );
}

#[test]
fn test_help_and_question_mark_list_context_commands() {
    let mut s = session();
    run(&mut s, "set vpc 1");

    match run(&mut s, "?") {
        CommandOutput::Options { options, .. } => {
            assert!(options.contains(&"show subnets".to_string()));
            assert!(options.contains(&"set route-table <number|id|name>".to_string()));
            assert!(options.contains(&"find_prefix".to_string()));
            assert!(options.contains(&"exit".to_string()));
        }
        other => panic!("expected options, got {:?}", other),
    }

    match run(&mut s, "sh ?") {
        CommandOutput::Options { options, .. } => assert_eq!(options.len(), 8),
        other => panic!("expected options, got {:?}", other),
    }
}

#[test]
fn test_detail_sections_render_as_listings() {
    let mut s = session();
    run(&mut s, "set vpc 1");
    assert_eq!(listing_ids(&run(&mut s, "show subnets")), vec!["subnet-1", "subnet-2"]);
    assert!(matches!(
        run(&mut s, "show nat-gateways"),
        CommandOutput::Message(m) if m.contains("No nat-gateways")
    ));

    run(&mut s, "end");
    run(&mut s, "set ec2-instance bastion");
    match run(&mut s, "show routes") {
        CommandOutput::Listing { items, .. } => assert_eq!(items.len(), 1),
        other => panic!("expected the instance's route listing, got {:?}", other),
    }
}

#[test]
fn test_runtime_settings_are_validated() {
    let mut s = session();

    run(&mut s, "set regions us-east-1");
    assert_eq!(listing_ids(&run(&mut s, "show vpcs")), vec!["vpc-1"]);

    let err = fail(&mut s, "set regions us-east-1 eu-west-1");
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::SpaceSeparatedRegions)
    ));
    assert!(fail(&mut s, "set regions moon-east-1").to_string().contains("Invalid region"));

    run(&mut s, "set output-format json");
    assert_eq!(s.settings.output_format, OutputFormat::Json);
    assert!(fail(&mut s, "set output-format yaml").to_string().contains("yaml"));

    run(&mut s, "set no-cache on");
    assert!(s.settings.no_cache);

    run(&mut s, "set profile prod-admin");
    assert_eq!(s.cache.account(), "prod-admin");
    assert!(fail(&mut s, "set profile 'bad name'").to_string().contains("Invalid profile"));
}

#[test]
fn test_partial_region_failure_is_a_warning() {
    let mut s = session();
    run(&mut s, "set regions us-east-1,ap-south-1");
    match run(&mut s, "show vpcs") {
        CommandOutput::Listing { items, warnings, .. } => {
            assert_eq!(items.len(), 1);
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].starts_with("ap-south-1"));
        }
        other => panic!("expected a listing, got {:?}", other),
    }

    run(&mut s, "set regions ap-south-1,sa-east-1");
    let err = fail(&mut s, "show vpcs");
    assert!(format!("{:#}", err).contains("all 2 region(s) failed"));
    // Nothing was cached for the failed region set.
    assert!(s.cache.entries().iter().all(|e| e.key != "ap-south-1,sa-east-1"));
}

#[test]
fn test_listings_are_cached_and_refresh_refetches() {
    let mut s = session();
    run(&mut s, "show vpcs");
    assert!(s.cache.entries().iter().any(|e| e.namespace == "vpc"));

    match run(&mut s, "refresh vpcs") {
        CommandOutput::Listing { items, .. } => assert_eq!(items.len(), 3),
        other => panic!("expected a listing, got {:?}", other),
    }

    run(&mut s, "refresh");
    assert!(s.cache.entries().iter().all(|e| e.namespace != "vpc"));
    assert!(fail(&mut s, "refresh subnets").to_string().contains("Unknown resource kind"));
}

#[test]
fn test_graph_introspection_commands() {
    let mut s = session();

    match run(&mut s, "show graph stats") {
        CommandOutput::GraphStats(stats) => {
            assert_eq!(stats.paths, 12);
            assert_eq!(stats.max_depth, 3);
        }
        other => panic!("expected stats, got {:?}", other),
    }

    match run(&mut s, "show graph parent show segments") {
        CommandOutput::CommandPath(path) => {
            assert_eq!(path.steps.last().map(String::as_str), Some("show segments"));
            assert_eq!(path.context, ContextType::CoreNetwork);
        }
        other => panic!("expected a path, got {:?}", other),
    }

    match run(&mut s, "validate_graph") {
        CommandOutput::GraphReport(report) => assert!(report.is_valid()),
        other => panic!("expected a report, got {:?}", other),
    }

    assert!(matches!(run(&mut s, "show graph"), CommandOutput::Graph(_)));
    let text = render::render(&run(&mut s, "show graph"), OutputFormat::Table);
    assert!(text.contains("route-table"));
}

#[test]
fn test_unbalanced_quotes_and_blank_lines() {
    let mut s = session();
    assert_eq!(run(&mut s, "   "), CommandOutput::None);
    assert!(fail(&mut s, "set vpc 'prod").to_string().contains("Unbalanced"));
}

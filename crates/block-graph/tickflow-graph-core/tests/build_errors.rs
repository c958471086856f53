//! Build-time validation: cycle rejection, configuration errors, pruning.

use anyhow::Result;
use tickflow_graph_core::blocks::PipeBlock;
use tickflow_graph_core::{BuildError, EvalPolicy, GraphBuilder, Value};
use tickflow_test_fixtures::{CountingBlock, LatchBlock};

#[test]
fn it_should_reject_a_cycle_with_no_output_first_member() -> Result<()> {
    let mut builder = GraphBuilder::new();
    let (a, _) = CountingBlock::new("a", 1, 1, EvalPolicy::LAZY_INPUT_FIRST);
    let (b, _) = CountingBlock::new("b", 1, 1, EvalPolicy::LAZY_INPUT_FIRST);
    let a = builder.add(a);
    let b = builder.add(b);
    let a_in = builder.input(a, 0)?;
    let a_out = builder.output(a, 0)?;
    let b_in = builder.input(b, 0)?;
    let b_out = builder.output(b, 0)?;
    builder.connect(b_in, a_out)?;
    builder.connect(a_in, b_out)?;
    // Demand the cycle from an always-eager sink so it is not just pruned.
    builder.monitor(b_out)?;

    let err = builder.build().expect_err("strict cycle must not build");
    assert!(matches!(err, BuildError::UnresolvableCycle(_)));
    Ok(())
}

#[test]
fn it_should_build_the_same_cycle_once_a_member_is_output_first() -> Result<()> {
    let mut builder = GraphBuilder::new();
    let a = builder.add(LatchBlock::new(
        "a",
        Value::Float(0.0),
        EvalPolicy::LAZY_OUTPUT_FIRST,
    ));
    let (b, _) = CountingBlock::new("b", 1, 1, EvalPolicy::LAZY_INPUT_FIRST);
    let b = builder.add(b);
    let a_in = builder.input(a, 0)?;
    let a_out = builder.output(a, 0)?;
    let b_in = builder.input(b, 0)?;
    let b_out = builder.output(b, 0)?;
    builder.connect(b_in, a_out)?;
    builder.connect(a_in, b_out)?;
    builder.monitor(b_out)?;

    let system = builder.build().expect("output-first member breaks the cycle");
    // Utility shutdown sink + monitor + both cycle members survive.
    assert_eq!(system.graph().len(), 4);
    Ok(())
}

#[test]
fn it_should_surface_missing_required_connections() -> Result<()> {
    let mut builder = GraphBuilder::new();
    let pipe = builder.add(PipeBlock::new(|v| v));
    let pipe_out = builder.output(pipe, 0)?;
    builder.monitor(pipe_out)?;

    let err = builder.build().expect_err("pipe input is required");
    match err {
        BuildError::InvalidConfiguration { block, reason } => {
            assert_eq!(block, "pipe");
            assert!(reason.contains("input 0"));
        }
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }
    Ok(())
}

#[test]
fn it_should_not_validate_blocks_that_pruning_removes() {
    let mut builder = GraphBuilder::new();
    // Unconnected required input, but nothing demands this block.
    builder.add(PipeBlock::new(|v| v));

    let system = builder.build().expect("unreachable blocks are pruned, not validated");
    // Only the always-eager shutdown sink survives; the lazy utility sources
    // and the dangling pipe are pruned.
    assert_eq!(system.graph().len(), 1);
    assert_eq!(system.graph().labels().collect::<Vec<_>>(), vec!["shutdown"]);
}

#[test]
fn it_should_keep_always_blocks_ahead_of_lazy_ones() -> Result<()> {
    let mut builder = GraphBuilder::new();
    let src = builder.constant(Value::Float(1.0));
    let doubled = builder.pipe(src, |v| v)?;
    builder.monitor(doubled)?;

    let system = builder.build().expect("valid graph");
    let labels: Vec<_> = system.graph().labels().collect();
    let first_lazy = labels
        .iter()
        .position(|l| *l == "constant" || *l == "pipe")
        .expect("lazy blocks present");
    let last_always = labels
        .iter()
        .rposition(|l| *l == "shutdown" || *l == "monitor")
        .expect("always blocks present");
    assert!(last_always < first_lazy);
    Ok(())
}

//! The contract every pipeline node implements.
//!
//! A node is identified by a [`NodeType`] tag, declares an input and an output
//! [`Schema`], and performs its work one [`attempt`](Node::attempt) at a time.
//! The provided [`execute`](Node::execute) method turns those pieces into the
//! full execution contract:
//!
//! 1. the configuration is validated against the input schema, and nothing
//!    else happens if it does not conform;
//! 2. attempts are driven by a [`RetryExecutor`] using the node's
//!    [`RetryConfig`];
//! 3. the produced result is validated against the output schema before it is
//!    handed back.
//!
//! The orchestrator depends only on `dyn Node`; it never needs to know which
//! concrete node it is running.

use async_trait::async_trait;
use tracing::Instrument;

use crate::{
    ExecutionId, ExecutionReport, NodeConfig, NodeError, NodeResult, NodeType, OperationError,
    RetryConfig, RetryExecutor, Schema, Timestamp,
};

const TRACING_TARGET: &str = "pipeline::node";

/// A single executable pipeline step.
///
/// Implementors provide the type tag, both schemas, and one attempt of the
/// node's work. Implementations must be stateless across invocations: every
/// call to [`execute`](Node::execute) is independent, so concurrent
/// executions never share mutable state.
#[async_trait]
pub trait Node: Send + Sync {
    /// Discriminating type tag of this node.
    fn node_type(&self) -> &NodeType;

    /// Shape the configuration must have before any attempt is made.
    fn input_schema(&self) -> &Schema;

    /// Shape every returned result has.
    fn output_schema(&self) -> &Schema;

    /// Retry settings for one execution of this node.
    fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
    }

    /// Performs one attempt of the node's work.
    ///
    /// `config` has already passed input validation. Returning `Err` asks the
    /// retry executor for another attempt (subject to the error's
    /// [`RetryPolicy`](crate::RetryPolicy)); nodes that represent failures as
    /// data return `Ok` with a degraded result instead.
    async fn attempt(&self, config: &NodeConfig) -> Result<NodeResult, OperationError>;

    /// Runs the node under the full execution contract.
    ///
    /// # Errors
    ///
    /// - [`NodeError::InvalidInput`] if `config` does not match the input
    ///   schema; no attempt is made.
    /// - [`NodeError::Retry`] if the retry executor gave up.
    /// - [`NodeError::InvalidOutput`] if the node produced a non-conforming
    ///   result.
    async fn execute(&self, config: NodeConfig) -> Result<NodeResult, NodeError> {
        self.execute_with_report(config)
            .await
            .map(|report| report.result)
    }

    /// Same as [`execute`](Node::execute), additionally returning attempt
    /// count and timing.
    async fn execute_with_report(&self, config: NodeConfig) -> Result<ExecutionReport, NodeError> {
        let execution_id = ExecutionId::new_random();
        let span = tracing::info_span!(
            "node.execute",
            node_type = %self.node_type(),
            execution_id = %execution_id,
        );
        run_contract(self, execution_id, config).instrument(span).await
    }
}

async fn run_contract<N>(
    node: &N,
    execution_id: ExecutionId,
    config: NodeConfig,
) -> Result<ExecutionReport, NodeError>
where
    N: Node + ?Sized,
{
    let started_at = Timestamp::now();

    if let Err(err) = node.input_schema().validate_object(config.as_map()) {
        tracing::warn!(
            target: TRACING_TARGET,
            error = %err,
            "Node input rejected; no attempt made"
        );
        return Err(NodeError::InvalidInput(err));
    }

    tracing::info!(target: TRACING_TARGET, "Node execution started");

    let executor = RetryExecutor::new(node.retry_config());
    let config_ref = &config;
    let attempted = executor.run(move || node.attempt(config_ref)).await?;

    if let Err(err) = node.output_schema().validate_object(attempted.value.as_map()) {
        tracing::error!(
            target: TRACING_TARGET,
            error = %err,
            "Node produced a result that violates its output schema"
        );
        return Err(NodeError::InvalidOutput(err));
    }

    tracing::info!(
        target: TRACING_TARGET,
        attempts = attempted.attempts,
        "Node execution finished"
    );

    Ok(ExecutionReport {
        execution_id,
        node_type: node.node_type().clone(),
        started_at,
        finished_at: Timestamp::now(),
        attempts: attempted.attempts,
        result: attempted.value,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{Backoff, FieldKind, MaxAttempts, RetryError};

    /// Scripted node: fails the first `failures` attempts, then echoes `value`.
    struct EchoNode {
        node_type: NodeType,
        input: Schema,
        output: Schema,
        failures: u32,
        calls: AtomicU32,
        emit_invalid: bool,
    }

    impl EchoNode {
        fn new(failures: u32) -> Self {
            Self {
                node_type: NodeType::from_static("echo"),
                input: Schema::builder().required("value", FieldKind::Integer).build(),
                output: Schema::builder().required("echo", FieldKind::Integer).build(),
                failures,
                calls: AtomicU32::new(0),
                emit_invalid: false,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Node for EchoNode {
        fn node_type(&self) -> &NodeType {
            &self.node_type
        }

        fn input_schema(&self) -> &Schema {
            &self.input
        }

        fn output_schema(&self) -> &Schema {
            &self.output
        }

        fn retry_config(&self) -> RetryConfig {
            RetryConfig::default()
                .with_max_attempts(MaxAttempts::new(3).unwrap())
                .with_backoff(Backoff::Fixed {
                    delay: Duration::from_millis(10),
                })
        }

        async fn attempt(&self, config: &NodeConfig) -> Result<NodeResult, OperationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(OperationError::retryable(format!("failure {call}")));
            }
            if self.emit_invalid {
                return Ok(NodeResult::new().with("echo", "not a number"));
            }
            let value = config.get("value").cloned().unwrap_or_default();
            Ok(NodeResult::new().with("echo", value))
        }
    }

    fn config(value: i64) -> NodeConfig {
        NodeConfig::new().with("value", value)
    }

    #[tokio::test(start_paused = true)]
    async fn valid_config_produces_validated_result() {
        let node = EchoNode::new(0);
        let result = node.execute(config(7)).await.unwrap();
        assert_eq!(result.into_value(), json!({"echo": 7}));
        assert_eq!(node.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_never_reaches_attempt() {
        let node = EchoNode::new(0);
        let err = node
            .execute(NodeConfig::new().with("value", "seven"))
            .await
            .unwrap_err();

        match err {
            NodeError::InvalidInput(violations) => assert!(violations.has_violation_at("value")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(node.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let node = EchoNode::new(1);
        let report = node.execute_with_report(config(3)).await.unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.node_type.as_str(), "echo");
        assert!(report.finished_at >= report.started_at);
        assert_eq!(node.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_escalate() {
        let node = EchoNode::new(u32::MAX);
        let err = node.execute(config(1)).await.unwrap_err();

        assert!(matches!(
            err,
            NodeError::Retry(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(node.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_conforming_output_is_rejected() {
        let mut node = EchoNode::new(0);
        node.emit_invalid = true;

        let err = node.execute(config(1)).await.unwrap_err();
        match err {
            NodeError::InvalidOutput(violations) => assert!(violations.has_violation_at("echo")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_executions_are_independent() {
        let node: Arc<dyn Node> = Arc::new(EchoNode::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let node = Arc::clone(&node);
                tokio::spawn(async move { node.execute(config(i)).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.get("echo"), Some(&json!(i)));
        }
    }
}

//! The Executor: runs an approved step against the database port.
//!
//! Every problem past this point is a property of the step, not of the run:
//! bad SQL, a missing parameter, an unknown action kind, or the database
//! being unreachable all produce a `Failed` step whose error text the
//! Decider sees on its next cycle.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use querygate_contracts::{
    action::ActionKind,
    error::{QueryGateError, QueryGateResult},
    run::{RunState, RunUpdate},
    step::{ExecutionResult, Step, StepStatus},
};

use crate::traits::DatabasePort;

pub struct Executor<'a> {
    database: &'a dyn DatabasePort,
}

impl<'a> Executor<'a> {
    pub fn new(database: &'a dyn DatabasePort) -> Self {
        Self { database }
    }

    /// Execute the run's in-flight step and return it finished.
    ///
    /// # Errors
    ///
    /// `QueryGateError::StateMachine` if there is no in-flight step or it has
    /// not been approved. Those are orchestrator bugs; execution problems
    /// never surface here.
    pub async fn execute(&self, state: &RunState) -> QueryGateResult<RunUpdate> {
        let step = state.current.as_ref().ok_or_else(|| QueryGateError::StateMachine {
            reason: "executor invoked with no step in flight".to_string(),
        })?;
        if step.status != StepStatus::Approved {
            return Err(QueryGateError::StateMachine {
                reason: format!("executor invoked on step {} with status '{}'", step.id, step.status),
            });
        }

        let result = self.dispatch(step).await;
        let mut finished = step.clone();
        let next = if result.is_failure() { StepStatus::Failed } else { StepStatus::Completed };

        match &result.error {
            Some(error) => warn!(
                run_id = %state.run_id,
                step_id = %step.id,
                action = %step.action,
                %error,
                "step failed"
            ),
            None => info!(
                run_id = %state.run_id,
                step_id = %step.id,
                action = %step.action,
                row_count = result.row_count.unwrap_or(0),
                "step completed"
            ),
        }

        finished.result = Some(result);
        finished.advance(next)?;
        Ok(RunUpdate::Executed(finished))
    }

    async fn dispatch(&self, step: &Step) -> ExecutionResult {
        debug!(step_id = %step.id, action = %step.action, "dispatching step");
        match step.action.as_str() {
            ActionKind::GET_SCHEMA => match self.database.get_schema().await {
                Ok(schema) => {
                    let tables = schema.len() as u64;
                    ExecutionResult::rows(json!(schema), tables)
                }
                Err(e) => ExecutionResult::failure(e.to_string()),
            },

            ActionKind::DESCRIBE_TABLE => {
                let Some(table) = step.text_parameter("table") else {
                    return ExecutionResult::failure("describe_table requires a 'table' parameter");
                };
                match self.database.get_schema().await {
                    Ok(schema) => match schema.iter().find(|(name, _)| name.eq_ignore_ascii_case(table)) {
                        Some((name, columns)) => {
                            ExecutionResult::rows(json!({ name: columns }), columns.len() as u64)
                        }
                        None => ExecutionResult::failure(format!("no such table: {table}")),
                    },
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            ActionKind::EXECUTE_QUERY => {
                let Some(sql) = step.text_parameter("sql") else {
                    return ExecutionResult::failure("execute_query requires a 'sql' parameter");
                };
                let params: Vec<Value> = match step.parameters.get("params") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(values)) => values.clone(),
                    Some(_) => {
                        return ExecutionResult::failure("'params' must be an array of values")
                    }
                };
                match self.database.execute(sql, &params).await {
                    Ok(result) => result,
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            other => ExecutionResult::failure(format!("unknown action kind '{other}'")),
        }
    }
}

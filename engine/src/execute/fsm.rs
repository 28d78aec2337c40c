//! Finite State Machine for workflow status

use crate::errors::EngineError;
use crate::models::workflow::WorkflowStatus;

/// Workflow lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A next run time was assigned
    Schedule,

    /// Execution started
    Start,

    /// Every step completed
    Complete,

    /// Execution ended in failure
    Fail,

    /// Scheduling was cancelled
    Cancel,

    /// A recurring workflow got its next run time after an execution
    Reschedule,
}

/// Workflow status FSM
#[derive(Debug, Clone)]
pub struct WorkflowFsm {
    state: WorkflowStatus,
}

impl WorkflowFsm {
    /// Create an FSM in CREATED state
    pub fn new() -> Self {
        Self::from_status(WorkflowStatus::Created)
    }

    /// Resume an FSM from a stored status
    pub fn from_status(state: WorkflowStatus) -> Self {
        Self { state }
    }

    /// Get current state
    pub fn state(&self) -> WorkflowStatus {
        self.state
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: WorkflowEvent) -> Result<WorkflowStatus, EngineError> {
        use WorkflowEvent as E;
        use WorkflowStatus as S;

        let new_state = match (self.state, &event) {
            // Scheduling
            (S::Created, E::Schedule) | (S::Scheduled, E::Schedule) => S::Scheduled,
            (S::Completed, E::Schedule) | (S::Failed, E::Schedule) => S::Scheduled,

            // Execution start, on schedule or on demand
            (S::Created, E::Start)
            | (S::Scheduled, E::Start)
            | (S::Completed, E::Start)
            | (S::Failed, E::Start)
            | (S::Cancelled, E::Start) => S::Running,

            // Execution end
            (S::Running, E::Complete) => S::Completed,
            (S::Running, E::Fail) => S::Failed,

            // Recurring workflows go back to the schedule
            (S::Completed, E::Reschedule) | (S::Failed, E::Reschedule) => S::Scheduled,

            // Cancelling a schedule returns the workflow to CREATED
            (S::Scheduled, E::Cancel) | (S::Cancelled, E::Cancel) => S::Created,

            (state, event) => {
                return Err(EngineError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }
}

impl Default for WorkflowFsm {
    fn default() -> Self {
        Self::new()
    }
}

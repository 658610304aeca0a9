//! The conversion state machine.
//!
//! ```text
//! Loading -> Loaded -> Converting -> Done
//!                         ^    \---> Failed
//!                         |            |
//!                         +-- Done | Failed (new drop)
//! ```

use chrono::{DateTime, Utc};

use super::types::{ConversionJob, ConversionOutput, ConversionStatus, OrchestratorError};

/// State of the orchestrator, carrying the data that is valid in each state.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionState {
    /// Engine is loading and listing its capabilities.
    Loading,
    /// Ready for the first drop.
    Loaded,
    /// A job is running.
    Converting { job: ConversionJob },
    /// The last job produced an output.
    Done {
        job: ConversionJob,
        output: ConversionOutput,
        finished_at: DateTime<Utc>,
    },
    /// The last job failed.
    Failed {
        job: ConversionJob,
        error: String,
        failed_at: DateTime<Utc>,
    },
}

/// Inputs to [`ConversionState::transition`].
#[derive(Debug, Clone)]
pub enum Transition {
    /// Engine loaded and capabilities discovered.
    EngineReady,
    /// A drop was validated and a job starts.
    Start(ConversionJob),
    /// The running job produced its output.
    Finish {
        job_id: String,
        output: ConversionOutput,
    },
    /// The running job failed.
    Fail { job_id: String, error: String },
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Transition::EngineReady => "engine_ready",
            Transition::Start(_) => "start",
            Transition::Finish { .. } => "finish",
            Transition::Fail { .. } => "fail",
        }
    }
}

impl ConversionState {
    /// Computes the state that follows `transition`, or rejects it.
    ///
    /// `Finish` and `Fail` must name the job that is currently converting.
    pub fn transition(&self, transition: Transition) -> Result<ConversionState, OrchestratorError> {
        let next = match (self, transition) {
            (ConversionState::Loading, Transition::EngineReady) => ConversionState::Loaded,

            (
                ConversionState::Loaded
                | ConversionState::Done { .. }
                | ConversionState::Failed { .. },
                Transition::Start(job),
            ) => ConversionState::Converting { job },

            (ConversionState::Converting { job }, Transition::Finish { job_id, output })
                if job.id == job_id =>
            {
                ConversionState::Done {
                    job: job.clone(),
                    output,
                    finished_at: Utc::now(),
                }
            }

            (ConversionState::Converting { job }, Transition::Fail { job_id, error })
                if job.id == job_id =>
            {
                ConversionState::Failed {
                    job: job.clone(),
                    error,
                    failed_at: Utc::now(),
                }
            }

            (state, transition) => {
                return Err(OrchestratorError::InvalidTransition {
                    from: state.status().to_string(),
                    event: transition.name().to_string(),
                })
            }
        };
        Ok(next)
    }

    /// The UI-facing status of this state.
    pub fn status(&self) -> ConversionStatus {
        match self {
            ConversionState::Loading => ConversionStatus::Loading,
            ConversionState::Loaded => ConversionStatus::Loaded,
            ConversionState::Converting { .. } => ConversionStatus::Converting,
            ConversionState::Done { .. } => ConversionStatus::Done,
            ConversionState::Failed { .. } => ConversionStatus::Failed,
        }
    }

    /// The job of this state, if any.
    pub fn job(&self) -> Option<&ConversionJob> {
        match self {
            ConversionState::Converting { job }
            | ConversionState::Done { job, .. }
            | ConversionState::Failed { job, .. } => Some(job),
            _ => None,
        }
    }

    /// Whether a new drop may start a job from this state.
    pub fn accepts_drop(&self) -> bool {
        matches!(
            self,
            ConversionState::Loaded | ConversionState::Done { .. } | ConversionState::Failed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> ConversionJob {
        ConversionJob::new("clip.avi", 2048, "mp4")
    }

    fn output() -> ConversionOutput {
        ConversionOutput::new("output.mp4", "mp4", vec![0, 0, 0, 24])
    }

    #[test]
    fn test_happy_path() {
        let job = sample_job();
        let state = ConversionState::Loading
            .transition(Transition::EngineReady)
            .unwrap();
        assert_eq!(state, ConversionState::Loaded);

        let state = state.transition(Transition::Start(job.clone())).unwrap();
        assert_eq!(state.status(), ConversionStatus::Converting);

        let state = state
            .transition(Transition::Finish {
                job_id: job.id.clone(),
                output: output(),
            })
            .unwrap();
        assert_eq!(state.status(), ConversionStatus::Done);
        assert_eq!(state.job().unwrap().id, job.id);
    }

    #[test]
    fn test_failed_job_accepts_new_drop() {
        let job = sample_job();
        let state = ConversionState::Converting { job: job.clone() }
            .transition(Transition::Fail {
                job_id: job.id.clone(),
                error: "exit code 1".to_string(),
            })
            .unwrap();
        assert!(matches!(&state, ConversionState::Failed { error, .. } if error == "exit code 1"));
        assert!(state.accepts_drop());

        let next = sample_job();
        let state = state.transition(Transition::Start(next.clone())).unwrap();
        assert_eq!(state.job().unwrap().id, next.id);
    }

    #[test]
    fn test_rejects_start_while_loading_or_converting() {
        assert!(ConversionState::Loading
            .transition(Transition::Start(sample_job()))
            .is_err());

        let running = ConversionState::Converting { job: sample_job() };
        let err = running.transition(Transition::Start(sample_job())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition: cannot apply start in state convert.start"
        );
    }

    #[test]
    fn test_rejects_finish_for_other_job() {
        let running = ConversionState::Converting { job: sample_job() };
        let result = running.transition(Transition::Finish {
            job_id: "someone-else".to_string(),
            output: output(),
        });
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_rejects_second_engine_ready() {
        assert!(ConversionState::Loaded
            .transition(Transition::EngineReady)
            .is_err());
    }

    #[test]
    fn test_finish_outside_converting_rejected() {
        let job = sample_job();
        let result = ConversionState::Loaded.transition(Transition::Fail {
            job_id: job.id,
            error: "late".to_string(),
        });
        assert!(result.is_err());
    }
}
